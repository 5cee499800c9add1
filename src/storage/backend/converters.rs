//! Conversions between SeaORM models and the domain structs.

use sea_orm::ActiveValue::Set;

use crate::attribution::ClickSource;
use crate::storage::{ClickEvent, Conversion, LinkStatus, SellerAccount, TrackingLink};

use migration::entities::{click_event, conversion, seller_account, tracking_link};

pub fn model_to_link(model: tracking_link::Model) -> TrackingLink {
    TrackingLink {
        id: model.id,
        seller_id: model.seller_id,
        campaign_id: model.campaign_id,
        destination_url: model.destination_url,
        utm_source: model.utm_source,
        utm_medium: model.utm_medium,
        utm_campaign: model.utm_campaign,
        status: LinkStatus::parse(&model.status),
        click_count: model.click_count,
        conversion_count: model.conversion_count,
        last_click_at: model.last_click_at,
        store_slug: model.store_slug,
        video_code: model.video_code,
        meta_pixel_id: model.meta_pixel_id,
        meta_access_token: model.meta_access_token,
        created_at: model.created_at,
    }
}

pub fn link_to_active_model(link: &TrackingLink) -> tracking_link::ActiveModel {
    tracking_link::ActiveModel {
        id: Set(link.id.clone()),
        seller_id: Set(link.seller_id.clone()),
        campaign_id: Set(link.campaign_id.clone()),
        destination_url: Set(link.destination_url.clone()),
        utm_source: Set(link.utm_source.clone()),
        utm_medium: Set(link.utm_medium.clone()),
        utm_campaign: Set(link.utm_campaign.clone()),
        status: Set(link.status.as_str().to_string()),
        click_count: Set(link.click_count),
        conversion_count: Set(link.conversion_count),
        last_click_at: Set(link.last_click_at),
        store_slug: Set(link.store_slug.clone()),
        video_code: Set(link.video_code.clone()),
        meta_pixel_id: Set(link.meta_pixel_id.clone()),
        meta_access_token: Set(link.meta_access_token.clone()),
        created_at: Set(link.created_at),
    }
}

pub fn model_to_click(model: click_event::Model) -> ClickEvent {
    ClickEvent {
        click_id: model.click_id,
        tracking_link_id: model.tracking_link_id,
        seller_id: model.seller_id,
        campaign_id: model.campaign_id,
        ip_address: model.ip_address,
        user_agent: model.user_agent,
        referer: model.referer,
        fbp: model.fbp,
        fbc: model.fbc,
        utm_source: model.utm_source,
        utm_medium: model.utm_medium,
        utm_campaign: model.utm_campaign,
        // rows only ever carry tags this build wrote; fall back for rows
        // written by a newer deployment
        source: ClickSource::parse(&model.source).unwrap_or(ClickSource::TrackingRedirect),
        is_unique: model.is_unique,
        is_converted: model.is_converted,
        converted_at: model.converted_at,
        created_at: model.created_at,
    }
}

pub fn click_to_active_model(click: &ClickEvent) -> click_event::ActiveModel {
    click_event::ActiveModel {
        click_id: Set(click.click_id.clone()),
        tracking_link_id: Set(click.tracking_link_id.clone()),
        seller_id: Set(click.seller_id.clone()),
        campaign_id: Set(click.campaign_id.clone()),
        ip_address: Set(click.ip_address.clone()),
        user_agent: Set(click.user_agent.clone()),
        referer: Set(click.referer.clone()),
        fbp: Set(click.fbp.clone()),
        fbc: Set(click.fbc.clone()),
        utm_source: Set(click.utm_source.clone()),
        utm_medium: Set(click.utm_medium.clone()),
        utm_campaign: Set(click.utm_campaign.clone()),
        source: Set(click.source.as_str().to_string()),
        is_unique: Set(click.is_unique),
        is_converted: Set(click.is_converted),
        converted_at: Set(click.converted_at),
        created_at: Set(click.created_at),
    }
}

pub fn model_to_seller(model: seller_account::Model) -> SellerAccount {
    SellerAccount {
        id: model.id,
        name: model.name,
        meta_pixel_id: model.meta_pixel_id,
        meta_access_token: model.meta_access_token,
        created_at: model.created_at,
    }
}

pub fn seller_to_active_model(seller: &SellerAccount) -> seller_account::ActiveModel {
    seller_account::ActiveModel {
        id: Set(seller.id.clone()),
        name: Set(seller.name.clone()),
        meta_pixel_id: Set(seller.meta_pixel_id.clone()),
        meta_access_token: Set(seller.meta_access_token.clone()),
        created_at: Set(seller.created_at),
    }
}

pub fn model_to_conversion(model: conversion::Model) -> Conversion {
    Conversion {
        id: model.id,
        tracking_link_id: model.tracking_link_id,
        order_id: model.order_id,
        order_amount: model.order_amount,
        product_id: model.product_id,
        product_name: model.product_name,
        quantity: model.quantity,
        meta_sent: model.meta_sent,
        meta_sent_at: model.meta_sent_at,
        fb_trace_id: model.fb_trace_id,
        events_received: model.events_received,
        created_at: model.created_at,
    }
}

pub fn conversion_to_active_model(conversion: &Conversion) -> conversion::ActiveModel {
    conversion::ActiveModel {
        id: Set(conversion.id.clone()),
        tracking_link_id: Set(conversion.tracking_link_id.clone()),
        order_id: Set(conversion.order_id.clone()),
        order_amount: Set(conversion.order_amount),
        product_id: Set(conversion.product_id.clone()),
        product_name: Set(conversion.product_name.clone()),
        quantity: Set(conversion.quantity),
        meta_sent: Set(conversion.meta_sent),
        meta_sent_at: Set(conversion.meta_sent_at),
        fb_trace_id: Set(conversion.fb_trace_id.clone()),
        events_received: Set(conversion.events_received),
        created_at: Set(conversion.created_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_click_roundtrip() {
        let click = ClickEvent {
            click_id: "sp_1_aaaa0001".to_string(),
            tracking_link_id: "l1".to_string(),
            seller_id: "seller1".to_string(),
            campaign_id: Some("c1".to_string()),
            ip_address: Some("1.2.3.4".to_string()),
            user_agent: Some("UA-X".to_string()),
            referer: None,
            fbp: Some("fb.1.1.1".to_string()),
            fbc: None,
            utm_source: Some("kakao".to_string()),
            utm_medium: None,
            utm_campaign: None,
            source: ClickSource::BridgeShop,
            is_unique: true,
            is_converted: false,
            converted_at: None,
            created_at: Utc::now(),
        };

        let active = click_to_active_model(&click);
        let model = click_event::Model {
            click_id: active.click_id.clone().unwrap(),
            tracking_link_id: active.tracking_link_id.clone().unwrap(),
            seller_id: active.seller_id.clone().unwrap(),
            campaign_id: active.campaign_id.clone().unwrap(),
            ip_address: active.ip_address.clone().unwrap(),
            user_agent: active.user_agent.clone().unwrap(),
            referer: active.referer.clone().unwrap(),
            fbp: active.fbp.clone().unwrap(),
            fbc: active.fbc.clone().unwrap(),
            utm_source: active.utm_source.clone().unwrap(),
            utm_medium: active.utm_medium.clone().unwrap(),
            utm_campaign: active.utm_campaign.clone().unwrap(),
            source: active.source.clone().unwrap(),
            is_unique: active.is_unique.clone().unwrap(),
            is_converted: active.is_converted.clone().unwrap(),
            converted_at: active.converted_at.clone().unwrap(),
            created_at: active.created_at.clone().unwrap(),
        };

        assert_eq!(model_to_click(model), click);
    }

    #[test]
    fn test_link_status_mapping() {
        let model = tracking_link::Model {
            id: "l1".to_string(),
            seller_id: "seller1".to_string(),
            campaign_id: None,
            destination_url: "https://shop.example/p/1".to_string(),
            utm_source: None,
            utm_medium: None,
            utm_campaign: None,
            status: "paused".to_string(),
            click_count: 5,
            conversion_count: 1,
            last_click_at: None,
            store_slug: None,
            video_code: None,
            meta_pixel_id: None,
            meta_access_token: None,
            created_at: Utc::now(),
        };

        let link = model_to_link(model);
        assert_eq!(link.status, LinkStatus::Paused);
        assert_eq!(link.click_count, 5);
    }
}
