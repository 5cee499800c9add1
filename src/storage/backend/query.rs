//! Read operations for SeaOrmStorage.

use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};

use super::{SeaOrmStorage, retry};
use crate::errors::{Result, ServiceError};
use crate::storage::{ClickEvent, Conversion, SellerAccount, TrackingLink};

use migration::entities::{click_event, conversion, seller_account, tracking_link};

use super::converters::{model_to_click, model_to_conversion, model_to_link, model_to_seller};

impl SeaOrmStorage {
    pub(super) async fn find_link(&self, id: &str) -> Result<Option<TrackingLink>> {
        let db = &self.db;
        let id_owned = id.to_string();

        let model = retry::with_retry(&format!("find_link({})", id), self.retry_config, || async {
            tracking_link::Entity::find_by_id(&id_owned).one(db).await
        })
        .await
        .map_err(|e| ServiceError::database_operation(format!("link lookup failed: {}", e)))?;

        Ok(model.map(model_to_link))
    }

    pub(super) async fn find_link_by_video(
        &self,
        store_slug: &str,
        video_code: &str,
    ) -> Result<Option<TrackingLink>> {
        let db = &self.db;
        let slug = store_slug.to_string();
        let code = video_code.to_string();

        let model = retry::with_retry(
            &format!("find_link_by_video({}/{})", store_slug, video_code),
            self.retry_config,
            || async {
                tracking_link::Entity::find()
                    .filter(tracking_link::Column::StoreSlug.eq(slug.as_str()))
                    .filter(tracking_link::Column::VideoCode.eq(code.as_str()))
                    .one(db)
                    .await
            },
        )
        .await
        .map_err(|e| ServiceError::database_operation(format!("video lookup failed: {}", e)))?;

        Ok(model.map(model_to_link))
    }

    pub(super) async fn find_click(&self, click_id: &str) -> Result<Option<ClickEvent>> {
        let model = click_event::Entity::find_by_id(click_id)
            .one(&self.db)
            .await
            .map_err(|e| ServiceError::database_operation(format!("click lookup failed: {}", e)))?;

        Ok(model.map(model_to_click))
    }

    pub(super) async fn find_clicks_for_link(&self, link_id: &str) -> Result<Vec<ClickEvent>> {
        let models = click_event::Entity::find()
            .filter(click_event::Column::TrackingLinkId.eq(link_id))
            .order_by_asc(click_event::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(|e| {
                ServiceError::database_operation(format!("click listing failed: {}", e))
            })?;

        Ok(models.into_iter().map(model_to_click).collect())
    }

    /// Dedup probe: one row for the exact (link, ip, user-agent) triple at
    /// or after `since` is enough.
    pub(super) async fn exists_recent_click(
        &self,
        link_id: &str,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<bool> {
        let db = &self.db;
        let link_id_owned = link_id.to_string();
        let ip_owned = ip_address.map(String::from);
        let ua_owned = user_agent.map(String::from);

        let rows = retry::with_retry(
            &format!("exists_recent_click({})", link_id),
            self.retry_config,
            || async {
                let mut query = click_event::Entity::find()
                    .filter(click_event::Column::TrackingLinkId.eq(link_id_owned.as_str()))
                    .filter(click_event::Column::CreatedAt.gte(since));

                query = match &ip_owned {
                    Some(ip) => query.filter(click_event::Column::IpAddress.eq(ip.as_str())),
                    None => query.filter(click_event::Column::IpAddress.is_null()),
                };
                query = match &ua_owned {
                    Some(ua) => query.filter(click_event::Column::UserAgent.eq(ua.as_str())),
                    None => query.filter(click_event::Column::UserAgent.is_null()),
                };

                query.limit(1).all(db).await
            },
        )
        .await
        .map_err(|e| ServiceError::database_operation(format!("dedup lookup failed: {}", e)))?;

        Ok(!rows.is_empty())
    }

    pub(super) async fn find_latest_click(&self, link_id: &str) -> Result<Option<ClickEvent>> {
        let db = &self.db;
        let link_id_owned = link_id.to_string();

        let model = retry::with_retry(
            &format!("find_latest_click({})", link_id),
            self.retry_config,
            || async {
                click_event::Entity::find()
                    .filter(click_event::Column::TrackingLinkId.eq(link_id_owned.as_str()))
                    .order_by_desc(click_event::Column::CreatedAt)
                    .one(db)
                    .await
            },
        )
        .await
        .map_err(|e| {
            ServiceError::database_operation(format!("latest click lookup failed: {}", e))
        })?;

        Ok(model.map(model_to_click))
    }

    pub(super) async fn find_seller(&self, id: &str) -> Result<Option<SellerAccount>> {
        let model = seller_account::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| {
                ServiceError::database_operation(format!("seller lookup failed: {}", e))
            })?;

        Ok(model.map(model_to_seller))
    }

    pub(super) async fn find_conversion(&self, id: &str) -> Result<Option<Conversion>> {
        let model = conversion::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| {
                ServiceError::database_operation(format!("conversion lookup failed: {}", e))
            })?;

        Ok(model.map(model_to_conversion))
    }
}
