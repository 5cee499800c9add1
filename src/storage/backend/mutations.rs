//! Write operations for SeaOrmStorage.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, ExprTrait, QueryFilter};

use super::converters::{
    click_to_active_model, conversion_to_active_model, link_to_active_model,
    seller_to_active_model,
};
use super::{SeaOrmStorage, retry};
use crate::errors::{Result, ServiceError};
use crate::storage::{ClickEvent, Conversion, ForwardRecord, SellerAccount, TrackingLink};

use migration::entities::{click_event, conversion, seller_account, tracking_link};

impl SeaOrmStorage {
    pub(super) async fn store_link(&self, link: TrackingLink) -> Result<()> {
        tracking_link::Entity::insert(link_to_active_model(&link))
            .exec(&self.db)
            .await
            .map_err(|e| ServiceError::database_operation(format!("link insert failed: {}", e)))?;
        Ok(())
    }

    pub(super) async fn store_seller(&self, seller: SellerAccount) -> Result<()> {
        seller_account::Entity::insert(seller_to_active_model(&seller))
            .exec(&self.db)
            .await
            .map_err(|e| {
                ServiceError::database_operation(format!("seller insert failed: {}", e))
            })?;
        Ok(())
    }

    pub(super) async fn store_click(&self, click: ClickEvent) -> Result<()> {
        let db = &self.db;
        let model = click_to_active_model(&click);

        retry::with_retry(
            &format!("store_click({})", click.click_id),
            self.retry_config,
            || async {
                click_event::Entity::insert(model.clone())
                    .exec(db)
                    .await
                    .map(|_| ())
            },
        )
        .await
        .map_err(|e| ServiceError::database_operation(format!("click insert failed: {}", e)))?;

        Ok(())
    }

    pub(super) async fn set_click_converted(
        &self,
        click_id: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        click_event::Entity::update_many()
            .col_expr(click_event::Column::IsConverted, Expr::value(true))
            .col_expr(click_event::Column::ConvertedAt, Expr::value(at))
            .filter(click_event::Column::ClickId.eq(click_id))
            .exec(&self.db)
            .await
            .map_err(|e| {
                ServiceError::database_operation(format!("click conversion update failed: {}", e))
            })?;
        Ok(())
    }

    /// Atomic `conversion_count = conversion_count + 1`.
    pub(super) async fn add_link_conversion(&self, link_id: &str) -> Result<()> {
        let result = tracking_link::Entity::update_many()
            .col_expr(
                tracking_link::Column::ConversionCount,
                Expr::col(tracking_link::Column::ConversionCount).add(Expr::val(1i64)),
            )
            .filter(tracking_link::Column::Id.eq(link_id))
            .exec(&self.db)
            .await
            .map_err(|e| {
                ServiceError::database_operation(format!(
                    "conversion counter update failed: {}",
                    e
                ))
            })?;

        if result.rows_affected == 0 {
            return Err(ServiceError::not_found(format!(
                "tracking link not found: {}",
                link_id
            )));
        }
        Ok(())
    }

    pub(super) async fn store_conversion(&self, conversion: Conversion) -> Result<()> {
        conversion::Entity::insert(conversion_to_active_model(&conversion))
            .exec(&self.db)
            .await
            .map_err(|e| {
                ServiceError::database_operation(format!("conversion insert failed: {}", e))
            })?;
        Ok(())
    }

    pub(super) async fn annotate_conversion(
        &self,
        conversion_id: &str,
        record: ForwardRecord,
    ) -> Result<()> {
        let result = conversion::Entity::update_many()
            .col_expr(conversion::Column::MetaSent, Expr::value(record.meta_sent))
            .col_expr(
                conversion::Column::MetaSentAt,
                Expr::value(record.meta_sent_at),
            )
            .col_expr(
                conversion::Column::FbTraceId,
                Expr::value(record.fb_trace_id),
            )
            .col_expr(
                conversion::Column::EventsReceived,
                Expr::value(record.events_received),
            )
            .filter(conversion::Column::Id.eq(conversion_id))
            .exec(&self.db)
            .await
            .map_err(|e| {
                ServiceError::database_operation(format!(
                    "conversion annotation failed: {}",
                    e
                ))
            })?;

        if result.rows_affected == 0 {
            return Err(ServiceError::not_found(format!(
                "conversion not found: {}",
                conversion_id
            )));
        }
        Ok(())
    }
}
