//! ClickSink implementation for SeaOrmStorage.
//!
//! Drained counter batches land as a single UPDATE per table, with
//! `CASE WHEN ... THEN count + n` add expressions. The add happens in SQL,
//! so concurrent flushes from several instances cannot lose increments.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{CaseStatement, Expr, Query};
use sea_orm::{ConnectionTrait, ExprTrait};
use tracing::debug;

use super::{SeaOrmStorage, retry};
use crate::attribution::{ClickSink, CounterKey};

use migration::entities::{campaign, tracking_link};

#[async_trait]
impl ClickSink for SeaOrmStorage {
    async fn flush_clicks(&self, updates: Vec<(CounterKey, usize)>) -> anyhow::Result<()> {
        if updates.is_empty() {
            return Ok(());
        }

        let mut link_updates: Vec<(String, usize)> = Vec::new();
        let mut campaign_updates: Vec<(String, usize)> = Vec::new();
        for (key, count) in updates {
            match key {
                CounterKey::Link(id) => link_updates.push((id, count)),
                CounterKey::Campaign(id) => campaign_updates.push((id, count)),
            }
        }

        self.flush_link_clicks(&link_updates).await?;
        self.flush_campaign_clicks(&campaign_updates).await?;

        debug!(
            "Click counters flushed to {} database ({} links, {} campaigns)",
            self.backend_name.to_uppercase(),
            link_updates.len(),
            campaign_updates.len()
        );

        Ok(())
    }
}

impl SeaOrmStorage {
    async fn flush_link_clicks(&self, updates: &[(String, usize)]) -> anyhow::Result<()> {
        if updates.is_empty() {
            return Ok(());
        }

        let mut case_stmt = CaseStatement::new();
        let mut ids: Vec<String> = Vec::with_capacity(updates.len());

        for (id, count) in updates {
            case_stmt = case_stmt.case(
                Expr::col(tracking_link::Column::Id).eq(Expr::val(id.as_str())),
                Expr::col(tracking_link::Column::ClickCount).add(Expr::val(*count as i64)),
            );
            ids.push(id.clone());
        }
        // unmatched rows keep their value
        case_stmt = case_stmt.finally(Expr::col(tracking_link::Column::ClickCount));

        let stmt = Query::update()
            .table(tracking_link::Entity)
            .value(tracking_link::Column::ClickCount, case_stmt)
            .value(tracking_link::Column::LastClickAt, Expr::val(Utc::now()))
            .and_where(Expr::col(tracking_link::Column::Id).is_in(ids))
            .to_owned();

        let db = &self.db;
        let stmt_ref = &stmt;
        retry::with_retry("flush_link_clicks", self.retry_config, || async {
            db.execute(stmt_ref).await
        })
        .await
        .map_err(|e| anyhow::anyhow!("Failed to batch update link click counts: {}", e))?;

        Ok(())
    }

    async fn flush_campaign_clicks(&self, updates: &[(String, usize)]) -> anyhow::Result<()> {
        if updates.is_empty() {
            return Ok(());
        }

        let mut case_stmt = CaseStatement::new();
        let mut ids: Vec<String> = Vec::with_capacity(updates.len());

        for (id, count) in updates {
            case_stmt = case_stmt.case(
                Expr::col(campaign::Column::Id).eq(Expr::val(id.as_str())),
                Expr::col(campaign::Column::ClickCount).add(Expr::val(*count as i64)),
            );
            ids.push(id.clone());
        }
        case_stmt = case_stmt.finally(Expr::col(campaign::Column::ClickCount));

        let stmt = Query::update()
            .table(campaign::Entity)
            .value(campaign::Column::ClickCount, case_stmt)
            .and_where(Expr::col(campaign::Column::Id).is_in(ids))
            .to_owned();

        let db = &self.db;
        let stmt_ref = &stmt;
        retry::with_retry("flush_campaign_clicks", self.retry_config, || async {
            db.execute(stmt_ref).await
        })
        .await
        .map_err(|e| anyhow::anyhow!("Failed to batch update campaign click counts: {}", e))?;

        Ok(())
    }
}
