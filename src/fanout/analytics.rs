use crate::database::{DbError, SqlitePool};
use crate::queue::{AnalyticsJobPayload, Job};
use crate::worker::JobHandler;
use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

pub struct AnalyticsStore;

impl AnalyticsStore {
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn record(pool: &SqlitePool, event: &AnalyticsJobPayload) -> Result<i64, DbError> {
        let id = sqlx::query_scalar(
            "INSERT INTO analytics_events (event, content_id, properties, created_at) \
             VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(&event.event)
        .bind(&event.content_id)
        .bind(&event.properties)
        .bind(Utc::now())
        .fetch_one(pool)
        .await?;
        Ok(id)
    }
}

/// Handler for the analytics queue.
pub struct AnalyticsHandler {
    pool: SqlitePool,
}

impl AnalyticsHandler {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobHandler for AnalyticsHandler {
    async fn handle(&self, job: &Job) -> color_eyre::Result<()> {
        let event: AnalyticsJobPayload = job.payload_as()?;
        AnalyticsStore::record(&self.pool, &event).await?;
        info!("📊 Recorded analytics event '{}'.", event.event);
        Ok(())
    }
}
