use crate::database::{DbError, SqlitePool};
use crate::queue::Job;
use crate::worker::JobHandler;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

/// A user notification to be durably created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNotification {
    pub user_id: String,
    pub kind: String,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub link: Option<String>,
}

pub struct NotificationStore;

impl NotificationStore {
    /// Durable write of one notification; its retry policy is the
    /// notification queue's, independent of the analysis job.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn create(
        pool: &SqlitePool,
        notification: &NewNotification,
    ) -> Result<i64, DbError> {
        let id = sqlx::query_scalar(
            "INSERT INTO notifications (user_id, kind, title, body, link, created_at) \
             VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(&notification.user_id)
        .bind(&notification.kind)
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(&notification.link)
        .bind(Utc::now())
        .fetch_one(pool)
        .await?;
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn count_for_user(pool: &SqlitePool, user_id: &str) -> Result<i64, DbError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(pool)
            .await?;
        Ok(count)
    }
}

/// Handler for the notification queue.
pub struct NotificationHandler {
    pool: SqlitePool,
}

impl NotificationHandler {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobHandler for NotificationHandler {
    async fn handle(&self, job: &Job) -> color_eyre::Result<()> {
        let notification: NewNotification = job.payload_as()?;
        let id = NotificationStore::create(&self.pool, &notification).await?;
        info!(
            "🔔 Created notification {} for user {}.",
            id, notification.user_id
        );
        Ok(())
    }
}
