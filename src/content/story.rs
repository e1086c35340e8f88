use crate::classify::Classification;
use crate::content::{ContentAdapter, ContentKind, ResolvedMedia};
use crate::database::{DbError, SqlitePool};
use crate::fanout::NewNotification;
use async_trait::async_trait;
use sqlx::FromRow;

#[derive(FromRow)]
struct StoryRow {
    media_url: String,
    is_video: bool,
    user_id: String,
}

pub struct StoryAdapter;

#[async_trait]
impl ContentAdapter for StoryAdapter {
    fn kind(&self) -> ContentKind {
        ContentKind::Story
    }

    async fn resolve_media(
        &self,
        pool: &SqlitePool,
        content_id: &str,
    ) -> Result<Option<ResolvedMedia>, DbError> {
        let row = sqlx::query_as::<_, StoryRow>(
            "SELECT media_url, is_video, user_id FROM stories WHERE id = ?",
        )
        .bind(content_id)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(|row| ResolvedMedia {
            media_url: row.media_url,
            is_video: row.is_video,
            owner_id: row.user_id,
        }))
    }

    async fn update_trust(
        &self,
        pool: &SqlitePool,
        content_id: &str,
        trust_level: &str,
        analysis_id: i64,
    ) -> Result<(), DbError> {
        sqlx::query("UPDATE stories SET trust_level = ?, analysis_id = ? WHERE id = ?")
            .bind(trust_level)
            .bind(analysis_id)
            .bind(content_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Stories expire; there is no durable notification target.
    fn notification(
        &self,
        _content_id: &str,
        _owner_id: &str,
        _classification: Classification,
    ) -> Option<NewNotification> {
        None
    }
}
