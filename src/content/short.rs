use crate::classify::Classification;
use crate::content::{ContentAdapter, ContentKind, ResolvedMedia, notification_title};
use crate::database::{DbError, SqlitePool};
use crate::fanout::NewNotification;
use async_trait::async_trait;
use sqlx::FromRow;

#[derive(FromRow)]
struct ShortRow {
    video_url: String,
    user_id: String,
}

pub struct ShortAdapter;

#[async_trait]
impl ContentAdapter for ShortAdapter {
    fn kind(&self) -> ContentKind {
        ContentKind::Short
    }

    async fn resolve_media(
        &self,
        pool: &SqlitePool,
        content_id: &str,
    ) -> Result<Option<ResolvedMedia>, DbError> {
        let row =
            sqlx::query_as::<_, ShortRow>("SELECT video_url, user_id FROM shorts WHERE id = ?")
                .bind(content_id)
                .fetch_optional(pool)
                .await?;
        // Shorts are always video.
        Ok(row.map(|row| ResolvedMedia {
            media_url: row.video_url,
            is_video: true,
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
        sqlx::query("UPDATE shorts SET trust_level = ?, analysis_id = ? WHERE id = ?")
            .bind(trust_level)
            .bind(analysis_id)
            .bind(content_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    fn notification(
        &self,
        content_id: &str,
        owner_id: &str,
        classification: Classification,
    ) -> Option<NewNotification> {
        Some(NewNotification {
            user_id: owner_id.to_owned(),
            kind: "content_analysis".to_owned(),
            title: notification_title(classification).to_owned(),
            body: format!(
                "The authenticity analysis of your short finished: {}.",
                classification.trust_level()
            ),
            link: Some(format!("/shorts/{content_id}")),
        })
    }
}
