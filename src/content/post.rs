use crate::classify::Classification;
use crate::content::{ContentAdapter, ContentKind, ResolvedMedia, notification_title};
use crate::database::{DbError, SqlitePool};
use crate::fanout::NewNotification;
use async_trait::async_trait;
use sqlx::FromRow;

#[derive(FromRow)]
struct PostRow {
    media_url: String,
    is_video: bool,
    user_id: String,
}

pub struct PostAdapter;

#[async_trait]
impl ContentAdapter for PostAdapter {
    fn kind(&self) -> ContentKind {
        ContentKind::Post
    }

    async fn resolve_media(
        &self,
        pool: &SqlitePool,
        content_id: &str,
    ) -> Result<Option<ResolvedMedia>, DbError> {
        let row = sqlx::query_as::<_, PostRow>(
            "SELECT media_url, is_video, user_id FROM posts WHERE id = ?",
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
        sqlx::query("UPDATE posts SET trust_level = ?, analysis_id = ? WHERE id = ?")
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
                "The authenticity analysis of your post finished: {}.",
                classification.trust_level()
            ),
            link: Some(format!("/post/{content_id}")),
        })
    }
}
