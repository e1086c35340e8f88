mod post;
mod short;
mod story;
mod structs;

pub use post::PostAdapter;
pub use short::ShortAdapter;
pub use story::StoryAdapter;
pub use structs::{ContentKind, ContentRef, ResolvedMedia};

use crate::classify::Classification;
use crate::database::{DbError, SqlitePool};
use crate::fanout::NewNotification;
use async_trait::async_trait;

/// Per-kind lookup/update behavior behind one interface, so the analysis
/// handler never branches on concrete kinds.
#[async_trait]
pub trait ContentAdapter: Send + Sync {
    fn kind(&self) -> ContentKind;

    /// Resolves the media URL, video flag and owner of a content item.
    /// `None` means the content no longer exists.
    async fn resolve_media(
        &self,
        pool: &SqlitePool,
        content_id: &str,
    ) -> Result<Option<ResolvedMedia>, DbError>;

    /// Writes the derived trust level and analysis reference back onto the
    /// owning content record.
    async fn update_trust(
        &self,
        pool: &SqlitePool,
        content_id: &str,
        trust_level: &str,
        analysis_id: i64,
    ) -> Result<(), DbError>;

    /// The user notification a completed analysis should produce, or `None`
    /// for ephemeral kinds with no durable notification target.
    fn notification(
        &self,
        content_id: &str,
        owner_id: &str,
        classification: Classification,
    ) -> Option<NewNotification>;
}

static POST: PostAdapter = PostAdapter;
static SHORT: ShortAdapter = ShortAdapter;
static STORY: StoryAdapter = StoryAdapter;

#[must_use]
pub fn adapter_for(kind: ContentKind) -> &'static dyn ContentAdapter {
    match kind {
        ContentKind::Post => &POST,
        ContentKind::Short => &SHORT,
        ContentKind::Story => &STORY,
    }
}

pub(crate) fn notification_title(classification: Classification) -> &'static str {
    match classification {
        Classification::Authentic => "Authenticity check passed",
        Classification::Suspicious => "Authenticity check needs a closer look",
        Classification::LikelyFake => "Authenticity check flagged your content",
    }
}
