use serde::{Deserialize, Serialize};

/// The content kinds that share the analysis pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Post,
    Short,
    Story,
}

impl ContentKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Short => "short",
            Self::Story => "story",
        }
    }
}

/// Reference to one content item, as carried in job payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentRef {
    pub kind: ContentKind,
    pub content_id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}

/// What the pipeline needs to know about a content item to analyze it.
#[derive(Debug, Clone)]
pub struct ResolvedMedia {
    pub media_url: String,
    pub is_video: bool,
    pub owner_id: String,
}
