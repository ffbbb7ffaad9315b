use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::Analysis;

/// Engagement counters. A counter the source platform cannot report stays
/// `None`; it is never filled with zero on the platform's behalf.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMetrics {
    pub like_count: Option<u64>,
    pub comment_count: Option<u64>,
    pub share_count: Option<u64>,
    pub view_count: Option<u64>,
}

/// The unified record every platform payload is normalized into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialPost {
    /// Raw topic string the post was ingested for.
    pub topic: String,
    /// Platform-native id; the natural key inside a partition.
    pub source_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author: Option<String>,
    pub metrics: PostMetrics,
    pub media_url: Option<String>,
    pub permalink: Option<String>,
    /// Topic-wide analysis; identical on every annotated post of a partition.
    #[serde(default)]
    pub analysis: Option<Analysis>,
}
