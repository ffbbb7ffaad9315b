//! Raw platform payloads.
//!
//! The `*Response` types model the JSON returned by the upstream search APIs.
//! [`RawItem`] is what an adapter hands to the normalizer: one tagged variant
//! per platform family, already joined with any side-loaded data.

use chrono::{DateTime, Utc};
use pulse_core::PlatformFamily;
use serde::{Deserialize, Deserializer, Serialize};

/// One fetched item in its platform-native shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "platform", rename_all = "lowercase")]
pub enum RawItem {
    Tweet(RawTweet),
    Video(RawVideo),
}

impl RawItem {
    #[must_use]
    pub fn family(&self) -> PlatformFamily {
        match self {
            RawItem::Tweet(_) => PlatformFamily::Twitter,
            RawItem::Video(_) => PlatformFamily::Youtube,
        }
    }

    #[must_use]
    pub fn source_id(&self) -> &str {
        match self {
            RawItem::Tweet(t) => &t.id,
            RawItem::Video(v) => &v.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTweet {
    pub id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author_id: Option<String>,
    pub public_metrics: Option<TweetPublicMetrics>,
    /// Metrics of the original tweet when this one is a retweet of a tweet
    /// present in the response's side-loaded set.
    pub retweeted_metrics: Option<TweetPublicMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweetPublicMetrics {
    #[serde(default)]
    pub retweet_count: u64,
    #[serde(default)]
    pub reply_count: u64,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub quote_count: u64,
    #[serde(default)]
    pub impression_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawVideo {
    pub id: String,
    pub title: String,
    pub description: String,
    pub channel_title: Option<String>,
    pub published_at: DateTime<Utc>,
    pub thumbnail_url: Option<String>,
    /// `None` when the statistics call returned no entry for this id.
    pub statistics: Option<VideoStatistics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatistics {
    #[serde(default, deserialize_with = "count_from_string")]
    pub view_count: Option<u64>,
    #[serde(default, deserialize_with = "count_from_string")]
    pub like_count: Option<u64>,
    #[serde(default, deserialize_with = "count_from_string")]
    pub comment_count: Option<u64>,
}

/// The video API reports counters as decimal strings.
fn count_from_string<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Number(u64),
        Text(String),
    }

    match Option::<Count>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Count::Number(n)) => Ok(Some(n)),
        Some(Count::Text(s)) => s
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

// ---------------------------------------------------------------------------
// Twitter recent search
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct TweetSearchResponse {
    /// Absent when the search matched nothing.
    #[serde(default)]
    pub data: Vec<TweetData>,
    #[serde(default)]
    pub includes: Option<TweetIncludes>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TweetData {
    pub id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub public_metrics: Option<TweetPublicMetrics>,
    #[serde(default)]
    pub referenced_tweets: Vec<ReferencedTweet>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReferencedTweet {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct TweetIncludes {
    #[serde(default)]
    pub tweets: Vec<IncludedTweet>,
}

/// Side-loaded tweet; only the fields needed for metric substitution.
#[derive(Debug, Clone, Deserialize)]
pub struct IncludedTweet {
    pub id: String,
    #[serde(default)]
    pub public_metrics: Option<TweetPublicMetrics>,
}

// ---------------------------------------------------------------------------
// Video search + statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSearchResponse {
    #[serde(default)]
    pub items: Vec<VideoSearchItem>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VideoSearchItem {
    pub id: VideoSearchId,
    pub snippet: VideoSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSearchId {
    #[serde(default)]
    pub video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub channel_title: Option<String>,
    #[serde(default)]
    pub thumbnails: Option<VideoThumbnails>,
}

#[derive(Debug, Deserialize)]
pub struct VideoThumbnails {
    #[serde(default)]
    pub default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
pub struct Thumbnail {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<VideoListItem>,
}

#[derive(Debug, Deserialize)]
pub struct VideoListItem {
    pub id: String,
    #[serde(default)]
    pub statistics: Option<VideoStatistics>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_statistics_accept_string_counters() {
        let stats: VideoStatistics = serde_json::from_value(serde_json::json!({
            "viewCount": "1200",
            "likeCount": 34,
        }))
        .unwrap();
        assert_eq!(stats.view_count, Some(1200));
        assert_eq!(stats.like_count, Some(34));
        assert_eq!(stats.comment_count, None);
    }

    #[test]
    fn video_statistics_reject_garbage_counters() {
        let result: Result<VideoStatistics, _> =
            serde_json::from_value(serde_json::json!({ "viewCount": "lots" }));
        assert!(result.is_err());
    }

    #[test]
    fn empty_tweet_search_has_no_data_key() {
        let resp: TweetSearchResponse =
            serde_json::from_value(serde_json::json!({ "meta": { "result_count": 0 } })).unwrap();
        assert!(resp.data.is_empty());
        assert!(resp.includes.is_none());
    }

    #[test]
    fn raw_item_reports_family_and_id() {
        let item = RawItem::Tweet(RawTweet {
            id: "9".into(),
            text: "t".into(),
            created_at: Utc::now(),
            author_id: None,
            public_metrics: None,
            retweeted_metrics: None,
        });
        assert_eq!(item.family(), PlatformFamily::Twitter);
        assert_eq!(item.source_id(), "9");
    }
}
