//! Mapping of raw platform items onto the unified [`SocialPost`].
//!
//! Pure and deterministic: the same raw item and topic always produce the
//! same record, and nothing here touches the network or the store.

use pulse_core::{PostMetrics, SocialPost};

use crate::types::{RawItem, RawTweet, RawVideo};

const TWEET_PERMALINK_BASE: &str = "https://twitter.com/i/web/status/";
const VIDEO_PERMALINK_BASE: &str = "https://www.youtube.com/watch?v=";

/// Normalize one raw item fetched for `topic`.
#[must_use]
pub fn normalize(item: &RawItem, topic: &str) -> SocialPost {
    match item {
        RawItem::Tweet(tweet) => normalize_tweet(tweet, topic),
        RawItem::Video(video) => normalize_video(video, topic),
    }
}

fn normalize_tweet(tweet: &RawTweet, topic: &str) -> SocialPost {
    // A retweet's own counters are always zero; rank it by the original.
    let metrics = tweet
        .retweeted_metrics
        .or(tweet.public_metrics)
        .map(|m| PostMetrics {
            like_count: Some(m.like_count),
            comment_count: Some(m.reply_count),
            share_count: Some(m.retweet_count.saturating_add(m.quote_count)),
            view_count: m.impression_count,
        })
        .unwrap_or_default();

    SocialPost {
        topic: topic.trim().to_string(),
        source_id: tweet.id.clone(),
        text: tweet.text.clone(),
        created_at: tweet.created_at,
        author: tweet.author_id.clone(),
        metrics,
        media_url: None,
        permalink: Some(format!("{TWEET_PERMALINK_BASE}{}", tweet.id)),
        analysis: None,
    }
}

fn normalize_video(video: &RawVideo, topic: &str) -> SocialPost {
    let stats = video.statistics.unwrap_or_default();
    let description = video.description.trim();
    let text = if description.is_empty() {
        video.title.clone()
    } else {
        format!("{}\n\n{description}", video.title)
    };

    SocialPost {
        topic: topic.trim().to_string(),
        source_id: video.id.clone(),
        text,
        created_at: video.published_at,
        author: video.channel_title.clone(),
        metrics: PostMetrics {
            like_count: Some(stats.like_count.unwrap_or(0)),
            comment_count: Some(stats.comment_count.unwrap_or(0)),
            share_count: None,
            view_count: Some(stats.view_count.unwrap_or(0)),
        },
        media_url: video.thumbnail_url.clone(),
        permalink: Some(format!("{VIDEO_PERMALINK_BASE}{}", video.id)),
        analysis: None,
    }
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
