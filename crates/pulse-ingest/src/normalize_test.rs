use chrono::{TimeZone, Utc};

use super::*;
use crate::types::{TweetPublicMetrics, VideoStatistics};

fn tweet(own_likes: u64, original_likes: Option<u64>) -> RawTweet {
    RawTweet {
        id: "1700".to_string(),
        text: "RT @someone: big news".to_string(),
        created_at: Utc.with_ymd_and_hms(2025, 2, 3, 4, 5, 6).unwrap(),
        author_id: Some("99".to_string()),
        public_metrics: Some(TweetPublicMetrics {
            retweet_count: 0,
            reply_count: 0,
            like_count: own_likes,
            quote_count: 0,
            impression_count: None,
        }),
        retweeted_metrics: original_likes.map(|likes| TweetPublicMetrics {
            retweet_count: 7,
            reply_count: 3,
            like_count: likes,
            quote_count: 2,
            impression_count: Some(1000),
        }),
    }
}

fn video(description: &str, statistics: Option<VideoStatistics>) -> RawVideo {
    RawVideo {
        id: "dQw4w9WgXcQ".to_string(),
        title: "Match highlights".to_string(),
        description: description.to_string(),
        channel_title: Some("Sports Channel".to_string()),
        published_at: Utc.with_ymd_and_hms(2025, 4, 1, 10, 0, 0).unwrap(),
        thumbnail_url: Some("https://i.ytimg.com/vi/dQw4w9WgXcQ/default.jpg".to_string()),
        statistics,
    }
}

#[test]
fn retweet_takes_original_metrics() {
    let post = normalize(&RawItem::Tweet(tweet(0, Some(42))), "news");
    assert_eq!(post.metrics.like_count, Some(42));
    assert_eq!(post.metrics.comment_count, Some(3));
    assert_eq!(post.metrics.share_count, Some(9));
    assert_eq!(post.metrics.view_count, Some(1000));
}

#[test]
fn plain_tweet_keeps_own_metrics() {
    let post = normalize(&RawItem::Tweet(tweet(5, None)), "news");
    assert_eq!(post.metrics.like_count, Some(5));
    assert_eq!(post.metrics.share_count, Some(0));
    assert_eq!(post.metrics.view_count, None);
}

#[test]
fn tweet_without_metrics_has_none_counters() {
    let mut raw = tweet(0, None);
    raw.public_metrics = None;
    let post = normalize(&RawItem::Tweet(raw), "news");
    assert_eq!(post.metrics, PostMetrics::default());
}

#[test]
fn tweet_fields_map_onto_post() {
    let post = normalize(&RawItem::Tweet(tweet(1, None)), "  Big News ");
    assert_eq!(post.topic, "Big News");
    assert_eq!(post.source_id, "1700");
    assert_eq!(post.author.as_deref(), Some("99"));
    assert_eq!(
        post.permalink.as_deref(),
        Some("https://twitter.com/i/web/status/1700")
    );
    assert!(post.media_url.is_none());
    assert!(post.analysis.is_none());
}

#[test]
fn normalization_is_deterministic() {
    let raw = RawItem::Video(video("desc", None));
    assert_eq!(normalize(&raw, "ipl"), normalize(&raw, "ipl"));
    let raw = RawItem::Tweet(tweet(3, Some(4)));
    assert_eq!(normalize(&raw, "ipl"), normalize(&raw, "ipl"));
}

#[test]
fn video_without_statistics_has_zero_counters() {
    let post = normalize(&RawItem::Video(video("", None)), "ipl");
    assert_eq!(post.metrics.like_count, Some(0));
    assert_eq!(post.metrics.comment_count, Some(0));
    assert_eq!(post.metrics.view_count, Some(0));
    assert_eq!(post.metrics.share_count, None);
}

#[test]
fn video_text_appends_description_after_blank_line() {
    let stats = VideoStatistics {
        view_count: Some(500),
        like_count: Some(20),
        comment_count: None,
    };
    let post = normalize(&RawItem::Video(video("  Full recap. ", Some(stats))), "ipl");
    assert_eq!(post.text, "Match highlights\n\nFull recap.");
    assert_eq!(post.metrics.view_count, Some(500));
    assert_eq!(post.metrics.comment_count, Some(0));
    assert_eq!(post.author.as_deref(), Some("Sports Channel"));
    assert_eq!(
        post.permalink.as_deref(),
        Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
    );
    assert_eq!(
        post.media_url.as_deref(),
        Some("https://i.ytimg.com/vi/dQw4w9WgXcQ/default.jpg")
    );
}

#[test]
fn video_with_blank_description_is_title_only() {
    let post = normalize(&RawItem::Video(video("   ", None)), "ipl");
    assert_eq!(post.text, "Match highlights");
}
