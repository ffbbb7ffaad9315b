//! Live tests for [`PgTopicStore`] using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database from the sqlx
//! test harness, so they need `DATABASE_URL` pointing at a server that allows
//! database creation. Run with `cargo test -p pulse-db -- --ignored`.

use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use pulse_core::{
    Analysis, AnalysisReport, PartitionHandle, PlatformFamily, PostMetrics, SentimentDistribution,
    SocialPost, WordCountStats,
};
use pulse_db::{write_back_analysis, DbError, PgTopicStore, TopicStore};
use serde_json::json;

fn post(source_id: &str, text: &str, likes: u64) -> SocialPost {
    SocialPost {
        topic: "Rust".to_string(),
        source_id: source_id.to_string(),
        text: text.to_string(),
        created_at: Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap(),
        author: Some("42".to_string()),
        metrics: PostMetrics {
            like_count: Some(likes),
            comment_count: Some(0),
            share_count: Some(2),
            view_count: None,
        },
        media_url: None,
        permalink: Some(format!("https://twitter.com/i/web/status/{source_id}")),
        analysis: None,
    }
}

fn analysis(positive: &str) -> Analysis {
    Analysis::V1(AnalysisReport {
        sentiment_distribution: SentimentDistribution {
            positive: json!(positive),
            neutral: json!("20%"),
            negative: json!("10%"),
        },
        top_engagers: vec![],
        content_themes: BTreeMap::new(),
        keyword_frequency: BTreeMap::new(),
        word_count_stats: WordCountStats {
            average_words: 3.5,
            max_words: 5,
            min_words: 2,
        },
        top_positive_words: vec![],
        top_negative_words: vec![],
    })
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn partition_for_is_idempotent_across_store_instances(pool: sqlx::PgPool) {
    let first = PgTopicStore::new(pool.clone())
        .partition_for("My Topic!!", PlatformFamily::Twitter)
        .await
        .expect("first partition_for");
    let second = PgTopicStore::new(pool)
        .partition_for("my_topic", PlatformFamily::Twitter)
        .await
        .expect("second partition_for");

    assert_eq!(first.name, "tweets_my_topic");
    assert_eq!(first.name, second.name);
    assert_eq!(first.topic, "My Topic!!");
    assert_eq!(second.topic, "My Topic!!");
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn upsert_replaces_fields_but_preserves_analysis(pool: sqlx::PgPool) {
    let store = PgTopicStore::new(pool);
    let partition = store
        .partition_for("Rust", PlatformFamily::Twitter)
        .await
        .expect("partition_for");

    store
        .upsert(&partition, &post("1", "old", 1))
        .await
        .expect("insert");
    store
        .set_analysis(&partition, "1", &analysis("70%"))
        .await
        .expect("set_analysis");
    store
        .upsert(&partition, &post("1", "new", 5))
        .await
        .expect("update");

    let posts = store.list_all(&partition).await.expect("list_all");
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].text, "new");
    assert_eq!(posts[0].metrics.like_count, Some(5));
    assert_eq!(posts[0].metrics.view_count, None);
    assert_eq!(posts[0].analysis, Some(analysis("70%")));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn write_back_reaches_every_post(pool: sqlx::PgPool) {
    let store = PgTopicStore::new(pool);
    let partition = store
        .partition_for("Rust", PlatformFamily::Youtube)
        .await
        .expect("partition_for");
    for id in ["a", "b", "c"] {
        store
            .upsert(&partition, &post(id, "video", 0))
            .await
            .expect("upsert");
    }

    let summary = write_back_analysis(&store, &partition, &analysis("55%"), 4)
        .await
        .expect("write_back");
    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.written, 3);

    let posts = store.list_all(&partition).await.expect("list_all");
    assert!(posts.iter().all(|p| p.analysis == Some(analysis("55%"))));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn unknown_partition_and_post_are_not_found(pool: sqlx::PgPool) {
    let store = PgTopicStore::new(pool);
    let ghost = PartitionHandle {
        name: "tweets_ghost".to_string(),
        topic: "ghost".to_string(),
        platform_family: PlatformFamily::Twitter,
        created_at: Utc::now(),
    };
    let err = store.list_all(&ghost).await.expect_err("ghost partition");
    assert!(matches!(err, DbError::PartitionNotFound(_)));

    let partition = store
        .partition_for("empty", PlatformFamily::Twitter)
        .await
        .expect("partition_for");
    assert!(store.list_all(&partition).await.expect("empty").is_empty());

    let err = store
        .set_analysis(&partition, "missing", &analysis("0%"))
        .await
        .expect_err("missing post");
    assert!(matches!(err, DbError::PostNotFound { .. }));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn list_partitions_reads_rows_created_elsewhere(pool: sqlx::PgPool) {
    PgTopicStore::new(pool.clone())
        .partition_for("Go", PlatformFamily::Twitter)
        .await
        .expect("partition_for");

    let fresh = PgTopicStore::new(pool);
    let partitions = fresh.list_partitions().await.expect("list_partitions");
    assert_eq!(partitions.len(), 1);
    assert_eq!(partitions[0].name, "tweets_go");
    assert!(fresh
        .find_partition("tweets_go")
        .await
        .expect("find")
        .is_some());
}
