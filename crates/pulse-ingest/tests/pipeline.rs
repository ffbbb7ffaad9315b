//! End-to-end ingestion against the in-memory store with stub adapters.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use pulse_core::{InvalidRequest, PlatformFamily};
use pulse_db::{MemoryTopicStore, TopicStore};
use pulse_ingest::{
    ingest, ingest_all, FetchOptions, IngestError, IngestRequest, PlatformAdapter, RawItem,
    RawTweet, SourceError, SourceSet, TweetPublicMetrics,
};

struct StubTwitter {
    likes: u64,
    calls: AtomicUsize,
}

impl StubTwitter {
    fn new(likes: u64) -> Self {
        Self {
            likes,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PlatformAdapter for StubTwitter {
    fn family(&self) -> PlatformFamily {
        PlatformFamily::Twitter
    }

    async fn fetch(
        &self,
        _topic: &str,
        _limit: u32,
        _options: &FetchOptions,
    ) -> Result<Vec<RawItem>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(["1", "2", "3"]
            .into_iter()
            .map(|id| {
                RawItem::Tweet(RawTweet {
                    id: id.to_string(),
                    text: format!("tweet {id}"),
                    created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
                    author_id: Some("a".to_string()),
                    public_metrics: Some(TweetPublicMetrics {
                        like_count: self.likes,
                        ..TweetPublicMetrics::default()
                    }),
                    retweeted_metrics: None,
                })
            })
            .collect())
    }
}

struct DownYoutube;

#[async_trait]
impl PlatformAdapter for DownYoutube {
    fn family(&self) -> PlatformFamily {
        PlatformFamily::Youtube
    }

    async fn fetch(
        &self,
        _topic: &str,
        _limit: u32,
        _options: &FetchOptions,
    ) -> Result<Vec<RawItem>, SourceError> {
        Err(SourceError::Status {
            platform: "youtube",
            status: 503,
            body: "unavailable".to_string(),
        })
    }
}

#[tokio::test]
async fn ingest_writes_normalized_posts_into_derived_partition() {
    let store = MemoryTopicStore::new();
    let adapter = StubTwitter::new(4);

    let posts = ingest(&store, &adapter, &IngestRequest::new("My Topic!!"), 4)
        .await
        .expect("ingest");
    assert_eq!(posts.len(), 3);
    assert!(posts.iter().all(|p| p.topic == "My Topic!!"));

    let partition = store
        .find_partition("tweets_my_topic")
        .await
        .expect("find")
        .expect("partition exists");
    assert_eq!(store.list_all(&partition).await.expect("list").len(), 3);
}

#[tokio::test]
async fn reingest_updates_in_place() {
    let store = MemoryTopicStore::new();
    ingest(&store, &StubTwitter::new(1), &IngestRequest::new("rust"), 4)
        .await
        .expect("first ingest");
    ingest(&store, &StubTwitter::new(9), &IngestRequest::new("RUST"), 4)
        .await
        .expect("second ingest");

    let partitions = store.list_partitions().await.expect("list");
    assert_eq!(partitions.len(), 1);
    let posts = store.list_all(&partitions[0]).await.expect("posts");
    assert_eq!(posts.len(), 3);
    assert!(posts.iter().all(|p| p.metrics.like_count == Some(9)));
}

#[tokio::test]
async fn blank_topic_is_rejected_before_fetching() {
    let store = MemoryTopicStore::new();
    let adapter = StubTwitter::new(0);

    let err = ingest(&store, &adapter, &IngestRequest::new("   "), 4)
        .await
        .expect_err("blank topic");
    assert!(matches!(
        err,
        IngestError::InvalidRequest(InvalidRequest::MissingTopic)
    ));
    assert_eq!(adapter.calls.load(Ordering::SeqCst), 0);
    assert!(store.list_partitions().await.expect("list").is_empty());
}

#[tokio::test]
async fn source_failure_writes_nothing() {
    let store = MemoryTopicStore::new();
    let err = ingest(&store, &DownYoutube, &IngestRequest::new("ipl"), 4)
        .await
        .expect_err("source down");
    assert!(matches!(
        err,
        IngestError::SourceUnavailable {
            family: PlatformFamily::Youtube,
            ..
        }
    ));
    assert!(store.list_partitions().await.expect("list").is_empty());
}

#[tokio::test]
async fn ingest_all_reports_each_platform_independently() {
    let store = MemoryTopicStore::new();
    let sources = SourceSet::new()
        .with_adapter(Arc::new(StubTwitter::new(2)))
        .with_adapter(Arc::new(DownYoutube));

    let outcomes = ingest_all(
        &store,
        &sources,
        &IngestRequest::new("ipl"),
        &PlatformFamily::ALL,
        4,
    )
    .await
    .expect("valid topic");

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].family, PlatformFamily::Twitter);
    assert_eq!(outcomes[0].result.as_ref().map(Vec::len).ok(), Some(3));
    assert_eq!(outcomes[1].family, PlatformFamily::Youtube);
    assert!(outcomes[1].result.is_err());
}

#[tokio::test]
async fn unconfigured_platform_is_source_unavailable() {
    let sources = SourceSet::new();
    let err = sources
        .adapter(PlatformFamily::Twitter)
        .err()
        .expect("no adapter configured");
    assert!(matches!(
        err,
        IngestError::SourceUnavailable {
            source: SourceError::NotConfigured { platform: "twitter" },
            ..
        }
    ));
}
