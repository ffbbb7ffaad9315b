//! Annotation runs against the in-memory store with stub inference clients.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use pulse_annotate::{
    annotate_partition, list_analyses, resolve_partition, AnnotateError, AnnotateSettings,
    AnnotationStage, InferenceClient, InferenceError,
};
use pulse_core::{
    Analysis, PartitionHandle, PlatformFamily, PostMetrics, SocialPost, MAX_TOP_ENGAGERS,
};
use pulse_db::{DbError, MemoryTopicStore, TopicStore};

const REPORT: &str = r#"{
    "sentimentDistribution": {"positive": "mostly upbeat", "neutral": "some news", "negative": "few complaints"},
    "topEngagers": [{"id": "2", "reason": "highest likes"}],
    "contentThemes": {"match": ["final over", "run chase"]},
    "keywordFrequency": {"ipl": 3, "final": 2},
    "wordCountStats": {"averageWords": 3.0, "maxWords": 4, "minWords": 2},
    "topPositiveWords": ["win"],
    "topNegativeWords": ["loss"]
}"#;

const SETTINGS: AnnotateSettings = AnnotateSettings {
    prompt_max_bytes: 100_000,
    write_concurrency: 4,
};

struct FixedReply {
    reply: String,
    calls: AtomicUsize,
}

impl FixedReply {
    fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl InferenceClient for FixedReply {
    async fn infer(&self, _prompt: &str) -> Result<String, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }

    fn provider_name(&self) -> &'static str {
        "fixed"
    }
}

struct Unreachable;

#[async_trait]
impl InferenceClient for Unreachable {
    async fn infer(&self, _prompt: &str) -> Result<String, InferenceError> {
        Err(InferenceError::Status {
            status: 503,
            body: "unavailable".to_string(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "unreachable"
    }
}

/// Delegates to a memory store but refuses analysis writes for one post.
struct FlakyStore {
    inner: MemoryTopicStore,
    failing_source_id: &'static str,
}

#[async_trait]
impl TopicStore for FlakyStore {
    async fn partition_for(
        &self,
        topic: &str,
        family: PlatformFamily,
    ) -> Result<PartitionHandle, DbError> {
        self.inner.partition_for(topic, family).await
    }

    async fn find_partition(&self, name: &str) -> Result<Option<PartitionHandle>, DbError> {
        self.inner.find_partition(name).await
    }

    async fn list_partitions(&self) -> Result<Vec<PartitionHandle>, DbError> {
        self.inner.list_partitions().await
    }

    async fn upsert(&self, partition: &PartitionHandle, post: &SocialPost) -> Result<(), DbError> {
        self.inner.upsert(partition, post).await
    }

    async fn list_all(&self, partition: &PartitionHandle) -> Result<Vec<SocialPost>, DbError> {
        self.inner.list_all(partition).await
    }

    async fn set_analysis(
        &self,
        partition: &PartitionHandle,
        source_id: &str,
        analysis: &Analysis,
    ) -> Result<(), DbError> {
        if source_id == self.failing_source_id {
            return Err(DbError::PostNotFound {
                partition: partition.name.clone(),
                source_id: source_id.to_string(),
            });
        }
        self.inner.set_analysis(partition, source_id, analysis).await
    }

    async fn ping(&self) -> Result<(), DbError> {
        self.inner.ping().await
    }
}

fn post(id: &str, text: &str) -> SocialPost {
    SocialPost {
        topic: "IPL".to_string(),
        source_id: id.to_string(),
        text: text.to_string(),
        created_at: Utc.with_ymd_and_hms(2025, 5, 25, 18, 0, 0).unwrap(),
        author: Some(format!("user-{id}")),
        metrics: PostMetrics {
            like_count: Some(id.parse().unwrap_or(0)),
            ..PostMetrics::default()
        },
        media_url: None,
        permalink: None,
        analysis: None,
    }
}

async fn seeded(store: &dyn TopicStore) -> PartitionHandle {
    let partition = store
        .partition_for("IPL", PlatformFamily::Twitter)
        .await
        .expect("partition_for");
    for (id, text) in [("1", "what a final"), ("2", "ipl win tonight"), ("3", "tough loss")] {
        store.upsert(&partition, &post(id, text)).await.expect("upsert");
    }
    partition
}

#[tokio::test]
async fn three_posts_receive_identical_analysis() {
    let store = MemoryTopicStore::new();
    let partition = seeded(&store).await;
    let inference = FixedReply::new(REPORT);

    let outcome = annotate_partition(&store, &inference, &partition, SETTINGS)
        .await
        .expect("annotate");

    assert_eq!(inference.calls.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.write_back.attempted, 3);
    assert_eq!(outcome.write_back.written, 3);
    assert_eq!(outcome.prompt.included, 3);
    assert_eq!(outcome.prompt.dropped, 0);

    let stored = list_analyses(&store, &partition).await.expect("list");
    assert_eq!(stored.len(), 3);
    assert!(stored.iter().all(|a| *a == outcome.analysis));
    assert!(outcome.analysis.report().top_engagers.len() <= MAX_TOP_ENGAGERS);
}

#[tokio::test]
async fn fenced_reply_is_accepted() {
    let store = MemoryTopicStore::new();
    let partition = seeded(&store).await;
    let inference = FixedReply::new(format!("```json\n{REPORT}\n```"));

    let outcome = annotate_partition(&store, &inference, &partition, SETTINGS)
        .await
        .expect("annotate");
    assert!(outcome.write_back.is_complete());
}

#[tokio::test]
async fn fenced_invalid_json_is_malformed_with_exact_raw() {
    let store = MemoryTopicStore::new();
    let partition = seeded(&store).await;
    let raw = "```json\n{\"sentimentDistribution\": oops}\n```";
    let inference = FixedReply::new(raw);

    let err = annotate_partition(&store, &inference, &partition, SETTINGS)
        .await
        .expect_err("malformed reply");
    match err {
        AnnotateError::MalformedResponse { raw: got, .. } => assert_eq!(got, raw),
        other => panic!("expected MalformedResponse, got {other:?}"),
    }

    assert!(list_analyses(&store, &partition)
        .await
        .expect("list")
        .is_empty());
}

#[tokio::test]
async fn single_line_fenced_invalid_json_keeps_exact_raw() {
    let store = MemoryTopicStore::new();
    let partition = seeded(&store).await;
    let raw = "```json {bad json```";

    let err = annotate_partition(&store, &FixedReply::new(raw), &partition, SETTINGS)
        .await
        .expect_err("malformed reply");
    assert_eq!(err.stage(), AnnotationStage::Parsing);
    match err {
        AnnotateError::MalformedResponse { raw: got, .. } => assert_eq!(got, raw),
        other => panic!("expected MalformedResponse, got {other:?}"),
    }
}

#[tokio::test]
async fn ceiling_below_header_fails_before_inference() {
    let store = MemoryTopicStore::new();
    let partition = seeded(&store).await;
    let inference = FixedReply::new(REPORT);
    let tiny = AnnotateSettings {
        prompt_max_bytes: 100,
        ..SETTINGS
    };

    let err = annotate_partition(&store, &inference, &partition, tiny)
        .await
        .expect_err("no room for records");
    assert!(matches!(
        err,
        AnnotateError::PromptBudgetExhausted { max_bytes: 100, .. }
    ));
    assert_eq!(err.stage(), AnnotationStage::Prompting);
    assert_eq!(inference.calls.load(Ordering::SeqCst), 0);
    assert!(list_analyses(&store, &partition)
        .await
        .expect("list")
        .is_empty());
}

#[tokio::test]
async fn empty_partition_is_no_data() {
    let store = MemoryTopicStore::new();
    let partition = store
        .partition_for("quiet", PlatformFamily::Youtube)
        .await
        .expect("partition_for");
    let inference = FixedReply::new(REPORT);

    let err = annotate_partition(&store, &inference, &partition, SETTINGS)
        .await
        .expect_err("no data");
    assert!(matches!(err, AnnotateError::NoData(_)));
    assert_eq!(err.stage(), AnnotationStage::Loading);
    assert_eq!(inference.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_partition_is_not_found() {
    let store = MemoryTopicStore::new();
    let ghost = PartitionHandle {
        name: "tweets_ghost".to_string(),
        topic: "ghost".to_string(),
        platform_family: PlatformFamily::Twitter,
        created_at: Utc::now(),
    };

    let err = annotate_partition(&store, &FixedReply::new(REPORT), &ghost, SETTINGS)
        .await
        .expect_err("not found");
    assert!(matches!(err, AnnotateError::NotFound(_)));

    let err = list_analyses(&store, &ghost).await.expect_err("not found");
    assert!(matches!(err, AnnotateError::NotFound(_)));
}

#[tokio::test]
async fn inference_failure_leaves_posts_untouched() {
    let store = MemoryTopicStore::new();
    let partition = seeded(&store).await;

    let err = annotate_partition(&store, &Unreachable, &partition, SETTINGS)
        .await
        .expect_err("inference down");
    assert!(matches!(err, AnnotateError::InferenceUnavailable(_)));
    assert_eq!(err.stage(), AnnotationStage::Inferring);
    assert!(list_analyses(&store, &partition)
        .await
        .expect("list")
        .is_empty());
}

#[tokio::test]
async fn one_failed_write_is_reported_not_raised() {
    let store = FlakyStore {
        inner: MemoryTopicStore::new(),
        failing_source_id: "2",
    };
    let partition = seeded(&store).await;

    let outcome = annotate_partition(&store, &FixedReply::new(REPORT), &partition, SETTINGS)
        .await
        .expect("partial write-back still returns the report");

    assert_eq!(outcome.write_back.attempted, 3);
    assert_eq!(outcome.write_back.written, 2);
    assert_eq!(outcome.write_back.failures.len(), 1);
    assert_eq!(outcome.write_back.failures[0].source_id, "2");

    let annotated: HashSet<String> = store
        .list_all(&partition)
        .await
        .expect("list")
        .into_iter()
        .filter(|p| p.analysis.is_some())
        .map(|p| p.source_id)
        .collect();
    assert_eq!(
        annotated,
        HashSet::from(["1".to_string(), "3".to_string()])
    );
}

#[tokio::test]
async fn reingest_after_annotation_keeps_analysis() {
    let store = MemoryTopicStore::new();
    let partition = seeded(&store).await;
    annotate_partition(&store, &FixedReply::new(REPORT), &partition, SETTINGS)
        .await
        .expect("annotate");

    store
        .upsert(&partition, &post("2", "edited text"))
        .await
        .expect("re-ingest");
    assert_eq!(list_analyses(&store, &partition).await.expect("list").len(), 3);
}

#[tokio::test]
async fn resolve_partition_picks_single_family_and_rejects_ambiguity() {
    let store = MemoryTopicStore::new();
    store
        .partition_for("IPL", PlatformFamily::Youtube)
        .await
        .expect("videos");

    let handle = resolve_partition(&store, "ipl", None).await.expect("single");
    assert_eq!(handle.name, "videos_ipl");

    let err = resolve_partition(&store, "ipl", Some(PlatformFamily::Twitter))
        .await
        .expect_err("no tweets partition");
    assert!(matches!(err, AnnotateError::NotFound(_)));

    store
        .partition_for("IPL", PlatformFamily::Twitter)
        .await
        .expect("tweets");
    let err = resolve_partition(&store, "IPL", None)
        .await
        .expect_err("ambiguous");
    assert!(matches!(err, AnnotateError::AmbiguousPlatform(_)));

    let err = resolve_partition(&store, "!!!", None)
        .await
        .expect_err("unusable");
    assert!(matches!(err, AnnotateError::InvalidRequest(_)));
}
