use async_trait::async_trait;
use futures::future::FutureExt;
use futures::stream::{self, StreamExt};
use pulse_core::{Analysis, PartitionHandle, PlatformFamily, SocialPost};
use serde::Serialize;

use crate::DbError;

/// Storage contract shared by the ingestion and annotation paths.
#[async_trait]
pub trait TopicStore: Send + Sync {
    /// Resolve the partition for `topic` in `family`, creating it on first
    /// reference. Repeated calls with inputs that derive the same name return
    /// the same partition.
    async fn partition_for(
        &self,
        topic: &str,
        family: PlatformFamily,
    ) -> Result<PartitionHandle, DbError>;

    /// Look up an existing partition by derived name without creating it.
    async fn find_partition(&self, name: &str) -> Result<Option<PartitionHandle>, DbError>;

    async fn list_partitions(&self) -> Result<Vec<PartitionHandle>, DbError>;

    /// Insert `post`, or replace every field of the stored post with the same
    /// `source_id` except `analysis`. The incoming `analysis` is ignored.
    async fn upsert(&self, partition: &PartitionHandle, post: &SocialPost) -> Result<(), DbError>;

    /// Every post in the partition, in no particular order.
    ///
    /// A partition that was never created is [`DbError::PartitionNotFound`],
    /// never an empty `Vec`.
    async fn list_all(&self, partition: &PartitionHandle) -> Result<Vec<SocialPost>, DbError>;

    /// Overwrite the analysis of one post.
    async fn set_analysis(
        &self,
        partition: &PartitionHandle,
        source_id: &str,
        analysis: &Analysis,
    ) -> Result<(), DbError>;

    async fn ping(&self) -> Result<(), DbError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteFailure {
    pub source_id: String,
    pub error: String,
}

/// Aggregate of one write-back broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WriteBackSummary {
    pub attempted: usize,
    pub written: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<WriteFailure>,
}

impl WriteBackSummary {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.written == self.attempted
    }
}

/// Write `analysis` onto each listed post as independent, concurrent writes.
///
/// At most `concurrency` writes are in flight. A failed write does not affect
/// the others; every outcome is collected into the summary.
pub async fn fan_out_analysis(
    store: &dyn TopicStore,
    partition: &PartitionHandle,
    source_ids: &[String],
    analysis: &Analysis,
    concurrency: usize,
) -> WriteBackSummary {
    let outcomes: Vec<(&String, Result<(), DbError>)> = stream::iter(source_ids)
        .map(|source_id| async move {
            let result = store.set_analysis(partition, source_id, analysis).await;
            (source_id, result)
        })
        .buffer_unordered(concurrency.max(1))
        .collect::<Vec<_>>()
        .boxed()
        .await;

    let mut summary = WriteBackSummary {
        attempted: source_ids.len(),
        ..WriteBackSummary::default()
    };
    for (source_id, result) in outcomes {
        match result {
            Ok(()) => summary.written += 1,
            Err(e) => {
                tracing::warn!(
                    partition = %partition.name,
                    source_id = %source_id,
                    error = %e,
                    "analysis write-back failed for post"
                );
                summary.failures.push(WriteFailure {
                    source_id: source_id.clone(),
                    error: e.to_string(),
                });
            }
        }
    }
    summary.failures.sort_by(|a, b| a.source_id.cmp(&b.source_id));
    summary
}

/// Overwrite the analysis on every post currently in the partition.
///
/// The post set is snapshotted first; posts inserted while the broadcast is
/// running may or may not receive the analysis.
///
/// # Errors
///
/// Returns [`DbError::PartitionNotFound`] for a partition that was never
/// created, or any error from listing the snapshot. Per-post failures are
/// reported in the summary instead.
pub async fn write_back_analysis(
    store: &dyn TopicStore,
    partition: &PartitionHandle,
    analysis: &Analysis,
    concurrency: usize,
) -> Result<WriteBackSummary, DbError> {
    let source_ids: Vec<String> = store
        .list_all(partition)
        .await?
        .into_iter()
        .map(|post| post.source_id)
        .collect();
    Ok(fan_out_analysis(store, partition, &source_ids, analysis, concurrency).await)
}
