use pulse_core::{Analysis, PartitionHandle};
use pulse_db::TopicStore;

use crate::error::{AnnotateError, AnnotationStage};

/// Every analysis present in the partition, one entry per annotated post.
///
/// Posts that were never annotated are skipped, so a partition that has
/// not been annotated yet yields an empty list.
///
/// # Errors
///
/// Returns [`AnnotateError::NotFound`] for a partition that was never
/// created, or [`AnnotateError::Store`] for other storage failures.
pub async fn list_analyses(
    store: &dyn TopicStore,
    partition: &PartitionHandle,
) -> Result<Vec<Analysis>, AnnotateError> {
    let posts = store
        .list_all(partition)
        .await
        .map_err(|e| AnnotateError::from_store(AnnotationStage::Loading, e))?;
    Ok(posts.into_iter().filter_map(|p| p.analysis).collect())
}
