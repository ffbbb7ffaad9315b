use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use pulse_annotate::{list_analyses, resolve_partition};
use pulse_core::{Analysis, PartitionHandle, PlatformFamily, SocialPost};
use serde::{Deserialize, Serialize};

use super::{map_annotate_error, map_db_error, map_invalid_request, ApiError, AppState};
use crate::middleware::RequestId;

#[derive(Debug, Serialize)]
pub(super) struct PartitionList {
    partitions: Vec<PartitionHandle>,
}

#[derive(Debug, Serialize)]
pub(super) struct PartitionPosts {
    partition: PartitionHandle,
    posts: Vec<SocialPost>,
}

#[derive(Debug, Serialize)]
pub(super) struct PartitionAnalysis {
    analysis: Vec<Analysis>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct TopicAnalysisQuery {
    #[serde(default, alias = "query")]
    topic: Option<String>,
    #[serde(default, alias = "platform")]
    platform_family: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct TopicAnalysis {
    topic: String,
    partition: String,
    analysis: Vec<Analysis>,
}

async fn find(state: &AppState, req_id: &RequestId, name: &str) -> Result<PartitionHandle, ApiError> {
    state
        .store
        .find_partition(name)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(
                req_id.0.clone(),
                "not_found",
                format!("partition not found: {name}"),
            )
        })
}

pub(super) async fn list_partitions(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<PartitionList>, ApiError> {
    let partitions = state
        .store
        .list_partitions()
        .await
        .map_err(|e| map_db_error(req_id.0, &e))?;
    Ok(Json(PartitionList { partitions }))
}

pub(super) async fn list_partition_posts(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(name): Path<String>,
) -> Result<Json<PartitionPosts>, ApiError> {
    let partition = find(&state, &req_id, &name).await?;
    let mut posts = state
        .store
        .list_all(&partition)
        .await
        .map_err(|e| map_db_error(req_id.0, &e))?;
    posts.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.source_id.cmp(&b.source_id))
    });
    Ok(Json(PartitionPosts { partition, posts }))
}

pub(super) async fn list_partition_analysis(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(name): Path<String>,
) -> Result<Json<PartitionAnalysis>, ApiError> {
    let partition = find(&state, &req_id, &name).await?;
    let analysis = list_analyses(state.store.as_ref(), &partition)
        .await
        .map_err(|e| map_annotate_error(req_id.0, e))?;
    Ok(Json(PartitionAnalysis { analysis }))
}

/// Analysis read keyed by topic, resolved the same way annotation resolves it.
pub(super) async fn topic_analysis(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<TopicAnalysisQuery>,
) -> Result<Json<TopicAnalysis>, ApiError> {
    let family = query
        .platform_family
        .as_deref()
        .map(str::parse::<PlatformFamily>)
        .transpose()
        .map_err(|e| map_invalid_request(req_id.0.clone(), &e))?;
    let topic = query.topic.unwrap_or_default();

    let partition = resolve_partition(state.store.as_ref(), &topic, family)
        .await
        .map_err(|e| map_annotate_error(req_id.0.clone(), e))?;
    let analysis = list_analyses(state.store.as_ref(), &partition)
        .await
        .map_err(|e| map_annotate_error(req_id.0, e))?;

    Ok(Json(TopicAnalysis {
        topic: topic.trim().to_string(),
        partition: partition.name,
        analysis,
    }))
}
