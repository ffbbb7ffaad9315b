use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use pulse_annotate::{annotate_partition, resolve_partition, PromptStats};
use pulse_core::{Analysis, PlatformFamily};
use pulse_db::WriteBackSummary;
use serde::{Deserialize, Serialize};

use super::{map_annotate_error, map_invalid_request, map_json_rejection, ApiError, AppState};
use crate::middleware::RequestId;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AnnotateBody {
    #[serde(default, alias = "query")]
    topic: Option<String>,
    #[serde(default, alias = "platform")]
    platform_family: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AnnotateResponse {
    topic: String,
    partition: String,
    analysis: Analysis,
    write_back: WriteBackSummary,
    prompt: PromptStats,
}

pub(super) async fn annotate_topic(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<AnnotateBody>, JsonRejection>,
) -> Result<Json<AnnotateResponse>, ApiError> {
    let Json(body) = body.map_err(|e| map_json_rejection(req_id.0.clone(), &e))?;
    let family = body
        .platform_family
        .as_deref()
        .map(str::parse::<PlatformFamily>)
        .transpose()
        .map_err(|e| map_invalid_request(req_id.0.clone(), &e))?;
    let topic = body.topic.unwrap_or_default();

    let partition = resolve_partition(state.store.as_ref(), &topic, family)
        .await
        .map_err(|e| map_annotate_error(req_id.0.clone(), e))?;

    let outcome = annotate_partition(
        state.store.as_ref(),
        state.inference.as_ref(),
        &partition,
        state.settings,
    )
    .await
    .map_err(|e| map_annotate_error(req_id.0.clone(), e))?;

    Ok(Json(AnnotateResponse {
        topic: topic.trim().to_string(),
        partition: outcome.partition.name,
        analysis: outcome.analysis,
        write_back: outcome.write_back,
        prompt: outcome.prompt,
    }))
}
