use std::collections::BTreeMap;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use pulse_core::{partition_name, PlatformFamily, SocialPost};
use pulse_ingest::{ingest, ingest_all, FetchOptions, IngestRequest, DEFAULT_LIMIT};
use serde::{Deserialize, Serialize};

use super::{map_ingest_error, map_invalid_request, map_json_rejection, ApiError, AppState};
use crate::middleware::RequestId;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct IngestBody {
    #[serde(default, alias = "query")]
    topic: Option<String>,
    #[serde(default, alias = "maxResults")]
    limit: Option<u32>,
    #[serde(default, alias = "lang")]
    language: Option<String>,
    /// Only read by the multi-platform route; all families when absent.
    #[serde(default)]
    platforms: Option<Vec<String>>,
}

impl IngestBody {
    fn to_request(&self) -> IngestRequest {
        IngestRequest {
            topic: self.topic.clone().unwrap_or_default(),
            limit: self.limit.unwrap_or(DEFAULT_LIMIT),
            options: FetchOptions {
                language: self.language.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(super) enum PlatformResult {
    Ingested { count: usize, posts: Vec<SocialPost> },
    Failed { error: String, code: &'static str },
}

#[derive(Debug, Serialize)]
pub(super) struct IngestAllResponse {
    topic: String,
    results: BTreeMap<&'static str, PlatformResult>,
}

pub(super) async fn ingest_platform(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(platform): Path<String>,
    body: Result<Json<IngestBody>, JsonRejection>,
) -> Result<Json<Vec<SocialPost>>, ApiError> {
    let Json(body) = body.map_err(|e| map_json_rejection(req_id.0.clone(), &e))?;
    let family: PlatformFamily = platform
        .parse()
        .map_err(|e| map_invalid_request(req_id.0.clone(), &e))?;

    let request = body.to_request();
    partition_name(&request.topic, family)
        .map_err(|e| map_invalid_request(req_id.0.clone(), &e))?;

    let adapter = state
        .sources
        .adapter(family)
        .map_err(|e| map_ingest_error(req_id.0.clone(), &e))?;

    let posts = ingest(
        state.store.as_ref(),
        adapter,
        &request,
        state.settings.write_concurrency,
    )
    .await
    .map_err(|e| map_ingest_error(req_id.0, &e))?;
    Ok(Json(posts))
}

pub(super) async fn ingest_all_platforms(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<IngestBody>, JsonRejection>,
) -> Result<Json<IngestAllResponse>, ApiError> {
    let Json(body) = body.map_err(|e| map_json_rejection(req_id.0.clone(), &e))?;

    let families: Vec<PlatformFamily> = match &body.platforms {
        Some(names) if !names.is_empty() => {
            let mut families = Vec::with_capacity(names.len());
            for name in names {
                let family: PlatformFamily = name
                    .parse()
                    .map_err(|e| map_invalid_request(req_id.0.clone(), &e))?;
                if !families.contains(&family) {
                    families.push(family);
                }
            }
            families
        }
        _ => PlatformFamily::ALL.to_vec(),
    };

    let request = body.to_request();
    let outcomes = ingest_all(
        state.store.as_ref(),
        &state.sources,
        &request,
        &families,
        state.settings.write_concurrency,
    )
    .await
    .map_err(|e| map_ingest_error(req_id.0.clone(), &e))?;

    let results = outcomes
        .into_iter()
        .map(|outcome| {
            let result = match outcome.result {
                Ok(posts) => PlatformResult::Ingested {
                    count: posts.len(),
                    posts,
                },
                Err(e) => {
                    let mapped = map_ingest_error(req_id.0.clone(), &e);
                    PlatformResult::Failed {
                        error: mapped.error,
                        code: mapped.code,
                    }
                }
            };
            (outcome.family.as_str(), result)
        })
        .collect();

    Ok(Json(IngestAllResponse {
        topic: request.topic.trim().to_string(),
        results,
    }))
}
