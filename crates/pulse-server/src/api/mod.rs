mod annotate;
mod ingest;
mod partitions;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use pulse_annotate::{AnnotateError, AnnotateSettings, DynInferenceClient};
use pulse_core::InvalidRequest;
use pulse_db::{DbError, TopicStore};
use pulse_ingest::{IngestError, SourceSet};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TopicStore>,
    pub sources: SourceSet,
    pub inference: DynInferenceClient,
    pub settings: AnnotateSettings,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub error: String,
    pub code: &'static str,
    /// Unparsed model reply, only for `malformed_response`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    pub request_id: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    store: &'static str,
    inference: &'static str,
}

impl ApiError {
    pub fn new(request_id: impl Into<String>, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code,
            raw: None,
            request_id: request_id.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.code {
            "not_found" | "no_data" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "invalid_request" | "ambiguous_platform" => StatusCode::BAD_REQUEST,
            "source_unavailable" => StatusCode::BAD_GATEWAY,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_invalid_request(request_id: String, error: &InvalidRequest) -> ApiError {
    ApiError::new(request_id, "invalid_request", error.to_string())
}

pub(super) fn map_json_rejection(request_id: String, rejection: &JsonRejection) -> ApiError {
    ApiError::new(request_id, "bad_request", rejection.body_text())
}

pub(super) fn map_db_error(request_id: String, error: &DbError) -> ApiError {
    match error {
        DbError::PartitionNotFound(_) | DbError::PostNotFound { .. } => {
            ApiError::new(request_id, "not_found", error.to_string())
        }
        DbError::InvalidRequest(inner) => map_invalid_request(request_id, inner),
        _ => {
            tracing::error!(error = %error, "store operation failed");
            ApiError::new(request_id, "internal_error", "store operation failed")
        }
    }
}

pub(super) fn map_ingest_error(request_id: String, error: &IngestError) -> ApiError {
    match error {
        IngestError::InvalidRequest(inner) => map_invalid_request(request_id, inner),
        IngestError::SourceUnavailable { .. } => {
            ApiError::new(request_id, "source_unavailable", error.to_string())
        }
        IngestError::Store(inner) => map_db_error(request_id, inner),
    }
}

pub(super) fn map_annotate_error(request_id: String, error: AnnotateError) -> ApiError {
    match error {
        AnnotateError::InvalidRequest(inner) => map_invalid_request(request_id, &inner),
        AnnotateError::AmbiguousPlatform(_) => {
            ApiError::new(request_id, "ambiguous_platform", error.to_string())
        }
        AnnotateError::NotFound(_) => ApiError::new(request_id, "not_found", error.to_string()),
        AnnotateError::NoData(_) => ApiError::new(request_id, "no_data", error.to_string()),
        AnnotateError::PromptBudgetExhausted { .. } => {
            tracing::error!(error = %error, "prompt ceiling too small");
            ApiError::new(request_id, "prompt_budget_exhausted", error.to_string())
        }
        AnnotateError::InferenceUnavailable(_) => {
            ApiError::new(request_id, "inference_unavailable", error.to_string())
        }
        AnnotateError::MalformedResponse { raw, reason } => ApiError {
            error: format!("failed to parse inference response: {reason}"),
            code: "malformed_response",
            raw: Some(raw),
            request_id,
        },
        AnnotateError::Store { source, .. } => map_db_error(request_id, &source),
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/ingest", post(ingest::ingest_all_platforms))
        .route("/api/v1/ingest/{platform}", post(ingest::ingest_platform))
        .route("/api/v1/annotate", post(annotate::annotate_topic))
        .route("/api/v1/analysis", get(partitions::topic_analysis))
        .route("/api/v1/partitions", get(partitions::list_partitions))
        .route(
            "/api/v1/partitions/{name}/posts",
            get(partitions::list_partition_posts),
        )
        .route(
            "/api/v1/partitions/{name}/analysis",
            get(partitions::list_partition_analysis),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let inference = state.inference.provider_name();
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthData {
                status: "ok",
                store: "ok",
                inference,
            }),
        ),
        Err(e) => {
            tracing::warn!(request_id = %req_id.0, error = %e, "health check: store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthData {
                    status: "degraded",
                    store: "unavailable",
                    inference,
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}
