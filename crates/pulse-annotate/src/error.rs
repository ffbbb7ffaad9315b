use std::fmt;

use pulse_core::InvalidRequest;
use pulse_db::DbError;
use serde::Serialize;
use thiserror::Error;

/// Failure reaching the language model or reading its reply envelope.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("inference backend is not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("inference backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("inference response carried no candidate text")]
    EmptyResponse,

    #[error("inference response envelope could not be decoded: {0}")]
    Deserialize(#[source] serde_json::Error),

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

// The request URL can carry credentials; it never reaches the message.
impl From<reqwest::Error> for InferenceError {
    fn from(e: reqwest::Error) -> Self {
        InferenceError::Http(e.without_url())
    }
}

/// Step of one annotation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AnnotationStage {
    Resolving,
    Loading,
    Prompting,
    Inferring,
    Parsing,
    WritingBack,
    Done,
}

impl fmt::Display for AnnotationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AnnotationStage::Resolving => "resolving",
            AnnotationStage::Loading => "loading",
            AnnotationStage::Prompting => "prompting",
            AnnotationStage::Inferring => "inferring",
            AnnotationStage::Parsing => "parsing",
            AnnotationStage::WritingBack => "writing_back",
            AnnotationStage::Done => "done",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum AnnotateError {
    #[error(transparent)]
    InvalidRequest(#[from] InvalidRequest),

    /// The topic has partitions in both families and none was named.
    #[error("topic \"{0}\" exists for both platforms; specify platformFamily")]
    AmbiguousPlatform(String),

    #[error("partition not found: {0}")]
    NotFound(String),

    #[error("no data in partition {0}")]
    NoData(String),

    /// The size ceiling left no room for even part of one record.
    #[error("prompt ceiling of {max_bytes} bytes leaves no room for records of partition {partition}")]
    PromptBudgetExhausted { partition: String, max_bytes: usize },

    #[error("inference unavailable: {0}")]
    InferenceUnavailable(#[source] InferenceError),

    /// The model replied, but not with a usable report. `raw` is the reply
    /// exactly as received.
    #[error("malformed inference response: {reason}")]
    MalformedResponse { raw: String, reason: String },

    #[error("store error while {stage}: {source}")]
    Store {
        stage: AnnotationStage,
        #[source]
        source: DbError,
    },
}

impl AnnotateError {
    /// The stage this failure occurred in.
    #[must_use]
    pub fn stage(&self) -> AnnotationStage {
        match self {
            AnnotateError::InvalidRequest(_)
            | AnnotateError::AmbiguousPlatform(_)
            | AnnotateError::NotFound(_) => AnnotationStage::Resolving,
            AnnotateError::NoData(_) => AnnotationStage::Loading,
            AnnotateError::PromptBudgetExhausted { .. } => AnnotationStage::Prompting,
            AnnotateError::InferenceUnavailable(_) => AnnotationStage::Inferring,
            AnnotateError::MalformedResponse { .. } => AnnotationStage::Parsing,
            AnnotateError::Store { stage, .. } => *stage,
        }
    }

    pub(crate) fn from_store(stage: AnnotationStage, source: DbError) -> Self {
        match source {
            DbError::PartitionNotFound(name) => AnnotateError::NotFound(name),
            source => AnnotateError::Store { stage, source },
        }
    }
}
