//! Shared domain model and configuration for topicpulse.
//!
//! Everything here is pure: the unified [`SocialPost`] record, the
//! [`Analysis`] value that gets fanned out onto a partition, partition naming,
//! and environment-driven [`AppConfig`] loading.

pub mod analysis;
pub mod app_config;
pub mod config;
pub mod partition;
pub mod post;

use thiserror::Error;

pub use analysis::{
    Analysis, AnalysisReport, ReportViolation, SentimentDistribution, ThemeDetail, TopEngager,
    WordCountStats, MAX_TOP_ENGAGERS, MAX_TOP_WORDS,
};
pub use app_config::{AppConfig, Environment, StorageBackend, MIN_PROMPT_MAX_BYTES};
pub use config::{load_app_config, load_app_config_from_env};
pub use partition::{partition_name, PartitionHandle, PlatformFamily};
pub use post::{PostMetrics, SocialPost};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// Caller input that can never succeed as given.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRequest {
    #[error("missing topic")]
    MissingTopic,

    #[error("topic \"{0}\" has no alphanumeric characters")]
    UnusableTopic(String),

    #[error("unknown platform family \"{0}\"")]
    UnknownPlatform(String),
}
