//! Ingestion: validate → fetch → normalize → resolve partition → upsert.

use std::sync::Arc;

use futures::future::join_all;
use futures::future::FutureExt;
use futures::stream::{self, StreamExt};
use pulse_core::{partition_name, AppConfig, InvalidRequest, PlatformFamily, SocialPost};
use pulse_db::{DbError, TopicStore};
use thiserror::Error;

use crate::adapter::{FetchOptions, PlatformAdapter, DEFAULT_LIMIT};
use crate::error::SourceError;
use crate::normalize::normalize;
use crate::twitter::TwitterClient;
use crate::youtube::YoutubeClient;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    InvalidRequest(#[from] InvalidRequest),

    #[error("{family} source unavailable: {source}")]
    SourceUnavailable {
        family: PlatformFamily,
        #[source]
        source: SourceError,
    },

    #[error("store error: {0}")]
    Store(#[from] DbError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestRequest {
    pub topic: String,
    pub limit: u32,
    pub options: FetchOptions,
}

impl IngestRequest {
    #[must_use]
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            limit: DEFAULT_LIMIT,
            options: FetchOptions::default(),
        }
    }
}

/// Outcome of one platform within a multi-platform ingest.
#[derive(Debug)]
pub struct PlatformIngest {
    pub family: PlatformFamily,
    pub result: Result<Vec<SocialPost>, IngestError>,
}

/// The adapters available to this process, one optional slot per family.
#[derive(Clone, Default)]
pub struct SourceSet {
    twitter: Option<Arc<dyn PlatformAdapter>>,
    youtube: Option<Arc<dyn PlatformAdapter>>,
}

impl std::fmt::Debug for SourceSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceSet")
            .field("twitter", &self.twitter.is_some())
            .field("youtube", &self.youtube.is_some())
            .finish()
    }
}

impl SourceSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `adapter` in the slot of its own family, replacing any
    /// adapter already there.
    #[must_use]
    pub fn with_adapter(mut self, adapter: Arc<dyn PlatformAdapter>) -> Self {
        match adapter.family() {
            PlatformFamily::Twitter => self.twitter = Some(adapter),
            PlatformFamily::Youtube => self.youtube = Some(adapter),
        }
        self
    }

    /// Build the adapters whose credentials are present in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if an HTTP client cannot be constructed or a
    /// configured base URL is invalid.
    pub fn from_config(config: &AppConfig) -> Result<Self, SourceError> {
        let mut sources = Self::new();

        if let Some(token) = config.twitter_bearer_token.as_deref() {
            let client = match config.twitter_base_url.as_deref() {
                Some(base) => TwitterClient::with_base_url(token, config.source_timeout_secs, base)?,
                None => TwitterClient::new(token, config.source_timeout_secs)?,
            };
            sources = sources.with_adapter(Arc::new(client));
        } else {
            tracing::info!("X_API_BEARER_TOKEN not set; twitter ingestion disabled");
        }

        if let Some(key) = config.youtube_api_key.as_deref() {
            let client = match config.youtube_base_url.as_deref() {
                Some(base) => YoutubeClient::with_base_url(key, config.source_timeout_secs, base)?,
                None => YoutubeClient::new(key, config.source_timeout_secs)?,
            };
            sources = sources.with_adapter(Arc::new(client));
        } else {
            tracing::info!("YOUTUBE_API_KEY not set; youtube ingestion disabled");
        }

        Ok(sources)
    }

    /// The adapter for `family`.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::SourceUnavailable`] when that family has no
    /// configured adapter.
    pub fn adapter(&self, family: PlatformFamily) -> Result<&dyn PlatformAdapter, IngestError> {
        let slot = match family {
            PlatformFamily::Twitter => &self.twitter,
            PlatformFamily::Youtube => &self.youtube,
        };
        slot.as_deref().ok_or(IngestError::SourceUnavailable {
            family,
            source: SourceError::NotConfigured {
                platform: family.as_str(),
            },
        })
    }
}

/// Ingest one topic from one platform.
///
/// Returns the normalized records that were written. Each record is upserted
/// independently and concurrently, at most `concurrency` at a time; a later
/// ingest of the same `source_id` updates it in place.
///
/// # Errors
///
/// - [`IngestError::InvalidRequest`] for a blank or unusable topic, before
///   any fetch is attempted.
/// - [`IngestError::SourceUnavailable`] when the fetch fails; nothing is
///   written in that case.
/// - [`IngestError::Store`] when the partition cannot be resolved or any
///   upsert fails. The other upserts of the batch still run.
pub async fn ingest(
    store: &dyn TopicStore,
    adapter: &dyn PlatformAdapter,
    request: &IngestRequest,
    concurrency: usize,
) -> Result<Vec<SocialPost>, IngestError> {
    let family = adapter.family();
    partition_name(&request.topic, family)?;
    let topic = request.topic.trim();

    let raw = adapter
        .fetch(topic, request.limit, &request.options)
        .await
        .map_err(|source| {
            tracing::warn!(%family, topic, error = %source, "source fetch failed");
            IngestError::SourceUnavailable { family, source }
        })?;

    let posts: Vec<SocialPost> = raw.iter().map(|item| normalize(item, topic)).collect();
    let partition = store.partition_for(topic, family).await?;

    let results: Vec<(&str, Result<(), DbError>)> = stream::iter(&posts)
        .map(|post| {
            let partition = &partition;
            async move {
                (
                    post.source_id.as_str(),
                    store.upsert(partition, post).await,
                )
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect::<Vec<_>>()
        .boxed()
        .await;

    let mut first_error = None;
    for (source_id, result) in results {
        if let Err(e) = result {
            tracing::warn!(
                partition = %partition.name,
                source_id,
                error = %e,
                "upsert failed"
            );
            first_error.get_or_insert(e);
        }
    }
    if let Some(e) = first_error {
        return Err(IngestError::Store(e));
    }

    tracing::info!(
        partition = %partition.name,
        count = posts.len(),
        "ingested posts"
    );
    Ok(posts)
}

/// Ingest one topic from several platforms concurrently.
///
/// The topic is validated once up front; after that every platform runs to
/// completion on its own and reports its own result.
///
/// # Errors
///
/// Returns [`IngestError::InvalidRequest`] for a blank or unusable topic.
pub async fn ingest_all(
    store: &dyn TopicStore,
    sources: &SourceSet,
    request: &IngestRequest,
    families: &[PlatformFamily],
    concurrency: usize,
) -> Result<Vec<PlatformIngest>, IngestError> {
    for family in families {
        partition_name(&request.topic, *family)?;
    }

    let runs = families.iter().map(|&family| async move {
        let result = match sources.adapter(family) {
            Ok(adapter) => ingest(store, adapter, request, concurrency).await,
            Err(e) => Err(e),
        };
        PlatformIngest { family, result }
    });

    Ok(join_all(runs).await)
}
