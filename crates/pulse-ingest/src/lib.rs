//! Platform adapters, post normalization and the ingestion pipeline.
//!
//! Each [`PlatformAdapter`] fetches raw items for a topic from one source
//! family; [`normalize`] maps them onto [`pulse_core::SocialPost`] and
//! [`ingest`] upserts them into the topic's partition.

pub mod adapter;
pub mod error;
mod http;
pub mod normalize;
pub mod pipeline;
pub mod twitter;
pub mod types;
pub mod youtube;

pub use adapter::{FetchOptions, PlatformAdapter, DEFAULT_LIMIT};
pub use error::SourceError;
pub use normalize::normalize;
pub use pipeline::{ingest, ingest_all, IngestError, IngestRequest, PlatformIngest, SourceSet};
pub use twitter::TwitterClient;
pub use types::{RawItem, RawTweet, RawVideo, TweetPublicMetrics, VideoStatistics};
pub use youtube::YoutubeClient;
