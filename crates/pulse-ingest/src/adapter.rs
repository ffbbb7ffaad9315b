use async_trait::async_trait;
use pulse_core::PlatformFamily;

use crate::error::SourceError;
use crate::types::RawItem;

/// Upper bound on items per ingest when the caller gives none.
pub const DEFAULT_LIMIT: u32 = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Two-letter language code; each adapter applies its own default.
    pub language: Option<String>,
}

/// One external source of raw items for a topic.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    fn family(&self) -> PlatformFamily;

    /// Fetch up to roughly `limit` items matching `topic`.
    ///
    /// # Errors
    ///
    /// Any transport failure, non-2xx status or undecodable body fails the
    /// whole call.
    async fn fetch(
        &self,
        topic: &str,
        limit: u32,
        options: &FetchOptions,
    ) -> Result<Vec<RawItem>, SourceError>;
}
