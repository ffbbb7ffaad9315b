use thiserror::Error;

/// Failure of one platform fetch. Every variant aborts the whole call; no
/// partial result set is ever returned alongside it.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The platform has no credentials in the running configuration.
    #[error("{platform} source is not configured")]
    NotConfigured { platform: &'static str },

    /// Network or TLS failure from the underlying HTTP client.
    /// The request URL is stripped before wrapping since it can carry the
    /// API key.
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    /// The upstream API answered with a non-2xx status.
    #[error("{platform} API returned status {status}: {body}")]
    Status {
        platform: &'static str,
        status: u16,
        body: String,
    },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        SourceError::Http(e.without_url())
    }
}
