use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Smallest accepted `PULSE_PROMPT_MAX_BYTES`: the instruction header plus
/// room for at least a few records.
pub const MIN_PROMPT_MAX_BYTES: usize = 4096;

/// Where topic partitions are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    /// In-process only; contents vanish with the process.
    Memory,
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub storage: StorageBackend,
    /// Always `Some` when `storage` is [`StorageBackend::Postgres`].
    pub database_url: Option<String>,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub twitter_bearer_token: Option<String>,
    pub twitter_base_url: Option<String>,
    pub youtube_api_key: Option<String>,
    pub youtube_base_url: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: Option<String>,
    pub gemini_model: String,
    pub source_timeout_secs: u64,
    pub inference_timeout_secs: u64,
    pub prompt_max_bytes: usize,
    pub write_concurrency: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[redacted]");
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("storage", &self.storage)
            .field("database_url", &redact(&self.database_url))
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("twitter_bearer_token", &redact(&self.twitter_bearer_token))
            .field("twitter_base_url", &self.twitter_base_url)
            .field("youtube_api_key", &redact(&self.youtube_api_key))
            .field("youtube_base_url", &self.youtube_base_url)
            .field("gemini_api_key", &redact(&self.gemini_api_key))
            .field("gemini_base_url", &self.gemini_base_url)
            .field("gemini_model", &self.gemini_model)
            .field("source_timeout_secs", &self.source_timeout_secs)
            .field("inference_timeout_secs", &self.inference_timeout_secs)
            .field("prompt_max_bytes", &self.prompt_max_bytes)
            .field("write_concurrency", &self.write_concurrency)
            .finish()
    }
}
