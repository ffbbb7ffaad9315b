use crate::app_config::{AppConfig, Environment, StorageBackend, MIN_PROMPT_MAX_BYTES};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Parsing and validation live here so tests can drive them from a plain
/// `HashMap` instead of mutating the process environment.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        optional(var).unwrap_or_else(|| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let env = parse_environment(&or_default("PULSE_ENV", "development"))?;
    let storage = parse_storage(&or_default("PULSE_STORAGE", "postgres"))?;

    let database_url = optional("DATABASE_URL");
    if storage == StorageBackend::Postgres && database_url.is_none() {
        return Err(ConfigError::MissingEnvVar("DATABASE_URL".to_string()));
    }

    let bind_addr = or_default("PULSE_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("PULSE_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("PULSE_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("PULSE_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("PULSE_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("PULSE_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let source_timeout_secs = parse_u64("PULSE_SOURCE_TIMEOUT_SECS", "30")?;
    let inference_timeout_secs = parse_u64("PULSE_INFERENCE_TIMEOUT_SECS", "120")?;
    if inference_timeout_secs == 0 {
        return Err(invalid(
            "PULSE_INFERENCE_TIMEOUT_SECS",
            "must be greater than zero".to_string(),
        ));
    }
    let prompt_max_bytes = parse_usize("PULSE_PROMPT_MAX_BYTES", "400000")?;
    if prompt_max_bytes < MIN_PROMPT_MAX_BYTES {
        return Err(invalid(
            "PULSE_PROMPT_MAX_BYTES",
            format!("must be at least {MIN_PROMPT_MAX_BYTES}"),
        ));
    }
    let write_concurrency = parse_usize("PULSE_WRITE_CONCURRENCY", "16")?;
    if write_concurrency == 0 {
        return Err(invalid(
            "PULSE_WRITE_CONCURRENCY",
            "must be greater than zero".to_string(),
        ));
    }

    Ok(AppConfig {
        env,
        storage,
        database_url,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        twitter_bearer_token: optional("X_API_BEARER_TOKEN"),
        twitter_base_url: optional("PULSE_TWITTER_BASE_URL"),
        youtube_api_key: optional("YOUTUBE_API_KEY"),
        youtube_base_url: optional("PULSE_YOUTUBE_BASE_URL"),
        gemini_api_key: optional("GEMINI_API_KEY"),
        gemini_base_url: optional("PULSE_GEMINI_BASE_URL"),
        gemini_model: or_default("PULSE_GEMINI_MODEL", "gemini-2.0-flash"),
        source_timeout_secs,
        inference_timeout_secs,
        prompt_max_bytes,
        write_concurrency,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "PULSE_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

fn parse_storage(s: &str) -> Result<StorageBackend, ConfigError> {
    match s {
        "postgres" => Ok(StorageBackend::Postgres),
        "memory" => Ok(StorageBackend::Memory),
        other => Err(ConfigError::InvalidEnvVar {
            var: "PULSE_STORAGE".to_string(),
            reason: format!("expected \"postgres\" or \"memory\", got \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
