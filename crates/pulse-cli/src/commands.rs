//! Command handlers. Each one prints its result as pretty JSON on stdout;
//! logs go to stderr.

use std::sync::Arc;

use pulse_annotate::{annotate_partition, inference_from_config, list_analyses, resolve_partition};
use pulse_core::{AppConfig, PlatformFamily, StorageBackend};
use pulse_db::{MemoryTopicStore, PgTopicStore, TopicStore};
use pulse_ingest::{ingest_all, FetchOptions, IngestRequest, PlatformIngest, SourceSet};
use serde_json::{json, Value};

pub(crate) async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn TopicStore>> {
    match config.storage {
        StorageBackend::Postgres => {
            let pool = pulse_db::connect_pool_from_config(config).await?;
            Ok(Arc::new(PgTopicStore::new(pool)))
        }
        StorageBackend::Memory => {
            tracing::warn!("PULSE_STORAGE=memory; nothing outlives this process");
            Ok(Arc::new(MemoryTopicStore::new()))
        }
    }
}

pub(crate) fn ingest_request(topic: &str, limit: u32, language: Option<String>) -> IngestRequest {
    IngestRequest {
        topic: topic.to_string(),
        limit,
        options: FetchOptions { language },
    }
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Summarize per-platform ingest outcomes; `true` when at least one
/// platform succeeded.
pub(crate) fn summarize_ingest(outcomes: &[PlatformIngest]) -> (Value, bool) {
    let mut any_ok = false;
    let mut results = serde_json::Map::new();
    for outcome in outcomes {
        let entry = match &outcome.result {
            Ok(posts) => {
                any_ok = true;
                json!({ "count": posts.len() })
            }
            Err(e) => json!({ "error": e.to_string() }),
        };
        results.insert(outcome.family.as_str().to_string(), entry);
    }
    (Value::Object(results), any_ok)
}

pub(crate) async fn run_migrate(config: &AppConfig) -> anyhow::Result<()> {
    if config.storage == StorageBackend::Memory {
        anyhow::bail!("PULSE_STORAGE=memory has no schema to migrate");
    }
    let pool = pulse_db::connect_pool_from_config(config).await?;
    let applied = pulse_db::run_migrations(&pool).await?;
    tracing::info!(applied, "migrations up to date");
    print_json(&json!({ "applied": applied }))
}

pub(crate) async fn run_ingest(
    config: &AppConfig,
    store: &dyn TopicStore,
    request: &IngestRequest,
    families: &[PlatformFamily],
) -> anyhow::Result<()> {
    let sources = SourceSet::from_config(config)?;
    let outcomes = ingest_all(store, &sources, request, families, config.write_concurrency).await?;

    let (results, any_ok) = summarize_ingest(&outcomes);
    print_json(&json!({ "topic": request.topic.trim(), "results": results }))?;
    if !any_ok {
        anyhow::bail!("no platform ingested any posts for \"{}\"", request.topic.trim());
    }
    Ok(())
}

pub(crate) async fn run_annotate(
    config: &AppConfig,
    store: &dyn TopicStore,
    topic: &str,
    family: Option<PlatformFamily>,
) -> anyhow::Result<()> {
    let inference = inference_from_config(config)?;
    let partition = resolve_partition(store, topic, family).await?;
    let settings = pulse_annotate::AnnotateSettings::from_app_config(config);

    let outcome = match annotate_partition(store, inference.as_ref(), &partition, settings).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(stage = %e.stage(), error = %e, "annotation failed");
            return Err(e.into());
        }
    };
    print_json(&serde_json::to_value(&outcome)?)
}

pub(crate) async fn run_topics(store: &dyn TopicStore) -> anyhow::Result<()> {
    let partitions = store.list_partitions().await?;
    print_json(&json!({ "partitions": partitions }))
}

pub(crate) async fn run_report(store: &dyn TopicStore, partition: &str) -> anyhow::Result<()> {
    let handle = store
        .find_partition(partition)
        .await?
        .ok_or_else(|| anyhow::anyhow!("partition '{partition}' not found"))?;
    let analyses = list_analyses(store, &handle).await?;
    print_json(&json!({ "partition": handle.name, "analysis": analyses }))
}
