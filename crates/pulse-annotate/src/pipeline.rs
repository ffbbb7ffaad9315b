//! Annotation run for one partition:
//! Loading → Prompting → Inferring → Parsing → WritingBack → Done.

use pulse_core::{partition_name, Analysis, AppConfig, PartitionHandle, PlatformFamily};
use pulse_db::{fan_out_analysis, TopicStore, WriteBackSummary};
use serde::Serialize;

use crate::error::{AnnotateError, AnnotationStage};
use crate::inference::InferenceClient;
use crate::parse::parse_report;
use crate::prompt::{build_prompt, PromptStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotateSettings {
    pub prompt_max_bytes: usize,
    pub write_concurrency: usize,
}

impl AnnotateSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            prompt_max_bytes: config.prompt_max_bytes,
            write_concurrency: config.write_concurrency,
        }
    }
}

/// Result of a completed run. Returned even when some per-post writes
/// failed; `write_back` says how many landed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationOutcome {
    pub partition: PartitionHandle,
    pub analysis: Analysis,
    pub write_back: WriteBackSummary,
    pub prompt: PromptStats,
}

fn enter(stage: AnnotationStage, partition: &PartitionHandle) {
    tracing::debug!(partition = %partition.name, %stage, "annotation stage");
}

fn failed(err: AnnotateError, partition: &PartitionHandle) -> AnnotateError {
    tracing::warn!(
        partition = %partition.name,
        stage = %err.stage(),
        error = %err,
        "annotation failed"
    );
    err
}

/// Find the partition an annotate request refers to.
///
/// With `family` given, only that family's partition is considered. Without
/// it, the topic's single existing partition is used.
///
/// # Errors
///
/// - [`AnnotateError::InvalidRequest`] for a blank or unusable topic.
/// - [`AnnotateError::NotFound`] when no matching partition exists.
/// - [`AnnotateError::AmbiguousPlatform`] when both families have one and
///   `family` is `None`.
pub async fn resolve_partition(
    store: &dyn TopicStore,
    topic: &str,
    family: Option<PlatformFamily>,
) -> Result<PartitionHandle, AnnotateError> {
    let families: &[PlatformFamily] = match &family {
        Some(f) => std::slice::from_ref(f),
        None => &PlatformFamily::ALL,
    };

    let mut found = Vec::new();
    let mut names = Vec::new();
    for &f in families {
        let name = partition_name(topic, f)?;
        if let Some(handle) = store
            .find_partition(&name)
            .await
            .map_err(|e| AnnotateError::from_store(AnnotationStage::Resolving, e))?
        {
            found.push(handle);
        }
        names.push(name);
    }

    match found.len() {
        0 => Err(AnnotateError::NotFound(names.join(", "))),
        1 => Ok(found.remove(0)),
        _ => Err(AnnotateError::AmbiguousPlatform(topic.trim().to_string())),
    }
}

/// Annotate every post in `partition` with one model-generated report.
///
/// One inference call is made, never retried. The parsed report is then
/// written onto each post loaded at the start of the run, concurrently and
/// without a transaction.
///
/// # Errors
///
/// - [`AnnotateError::NotFound`] if the partition was never created.
/// - [`AnnotateError::NoData`] if it holds no posts.
/// - [`AnnotateError::InferenceUnavailable`] if the model call fails.
/// - [`AnnotateError::MalformedResponse`] carrying the raw reply if it is not
///   a valid report.
/// - [`AnnotateError::Store`] for other storage failures while loading.
pub async fn annotate_partition(
    store: &dyn TopicStore,
    inference: &dyn InferenceClient,
    partition: &PartitionHandle,
    settings: AnnotateSettings,
) -> Result<AnnotationOutcome, AnnotateError> {
    enter(AnnotationStage::Loading, partition);
    let posts = store
        .list_all(partition)
        .await
        .map_err(|e| failed(AnnotateError::from_store(AnnotationStage::Loading, e), partition))?;
    if posts.is_empty() {
        return Err(failed(
            AnnotateError::NoData(partition.name.clone()),
            partition,
        ));
    }

    enter(AnnotationStage::Prompting, partition);
    let prompt = build_prompt(
        &partition.topic,
        partition.platform_family,
        &posts,
        settings.prompt_max_bytes,
    );
    if prompt.stats.included == 0 {
        return Err(failed(
            AnnotateError::PromptBudgetExhausted {
                partition: partition.name.clone(),
                max_bytes: settings.prompt_max_bytes,
            },
            partition,
        ));
    }
    if prompt.stats.dropped > 0 || prompt.stats.record_cut {
        tracing::warn!(
            partition = %partition.name,
            included = prompt.stats.included,
            dropped = prompt.stats.dropped,
            record_cut = prompt.stats.record_cut,
            max_bytes = settings.prompt_max_bytes,
            "prompt truncated to fit size ceiling"
        );
    }

    enter(AnnotationStage::Inferring, partition);
    let reply = inference
        .infer(&prompt.text)
        .await
        .map_err(|e| failed(AnnotateError::InferenceUnavailable(e), partition))?;

    enter(AnnotationStage::Parsing, partition);
    let analysis = parse_report(&reply).map_err(|reason| {
        failed(
            AnnotateError::MalformedResponse { raw: reply.clone(), reason },
            partition,
        )
    })?;

    enter(AnnotationStage::WritingBack, partition);
    let source_ids: Vec<String> = posts.into_iter().map(|p| p.source_id).collect();
    let write_back = fan_out_analysis(
        store,
        partition,
        &source_ids,
        &analysis,
        settings.write_concurrency,
    )
    .await;

    enter(AnnotationStage::Done, partition);
    if write_back.is_complete() {
        tracing::info!(
            partition = %partition.name,
            provider = inference.provider_name(),
            written = write_back.written,
            "annotation complete"
        );
    } else {
        tracing::warn!(
            partition = %partition.name,
            attempted = write_back.attempted,
            written = write_back.written,
            "annotation complete with failed writes"
        );
    }

    Ok(AnnotationOutcome {
        partition: partition.clone(),
        analysis,
        write_back,
        prompt: prompt.stats,
    })
}
