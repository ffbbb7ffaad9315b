//! On-demand annotation of a topic partition.
//!
//! [`annotate_partition`] loads every post of a partition, asks the
//! configured [`InferenceClient`] for one aggregate report and writes that
//! report back onto each post. [`list_analyses`] reads the results back.

pub mod error;
pub mod inference;
pub mod parse;
pub mod pipeline;
pub mod prompt;
pub mod report;

pub use error::{AnnotateError, AnnotationStage, InferenceError};
pub use inference::{
    inference_from_config, DisabledInference, DynInferenceClient, GeminiClient, InferenceClient,
};
pub use parse::{parse_report, strip_code_fence};
pub use pipeline::{annotate_partition, resolve_partition, AnnotateSettings, AnnotationOutcome};
pub use prompt::{build_prompt, Prompt, PromptStats};
pub use report::list_analyses;
