//! The topic-wide analysis produced by one inference call.
//!
//! [`AnalysisReport`] is the shape the inference backend is asked to emit.
//! It is stored wrapped in [`Analysis`], a versioned sum type, so readers can
//! match on the shape they were handed instead of probing loose JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const MAX_TOP_ENGAGERS: usize = 3;
pub const MAX_TOP_WORDS: usize = 5;

/// Versioned analysis value embedded on every annotated post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "schemaVersion")]
pub enum Analysis {
    #[serde(rename = "v1")]
    V1(AnalysisReport),
}

impl Analysis {
    #[must_use]
    pub fn report(&self) -> &AnalysisReport {
        match self {
            Analysis::V1(report) => report,
        }
    }
}

impl From<AnalysisReport> for Analysis {
    fn from(report: AnalysisReport) -> Self {
        Analysis::V1(report)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub sentiment_distribution: SentimentDistribution,
    pub top_engagers: Vec<TopEngager>,
    pub content_themes: BTreeMap<String, ThemeDetail>,
    pub keyword_frequency: BTreeMap<String, u64>,
    pub word_count_stats: WordCountStats,
    pub top_positive_words: Vec<String>,
    pub top_negative_words: Vec<String>,
}

/// Descriptive value per sentiment label. Backends answer with prose, counts
/// or small objects here, so each label keeps whatever JSON it was given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentDistribution {
    pub positive: Value,
    pub neutral: Value,
    pub negative: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopEngager {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThemeDetail {
    Examples(Vec<String>),
    Summary(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordCountStats {
    pub average_words: f64,
    pub max_words: u64,
    pub min_words: u64,
}

/// A parsed report that breaks one of the structural bounds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportViolation {
    #[error("topEngagers has {0} entries, at most {MAX_TOP_ENGAGERS} allowed")]
    TooManyEngagers(usize),

    #[error("{field} has {count} entries, at most {MAX_TOP_WORDS} allowed")]
    TooManyWords { field: &'static str, count: usize },
}

impl AnalysisReport {
    /// Check the sequence bounds the backend was instructed to respect.
    ///
    /// # Errors
    ///
    /// Returns the first [`ReportViolation`] found.
    pub fn validate(&self) -> Result<(), ReportViolation> {
        if self.top_engagers.len() > MAX_TOP_ENGAGERS {
            return Err(ReportViolation::TooManyEngagers(self.top_engagers.len()));
        }
        for (field, words) in [
            ("topPositiveWords", &self.top_positive_words),
            ("topNegativeWords", &self.top_negative_words),
        ] {
            if words.len() > MAX_TOP_WORDS {
                return Err(ReportViolation::TooManyWords {
                    field,
                    count: words.len(),
                });
            }
        }
        Ok(())
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}
