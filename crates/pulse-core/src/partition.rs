//! Topic partition naming.
//!
//! A partition holds every [`crate::SocialPost`] ingested for one topic within
//! one platform family. Its name is derived from the raw topic string, so two
//! topics that differ only in case or punctuation share a partition.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::InvalidRequest;

static NON_ALNUM_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("static regex is valid"));

/// Source category with its own adapter and native field shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformFamily {
    Twitter,
    Youtube,
}

impl PlatformFamily {
    pub const ALL: [PlatformFamily; 2] = [PlatformFamily::Twitter, PlatformFamily::Youtube];

    /// Prefix placed in front of every partition name of this family.
    #[must_use]
    pub fn partition_prefix(self) -> &'static str {
        match self {
            PlatformFamily::Twitter => "tweets",
            PlatformFamily::Youtube => "videos",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PlatformFamily::Twitter => "twitter",
            PlatformFamily::Youtube => "youtube",
        }
    }
}

impl fmt::Display for PlatformFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformFamily {
    type Err = InvalidRequest;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "twitter" | "x" | "tweets" => Ok(PlatformFamily::Twitter),
            "youtube" | "videos" => Ok(PlatformFamily::Youtube),
            other => Err(InvalidRequest::UnknownPlatform(other.to_string())),
        }
    }
}

/// Derive the partition name for `topic` within `family`.
///
/// Lower-cases the topic, collapses every run of non-alphanumeric characters
/// into a single `_`, trims separators from both ends and prefixes the
/// family tag: `"My Topic!!"` becomes `tweets_my_topic`.
///
/// # Errors
///
/// Returns [`InvalidRequest::MissingTopic`] for a blank topic and
/// [`InvalidRequest::UnusableTopic`] when nothing alphanumeric remains.
pub fn partition_name(topic: &str, family: PlatformFamily) -> Result<String, InvalidRequest> {
    let trimmed = topic.trim();
    if trimmed.is_empty() {
        return Err(InvalidRequest::MissingTopic);
    }

    let lowered = trimmed.to_lowercase();
    let collapsed = NON_ALNUM_RUN.replace_all(&lowered, "_");
    let slug = collapsed.trim_matches('_');
    if slug.is_empty() {
        return Err(InvalidRequest::UnusableTopic(trimmed.to_string()));
    }

    Ok(format!("{}_{slug}", family.partition_prefix()))
}

/// Stable reference to a created partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionHandle {
    pub name: String,
    /// Raw topic string the partition was first created for.
    pub topic: String,
    pub platform_family: PlatformFamily,
    pub created_at: DateTime<Utc>,
}
