//! Prompt construction with a byte ceiling.
//!
//! Records are serialized one compact JSON object per line, newest first.
//! When the corpus does not fit, the oldest records are dropped; if even the
//! newest record alone is too large, its line is cut at a character boundary.

use std::cmp::Reverse;

use chrono::{DateTime, Utc};
use pulse_core::{PlatformFamily, PostMetrics, SocialPost, MAX_TOP_ENGAGERS, MAX_TOP_WORDS};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    pub stats: PromptStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptStats {
    /// Records represented in the prompt, including a cut one.
    pub included: usize,
    pub dropped: usize,
    /// Whether the single included record had to be cut to fit.
    pub record_cut: bool,
    pub bytes: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PromptRecord<'a> {
    id: &'a str,
    text: &'a str,
    created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<&'a str>,
    #[serde(flatten)]
    metrics: &'a PostMetrics,
}

fn header(topic: &str, family: PlatformFamily) -> String {
    let kind = match family {
        PlatformFamily::Twitter => "tweets",
        PlatformFamily::Youtube => "videos",
    };
    format!(
        "Analyze the following social media data ({kind}) for \"{topic}\" and return one compact JSON object with exactly these keys:\n\
         \n\
         - sentimentDistribution: object with positive, neutral and negative summaries\n\
         - topEngagers: at most {MAX_TOP_ENGAGERS} objects of the form {{\"id\": ..., \"reason\": ...}}\n\
         - contentThemes: object mapping each main theme to a list of example strings\n\
         - keywordFrequency: object mapping the top 10 keywords to integer counts\n\
         - wordCountStats: object with averageWords, maxWords and minWords\n\
         - topPositiveWords: at most {MAX_TOP_WORDS} strings\n\
         - topNegativeWords: at most {MAX_TOP_WORDS} strings\n\
         \n\
         No extra text. Only valid JSON.\n\
         \n\
         Data:\n"
    )
}

fn record_line(post: &SocialPost) -> String {
    let record = PromptRecord {
        id: &post.source_id,
        text: &post.text,
        created_at: post.created_at,
        author: post.author.as_deref(),
        metrics: &post.metrics,
    };
    // Serializing borrowed strings, a timestamp and integers cannot fail.
    serde_json::to_string(&record).unwrap_or_default()
}

fn cut_at_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Build the annotation prompt for `posts`, keeping it within `max_bytes`.
///
/// Deterministic for a given set of posts regardless of their input order:
/// records are ordered by `created_at` descending, ties by `source_id`.
#[must_use]
pub fn build_prompt(
    topic: &str,
    family: PlatformFamily,
    posts: &[SocialPost],
    max_bytes: usize,
) -> Prompt {
    let mut text = header(topic.trim(), family);
    let budget = max_bytes.saturating_sub(text.len());

    let mut ordered: Vec<&SocialPost> = posts.iter().collect();
    ordered.sort_by(|a, b| {
        Reverse(a.created_at)
            .cmp(&Reverse(b.created_at))
            .then_with(|| a.source_id.cmp(&b.source_id))
    });

    let mut used = 0;
    let mut included = 0;
    for post in &ordered {
        let line = record_line(post);
        let cost = line.len() + 1;
        if used + cost > budget {
            break;
        }
        text.push_str(&line);
        text.push('\n');
        used += cost;
        included += 1;
    }

    let mut record_cut = false;
    if included == 0 && budget > 0 {
        if let Some(newest) = ordered.first() {
            let line = record_line(newest);
            text.push_str(cut_at_char_boundary(&line, budget));
            included = 1;
            record_cut = true;
        }
    }

    let stats = PromptStats {
        included,
        dropped: posts.len() - included,
        record_cut,
        bytes: text.len(),
    };
    Prompt { text, stats }
}
