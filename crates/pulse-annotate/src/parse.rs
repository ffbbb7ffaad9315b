use pulse_core::{Analysis, AnalysisReport};

/// Strip one surrounding Markdown code fence (```` ``` ```` or ```` ```json ````,
/// any case) from a model reply.
#[must_use]
pub fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = match rest.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
        _ => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse a model reply into a versioned [`Analysis`].
///
/// # Errors
///
/// Returns a human-readable reason when the reply is not exactly one JSON
/// object with every report section, or when a section exceeds its bound.
pub fn parse_report(reply: &str) -> Result<Analysis, String> {
    let body = strip_code_fence(reply);
    let report: AnalysisReport = serde_json::from_str(body).map_err(|e| e.to_string())?;
    report.validate().map_err(|e| e.to_string())?;
    Ok(Analysis::V1(report))
}
