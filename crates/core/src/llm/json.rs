use crate::domain::contract::LlmRecommendation;
use crate::domain::etf::Etf;
use crate::domain::recommendation::RecommendationResult;
use anyhow::Context;

pub fn extract_json(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.starts_with("```") {
        // Remove Markdown fences (```json ... ``` or ``` ... ```).
        let mut inner = trimmed;
        if let Some(after_first) = inner.splitn(2, '\n').nth(1) {
            inner = after_first;
        }
        if let Some(end) = inner.rfind("```") {
            inner = &inner[..end];
        }
        return Some(inner.trim().to_string());
    }

    // Best-effort extraction: first '{' to last '}'.
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(trimmed[start..=end].trim().to_string())
}

/// Parses and validates a recommendation against the candidate set it was drawn from.
pub fn parse_recommendation(text: &str, candidates: &[Etf]) -> anyhow::Result<RecommendationResult> {
    let json_str = extract_json(text).unwrap_or_else(|| text.trim().to_string());
    let parsed = serde_json::from_str::<LlmRecommendation>(&json_str)
        .with_context(|| format!("judge output is not valid JSON for the recommendation schema: {json_str}"))?;
    parsed.validate_and_into_result(candidates)
}
