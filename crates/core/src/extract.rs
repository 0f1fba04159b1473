//! Structured extraction from free-text judge output.
//!
//! Every prompt that asks the judge for prose instead of JSON is answered in a small line-oriented
//! grammar, and this module is the only place that knows it:
//!
//! - integer: the first match of `-?[0-9]+` anywhere in the text (ASCII digits only)
//! - labeled field: `LABEL:` followed by the text up to the next newline (or end of text), trimmed
//! - marker: a verbatim substring such as `ALERT: YES`
//! - weight line: `<name> ... -> N%` on a single line, where N may be wrapped in `[` `]`
//!
//! When a prompt's response format changes, only this module and its tests should need updating.

use regex::Regex;
use std::sync::LazyLock;

static INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?[0-9]+").expect("integer pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("no integer found in judge output: {snippet:?}")]
    NoIntegerFound { snippet: String },

    #[error("integer out of range in judge output: {digits}")]
    IntegerOverflow { digits: String },
}

/// Parses the first signed integer substring out of `text`.
pub fn first_integer(text: &str) -> Result<i32, ExtractError> {
    if text.trim().is_empty() {
        return Err(ExtractError::NoIntegerFound {
            snippet: String::new(),
        });
    }

    let Some(m) = INTEGER.find(text) else {
        return Err(ExtractError::NoIntegerFound {
            snippet: snippet(text),
        });
    };

    // The pattern only matches ASCII digits, so a parse failure means the value does not fit.
    m.as_str()
        .parse::<i32>()
        .map_err(|_| ExtractError::IntegerOverflow {
            digits: m.as_str().to_string(),
        })
}

/// Text after the first occurrence of `label`, up to the next newline.
pub fn labeled_field<'a>(text: &'a str, label: &str) -> Option<&'a str> {
    let start = text.find(label)? + label.len();
    let rest = &text[start..];
    let end = rest.find('\n').unwrap_or(rest.len());
    Some(rest[..end].trim())
}

/// Like [`labeled_field`], but an absent label yields an empty string.
pub fn labeled_field_or_empty(text: &str, label: &str) -> String {
    labeled_field(text, label).unwrap_or_default().to_string()
}

pub fn has_marker(text: &str, marker: &str) -> bool {
    text.contains(marker)
}

/// First `<name> ... -> N%` match for `name`.
pub fn recommended_weight(text: &str, name: &str) -> Option<u32> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let pattern = format!(r"{}.*?->\s*\[?([0-9]+)\]?\s*%", regex::escape(name));
    let re = Regex::new(&pattern).ok()?;
    let caps = re.captures(text)?;
    caps.get(1)?.as_str().parse::<u32>().ok()
}

fn snippet(text: &str) -> String {
    text.chars().take(120).collect()
}
