//! JSON Extraction
//!
//! Recovers a JSON object from raw model text. Model output is not guaranteed
//! to be bare JSON: it may be wrapped in prose, in a fenced code block, or in
//! both. Every stage that parses model output goes through [`extract_json`]
//! or [`extract_as`] instead of stripping wrappers ad hoc.
//!
//! Algorithm:
//! 1. trim surrounding whitespace
//! 2. if a triple-backtick fence is present (optionally tagged `json`), take
//!    its interior
//! 3. take the span from the first `{` to the last `}` inclusive
//! 4. parse as JSON; the top-level value must be an object

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{CoreError, CoreResult};

const FENCE: &str = "```";

/// Extract a JSON object from raw model output.
pub fn extract_json(raw: &str) -> CoreResult<Value> {
    let text = raw.trim();

    // A fence holding no object at all (e.g. an example shell snippet) is
    // ignored in favour of the whole text.
    let candidate = fenced_interior(text)
        .filter(|inner| inner.contains('{'))
        .unwrap_or(text);

    let span = object_span(candidate).ok_or(CoreError::NoJsonObject)?;
    let value: Value =
        serde_json::from_str(span).map_err(|e| CoreError::InvalidJson(e.to_string()))?;

    if !value.is_object() {
        return Err(CoreError::shape("top-level JSON value is not an object"));
    }
    Ok(value)
}

/// Extract a JSON object and deserialize it into `T`.
///
/// Deserialization failures (missing fields, out-of-vocabulary enum values,
/// wrong types) are reported as [`CoreError::Shape`].
pub fn extract_as<T: DeserializeOwned>(raw: &str) -> CoreResult<T> {
    let value = extract_json(raw)?;
    serde_json::from_value(value).map_err(|e| CoreError::shape(e.to_string()))
}

/// Interior of the first fenced block, if the text contains a fence.
///
/// An unterminated fence (truncated output) yields everything after the
/// opening marker.
fn fenced_interior(text: &str) -> Option<&str> {
    let open = text.find(FENCE)?;
    let after = strip_language_tag(&text[open + FENCE.len()..]);
    let end = after.find(FENCE).unwrap_or(after.len());
    Some(after[..end].trim())
}

fn strip_language_tag(s: &str) -> &str {
    match s.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &s[4..],
        _ => s,
    }
}

fn object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}
