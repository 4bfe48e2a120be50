//! Turning raw LLM text into JSON.
//!
//! Models regularly wrap their JSON in markdown code fences, sometimes with a
//! language tag. [`strip_fences`] removes that wrapper and [`normalize`]
//! parses the remainder, degrading to an inline error record instead of
//! failing so sibling work can carry on.

use serde_json::{Value, json};

use crate::error::{EduflexError, Result};

const FENCE: &str = "```";

/// Message carried by the error record of a degraded result.
pub const INVALID_JSON_ERROR: &str = "LLM JSON non valide";

/// Outcome of normalizing one LLM response.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Parsed(Value),
    /// Not valid JSON; `raw` is the fence-stripped text.
    Degraded { raw: String },
}

impl Normalized {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Normalized::Degraded { .. })
    }

    /// Collapse into a JSON value, turning a degraded result into
    /// `{"error": ..., "raw": ...}`.
    pub fn into_value(self) -> Value {
        match self {
            Normalized::Parsed(value) => value,
            Normalized::Degraded { raw } => json!({
                "error": INVALID_JSON_ERROR,
                "raw": raw,
            }),
        }
    }
}

/// Remove a surrounding triple-backtick fence, if both ends carry one.
///
/// Text without a complete fence is returned untouched.
pub fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.len() < 2 * FENCE.len() || !trimmed.starts_with(FENCE) || !trimmed.ends_with(FENCE)
    {
        return raw;
    }

    let inner = &trimmed[FENCE.len()..trimmed.len() - FENCE.len()];
    let inner = match inner.split_once('\n') {
        Some((tag, rest)) if is_language_tag(tag) && !rest.trim().is_empty() => rest,
        _ => inner,
    };
    inner.trim()
}

/// A bare word such as `json` or `html`. A line that is itself JSON
/// (`true`, `42`) is content, not a tag.
fn is_language_tag(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty()
        && serde_json::from_str::<Value>(line).is_err()
        && line
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Fence-strip and parse. Never fails.
pub fn normalize(raw: &str) -> Normalized {
    let unfenced = strip_fences(raw);
    match serde_json::from_str::<Value>(unfenced) {
        Ok(value) => Normalized::Parsed(value),
        Err(_) => Normalized::Degraded {
            raw: unfenced.to_string(),
        },
    }
}

/// Fence-strip and parse, treating malformed output as an error.
///
/// Used where there is no sibling work to continue with.
pub fn parse_strict(raw: &str) -> Result<Value> {
    match normalize(raw) {
        Normalized::Parsed(value) => Ok(value),
        Normalized::Degraded { raw } => Err(EduflexError::UnparsableResponse { raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_plain_fence() {
        assert_eq!(strip_fences("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }

    #[test]
    fn strips_fence_with_language_tag() {
        assert_eq!(strip_fences("  ```json\n[1, 2]\n```  "), "[1, 2]");
    }

    #[test]
    fn leaves_unfenced_text_alone() {
        for text in ["not json", "  {\"a\": 1}\n", "```only opening", "``````", "```"] {
            let once = strip_fences(text);
            assert_eq!(strip_fences(once), once);
        }
        assert_eq!(strip_fences("not json"), "not json");
        assert_eq!(strip_fences("```only opening"), "```only opening");
    }

    #[test]
    fn lone_first_line_is_content_not_a_tag() {
        assert_eq!(normalize("```true\n```"), Normalized::Parsed(json!(true)));
        assert_eq!(normalize("```\n42\n```"), Normalized::Parsed(json!(42)));
        assert_eq!(
            normalize("```Sorry\n```"),
            Normalized::Degraded {
                raw: "Sorry".to_string()
            }
        );
    }

    #[test]
    fn json_first_line_is_kept_before_more_content() {
        assert_eq!(strip_fences("```null\n[1]\n```"), "null\n[1]");
    }

    #[test]
    fn parses_fenced_object() {
        let out = normalize("```json\n{\"modules\": []}\n```");
        assert_eq!(out, Normalized::Parsed(json!({"modules": []})));
    }

    #[test]
    fn parses_array_as_is() {
        let out = normalize("[{\"question\": \"Q\"}]").into_value();
        assert_eq!(out, json!([{"question": "Q"}]));
    }

    #[test]
    fn degrades_malformed_output() {
        let out = normalize("not json");
        assert!(out.is_degraded());
        assert_eq!(
            out.into_value(),
            json!({"error": "LLM JSON non valide", "raw": "not json"})
        );
    }

    #[test]
    fn degraded_record_holds_unfenced_text() {
        let out = normalize("```\noops {\n```").into_value();
        assert_eq!(out["raw"], "oops {");
    }

    #[test]
    fn strict_parse_reports_raw_text() {
        match parse_strict("```nope```") {
            Err(EduflexError::UnparsableResponse { raw }) => assert_eq!(raw, "nope"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
