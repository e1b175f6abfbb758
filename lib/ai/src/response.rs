//! Recovering JSON from free-form model output.
//!
//! Models wrap JSON in markdown fences, prepend commentary, or trail off
//! with explanations. Every stage that expects structured output goes
//! through these helpers so the recovery rules live in one place:
//!
//! 1. whitespace-only output is rejected,
//! 2. markdown code fences are stripped,
//! 3. the remaining text is parsed directly,
//! 4. failing that, the outermost `[...]` (or `{...}`) span is extracted and
//!    parsed, then the first balanced span.

use crate::error::ResponseError;
use regex::Regex;
use serde_json::{Map, Value as JsonValue};
use std::sync::LazyLock;

static JSON_ARRAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[.*\]").expect("static regex"));
static JSON_OBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("static regex"));

const EXCERPT_CHARS: usize = 200;

/// Strips a markdown code fence, returning the fenced body.
///
/// Text without a fence is returned trimmed. A language tag on the opening
/// fence line (```` ```json ````) is skipped.
#[must_use]
pub fn strip_code_fences(raw: &str) -> &str {
    let text = raw.trim();
    let Some(start) = text.find("```") else {
        return text;
    };

    let after = &text[start + 3..];
    let body = match after.split_once('\n') {
        Some((tag, rest)) if tag.trim().chars().all(|c| c.is_ascii_alphanumeric()) => rest,
        _ => after,
    };

    match body.find("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

/// Finds the outermost `[...]` span in the text.
#[must_use]
pub fn extract_json_array(text: &str) -> Option<&str> {
    JSON_ARRAY_RE.find(text).map(|m| m.as_str())
}

/// Finds the first balanced span opened by `open` and closed by `close`,
/// ignoring delimiters inside JSON strings.
#[must_use]
pub fn first_balanced(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            c if c == open => depth += 1,
            c if c == close => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[start..start + offset + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Parses a JSON array out of model output.
///
/// # Errors
///
/// Returns [`ResponseError::Empty`] for blank output and
/// [`ResponseError::NoJson`] when no array can be recovered.
pub fn parse_json_array(raw: &str) -> Result<Vec<JsonValue>, ResponseError> {
    if raw.trim().is_empty() {
        return Err(ResponseError::Empty);
    }

    let text = strip_code_fences(raw);
    if let Ok(JsonValue::Array(items)) = serde_json::from_str(text) {
        return Ok(items);
    }

    for source in [text, raw.trim()] {
        let spans = [extract_json_array(source), first_balanced(source, '[', ']')];
        for span in spans.into_iter().flatten() {
            if let Ok(JsonValue::Array(items)) = serde_json::from_str(span) {
                tracing::debug!(span_chars = span.len(), "recovered JSON array from model output");
                return Ok(items);
            }
        }
    }

    Err(ResponseError::NoJson {
        expected: "array",
        excerpt: excerpt(text),
    })
}

/// Parses a JSON object out of model output.
///
/// # Errors
///
/// Returns [`ResponseError::Empty`] for blank output and
/// [`ResponseError::NoJson`] when no object can be recovered.
pub fn parse_json_object(raw: &str) -> Result<Map<String, JsonValue>, ResponseError> {
    if raw.trim().is_empty() {
        return Err(ResponseError::Empty);
    }

    let text = strip_code_fences(raw);
    if let Ok(JsonValue::Object(map)) = serde_json::from_str(text) {
        return Ok(map);
    }

    for source in [text, raw.trim()] {
        let spans = [
            JSON_OBJECT_RE.find(source).map(|m| m.as_str()),
            first_balanced(source, '{', '}'),
        ];
        for span in spans.into_iter().flatten() {
            if let Ok(JsonValue::Object(map)) = serde_json::from_str(span) {
                tracing::debug!(span_chars = span.len(), "recovered JSON object from model output");
                return Ok(map);
            }
        }
    }

    Err(ResponseError::NoJson {
        expected: "object",
        excerpt: excerpt(text),
    })
}

fn excerpt(text: &str) -> String {
    text.chars().take(EXCERPT_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_json_fence() {
        let raw = "```json\n[{\"nodeId\": \"a\"}]\n```";
        assert_eq!(strip_code_fences(raw), "[{\"nodeId\": \"a\"}]");
    }

    #[test]
    fn strips_bare_fence_with_leading_prose() {
        let raw = "Here you go:\n```\n{\"a\": 1}\n```\nAnything else?";
        assert_eq!(strip_code_fences(raw), "{\"a\": 1}");
    }

    #[test]
    fn inline_fence_keeps_body() {
        assert_eq!(strip_code_fences("```[1, 2]```"), "[1, 2]");
    }

    #[test]
    fn text_without_fence_is_trimmed() {
        assert_eq!(strip_code_fences("  [1]\n"), "[1]");
    }

    #[test]
    fn fenced_and_plain_arrays_parse_the_same() {
        let plain = r#"[{"nodeId": "pg", "score": 90}]"#;
        let fenced = format!("```json\n{plain}\n```");
        assert_eq!(
            parse_json_array(plain).expect("plain"),
            parse_json_array(&fenced).expect("fenced")
        );
    }

    #[test]
    fn array_recovered_from_prose() {
        let raw = "Sure! The nodes are [\"a\", \"b\"] which should work.";
        assert_eq!(parse_json_array(raw).expect("parse"), vec![json!("a"), json!("b")]);
    }

    #[test]
    fn balanced_span_used_when_greedy_span_is_invalid() {
        let raw = "first [\"a\"] and later a stray ] bracket";
        assert_eq!(parse_json_array(raw).expect("parse"), vec![json!("a")]);
    }

    #[test]
    fn balanced_scan_ignores_brackets_in_strings() {
        let text = r#"x ["a]", "b"] y"#;
        assert_eq!(first_balanced(text, '[', ']'), Some(r#"["a]", "b"]"#));
    }

    #[test]
    fn blank_output_is_empty_error() {
        assert_eq!(parse_json_array("   \n\t"), Err(ResponseError::Empty));
        assert_eq!(parse_json_object(""), Err(ResponseError::Empty));
    }

    #[test]
    fn unparseable_output_is_no_json() {
        let err = parse_json_array("I could not find suitable nodes.").unwrap_err();
        assert!(matches!(err, ResponseError::NoJson { expected: "array", .. }));
    }

    #[test]
    fn object_is_not_accepted_as_array() {
        let err = parse_json_array(r#"{"nodes": 3}"#).unwrap_err();
        assert!(matches!(err, ResponseError::NoJson { .. }));
    }

    #[test]
    fn object_recovered_from_fenced_output() {
        let raw = "```json\n{\"action\": \"sync\", \"services\": [\"slack\"]}\n```";
        let map = parse_json_object(raw).expect("parse");
        assert_eq!(map.get("action"), Some(&json!("sync")));
    }
}
