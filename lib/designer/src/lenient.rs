//! Forgiving field shapes for model answers.
//!
//! Models drift between `"reasons": "x"` and `"reasons": ["x"]`, or send
//! numbers as strings. These helpers accept the common variants.

use serde::Deserialize;
use serde_json::Value as JsonValue;

/// A field that may be a single string or a list of strings. Any other
/// JSON value is accepted too, so one odd field never sinks its siblings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub(crate) enum StringOrList {
    #[default]
    None,
    One(String),
    Many(Vec<JsonValue>),
    Other(JsonValue),
}

impl StringOrList {
    /// Non-blank trimmed strings, in order. Numbers and booleans are
    /// rendered as text; a lone object is ignored.
    pub(crate) fn into_vec(self) -> Vec<String> {
        let items = match self {
            Self::None => Vec::new(),
            Self::One(value) => vec![value],
            Self::Many(values) => values
                .into_iter()
                .filter_map(|v| match v {
                    JsonValue::String(s) => Some(s),
                    JsonValue::Null => None,
                    other => Some(other.to_string()),
                })
                .collect(),
            Self::Other(value @ (JsonValue::Number(_) | JsonValue::Bool(_))) => {
                vec![value.to_string()]
            }
            Self::Other(_) => Vec::new(),
        };
        items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Reads a number that may have been sent as a string.
pub(crate) fn number(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|n: &f64| n.is_finite())
}

/// Reads a non-blank string id.
pub(crate) fn non_blank(value: Option<&JsonValue>) -> Option<String> {
    let s = value?.as_str()?.trim();
    (!s.is_empty()).then(|| s.to_string())
}
