//! Port system for templates.
//!
//! Ports are named connection points on templates. Output ports may only
//! feed input ports. Each port also has a kind derived from its id
//! (`trigger-in`, `data-out`, `error-out`, ...) and an optional data type.

use serde::{Deserialize, Serialize};

/// Which way data flows through a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    /// Receives data.
    #[default]
    Input,
    /// Emits data.
    Output,
}

/// Role of a port, derived from its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortKind {
    /// Starts or sequences execution.
    Trigger,
    /// Carries payload data.
    Data,
    /// Emits failures.
    Error,
}

impl PortKind {
    /// Classifies a port id.
    #[must_use]
    pub fn of(port_id: &str) -> Self {
        let id = port_id.to_ascii_lowercase();
        if id.contains("trigger") {
            Self::Trigger
        } else if id.contains("error") {
            Self::Error
        } else {
            Self::Data
        }
    }

    /// Returns the lowercase label used in prompts.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trigger => "trigger",
            Self::Data => "data",
            Self::Error => "error",
        }
    }
}

/// A named port on a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplatePort {
    /// Port id, unique within its template (e.g. `data-in`).
    pub id: String,
    /// Human-readable label.
    #[serde(default)]
    pub label: String,
    /// Direction of the port.
    #[serde(rename = "type", default)]
    pub direction: PortDirection,
    /// Declared data type, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    /// Whether the port must be connected.
    #[serde(default)]
    pub required: bool,
    /// Whether the port accepts several connections.
    #[serde(default)]
    pub multiple: bool,
}

impl TemplatePort {
    /// Creates an input port.
    #[must_use]
    pub fn input(id: impl Into<String>) -> Self {
        Self::new(id, PortDirection::Input)
    }

    /// Creates an output port.
    #[must_use]
    pub fn output(id: impl Into<String>) -> Self {
        Self::new(id, PortDirection::Output)
    }

    fn new(id: impl Into<String>, direction: PortDirection) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            direction,
            data_type: None,
            required: false,
            multiple: false,
        }
    }

    /// Sets the data type.
    #[must_use]
    pub fn with_data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = Some(data_type.into());
        self
    }

    /// Returns the port's kind.
    #[must_use]
    pub fn kind(&self) -> PortKind {
        PortKind::of(&self.id)
    }

    /// Checks whether this port may feed `target`.
    ///
    /// Direction must be output to input. Trigger ports feed trigger ports,
    /// data ports feed data ports, and error ports may feed any input (an
    /// error handler or logger usually takes errors on its data input).
    /// Missing or `any` data types are compatible with everything.
    #[must_use]
    pub fn can_feed(&self, target: &TemplatePort) -> bool {
        if self.direction != PortDirection::Output || target.direction != PortDirection::Input {
            return false;
        }

        let kinds_match = match (self.kind(), target.kind()) {
            (PortKind::Error, _) => true,
            (source, target) => source == target,
        };

        kinds_match && data_types_compatible(self.data_type.as_deref(), target.data_type.as_deref())
    }
}

fn data_types_compatible(source: Option<&str>, target: Option<&str>) -> bool {
    match (source, target) {
        (None, _) | (_, None) => true,
        (Some(a), Some(b)) => {
            a.eq_ignore_ascii_case("any") || b.eq_ignore_ascii_case("any") || a.eq_ignore_ascii_case(b)
        }
    }
}
