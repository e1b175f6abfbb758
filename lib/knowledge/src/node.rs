//! Knowledge graph node types.
//!
//! Nodes are stored as `{"id", "attributes": {"type": ..., ...}}`. Only
//! templates are eligible for selection; services, capabilities and data
//! types exist to enrich them.

use crate::port::{PortDirection, TemplatePort};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;

/// A node in the knowledge graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Unique id within the graph (`tpl_postgres`, `service:slack`, ...).
    pub id: String,
    /// Variant-specific attributes.
    #[serde(rename = "attributes")]
    pub kind: NodeKind,
}

impl GraphNode {
    /// Creates a template node.
    #[must_use]
    pub fn template(id: impl Into<String>, template: TemplateNode) -> Self {
        Self {
            id: id.into(),
            kind: NodeKind::Template(template),
        }
    }

    /// Creates a service node.
    #[must_use]
    pub fn service(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: NodeKind::Service(ServiceNode {
                name: name.into(),
                service_type: None,
                aliases: Vec::new(),
            }),
        }
    }

    /// Returns the template attributes if this is a template.
    #[must_use]
    pub fn as_template(&self) -> Option<&TemplateNode> {
        match &self.kind {
            NodeKind::Template(template) => Some(template),
            _ => None,
        }
    }
}

/// Variant attributes of a [`GraphNode`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeKind {
    /// A reusable processing node.
    Template(TemplateNode),
    /// An external service a template integrates with.
    Service(ServiceNode),
    /// An abstract capability.
    Capability(CapabilityNode),
    /// A data type ports may accept or emit.
    DataType(DataTypeNode),
}

/// A reusable building block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateNode {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub inputs: Vec<TemplatePort>,
    #[serde(default)]
    pub outputs: Vec<TemplatePort>,
    /// Property definitions keyed by property name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, JsonValue>,
    /// Property rules, kept as free-form JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "TemplateEmbeddings::is_empty")]
    pub embeddings: TemplateEmbeddings,
}

impl TemplateNode {
    /// Creates a template with a title and category and nothing else.
    #[must_use]
    pub fn new(title: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            category: category.into(),
            subcategory: None,
            tags: Vec::new(),
            capabilities: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            properties: BTreeMap::new(),
            rules: None,
            embeddings: TemplateEmbeddings::default(),
        }
    }

    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_input(mut self, port: TemplatePort) -> Self {
        self.inputs.push(port);
        self
    }

    #[must_use]
    pub fn with_output(mut self, port: TemplatePort) -> Self {
        self.outputs.push(port);
        self
    }

    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, definition: JsonValue) -> Self {
        self.properties.insert(name.into(), definition);
        self
    }

    #[must_use]
    pub fn with_embeddings(mut self, embeddings: TemplateEmbeddings) -> Self {
        self.embeddings = embeddings;
        self
    }

    /// Finds a port by id in either direction.
    #[must_use]
    pub fn port(&self, port_id: &str) -> Option<&TemplatePort> {
        self.inputs
            .iter()
            .chain(self.outputs.iter())
            .find(|p| p.id == port_id)
    }

    /// Builds a node configuration from the property default values.
    #[must_use]
    pub fn default_config(&self) -> Map<String, JsonValue> {
        self.properties
            .iter()
            .filter_map(|(name, definition)| {
                let default = definition.get("defaultValue")?;
                Some((name.clone(), default.clone()))
            })
            .collect()
    }

    /// Forces port directions to agree with the list each port sits in.
    ///
    /// Snapshot ports often omit `type`, which would otherwise default to
    /// input for outputs too.
    pub(crate) fn normalize_ports(&mut self) {
        for port in &mut self.inputs {
            port.direction = PortDirection::Input;
        }
        for port in &mut self.outputs {
            port.direction = PortDirection::Output;
        }
    }
}

/// Precomputed embedding vectors of a template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateEmbeddings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combined: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Vec<f32>>,
}

impl TemplateEmbeddings {
    /// Embeddings with only a combined vector.
    #[must_use]
    pub fn combined(vector: Vec<f32>) -> Self {
        Self {
            combined: Some(vector),
            ..Self::default()
        }
    }

    /// Iterates over the non-empty vectors present.
    pub fn vectors(&self) -> impl Iterator<Item = &[f32]> {
        [
            &self.combined,
            &self.title,
            &self.description,
            &self.capabilities,
        ]
        .into_iter()
        .filter_map(|v| v.as_deref())
        .filter(|v| !v.is_empty())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors().next().is_none()
    }
}

/// An external service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// An abstract capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityNode {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// A data type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTypeNode {
    pub name: String,
    #[serde(default)]
    pub schema: JsonValue,
}
