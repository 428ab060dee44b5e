//! Transient element records produced by the decoder.

use std::collections::BTreeMap;

use super::Value;
use crate::error::RecordKind;

/// A vertex as read from the `vertices` array.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexRecord {
    pub id: Value,
    pub properties: BTreeMap<String, Value>,
}

impl VertexRecord {
    /// Create a vertex record without properties.
    pub fn new(id: impl Into<Value>) -> Self {
        Self {
            id: id.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Add a property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// An edge as read from the `edges` array.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRecord {
    pub id: Value,
    pub out_vertex_id: Value,
    pub in_vertex_id: Value,
    pub label: String,
    pub properties: BTreeMap<String, Value>,
}

impl EdgeRecord {
    /// Create an edge record without properties.
    pub fn new(
        id: impl Into<Value>,
        out_vertex_id: impl Into<Value>,
        in_vertex_id: impl Into<Value>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            out_vertex_id: out_vertex_id.into(),
            in_vertex_id: in_vertex_id.into(),
            label: label.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Add a property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// A decoded record; the variant is fixed by the array the node came from.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementRecord {
    Vertex(VertexRecord),
    Edge(EdgeRecord),
}

impl ElementRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            ElementRecord::Vertex(_) => RecordKind::Vertex,
            ElementRecord::Edge(_) => RecordKind::Edge,
        }
    }

    pub fn id(&self) -> &Value {
        match self {
            ElementRecord::Vertex(v) => &v.id,
            ElementRecord::Edge(e) => &e.id,
        }
    }
}
