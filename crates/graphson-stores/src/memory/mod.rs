//! In-memory graph store backed by a petgraph `DiGraph`.
//!
//! Vertices and edges are indexed by the canonical key of their id, so lookups are exact:
//! `1`, `1.0` and `"1"` are three different vertices. The store has no transactions; commits
//! and rollbacks are no-ops and every mutation is visible immediately.

use std::collections::{BTreeMap, HashMap};

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction as EdgeDirection;
use serde::Serialize;
use tracing::trace;

use graphson_core::error::{GraphsonError, GraphsonResult};
use graphson_core::traits::{validate_property_key, ElementRef, GraphStore};
use graphson_core::types::Value;

/// Vertex data in the graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VertexNode {
    pub id: Value,
    pub properties: BTreeMap<String, Value>,
}

impl VertexNode {
    pub fn new(id: Value) -> Self {
        Self {
            id,
            properties: BTreeMap::new(),
        }
    }

    /// Get one property.
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

/// Edge data in the graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeData {
    pub id: Value,
    pub label: String,
    pub properties: BTreeMap<String, Value>,
}

impl EdgeData {
    pub fn new(id: Value, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Get one property.
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

/// The underlying petgraph type.
pub type PropertyGraph = DiGraph<VertexNode, EdgeData>;

/// Non-transactional in-memory destination store.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    graph: PropertyGraph,
    vertex_index: HashMap<String, NodeIndex>,
    edge_index: HashMap<String, EdgeIndex>,
}

impl MemoryGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Find a vertex by id.
    pub fn vertex(&self, id: &Value) -> Option<&VertexNode> {
        self.vertex_index
            .get(&id.canonical_key())
            .map(|&idx| &self.graph[idx])
    }

    /// Find an edge by id.
    pub fn edge(&self, id: &Value) -> Option<&EdgeData> {
        self.edge_index
            .get(&id.canonical_key())
            .map(|&idx| &self.graph[idx])
    }

    /// The `(out, in)` vertices of an edge.
    pub fn edge_endpoints(&self, id: &Value) -> Option<(&VertexNode, &VertexNode)> {
        let idx = *self.edge_index.get(&id.canonical_key())?;
        let (source, target) = self.graph.edge_endpoints(idx)?;
        Some((&self.graph[source], &self.graph[target]))
    }

    /// Iterate over all vertices in insertion order.
    pub fn vertices(&self) -> impl Iterator<Item = &VertexNode> {
        self.graph.node_weights()
    }

    /// Iterate over all edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &EdgeData> {
        self.graph.edge_weights()
    }

    /// Edges leaving the given vertex, with their target vertex.
    pub fn out_edges(&self, id: &Value) -> Vec<(&EdgeData, &VertexNode)> {
        self.adjacent(id, EdgeDirection::Outgoing)
    }

    /// Edges arriving at the given vertex, with their source vertex.
    pub fn in_edges(&self, id: &Value) -> Vec<(&EdgeData, &VertexNode)> {
        self.adjacent(id, EdgeDirection::Incoming)
    }

    fn adjacent(&self, id: &Value, direction: EdgeDirection) -> Vec<(&EdgeData, &VertexNode)> {
        let Some(&idx) = self.vertex_index.get(&id.canonical_key()) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(idx, direction)
            .map(|edge| {
                let other = match direction {
                    EdgeDirection::Outgoing => edge.target(),
                    EdgeDirection::Incoming => edge.source(),
                };
                (edge.weight(), &self.graph[other])
            })
            .collect()
    }

    /// Borrow the underlying petgraph graph.
    pub fn inner(&self) -> &PropertyGraph {
        &self.graph
    }
}

impl GraphStore for MemoryGraph {
    type Vertex = NodeIndex;
    type Edge = EdgeIndex;

    fn lookup_vertex(&mut self, id: &Value) -> GraphsonResult<Option<NodeIndex>> {
        Ok(self.vertex_index.get(&id.canonical_key()).copied())
    }

    fn create_vertex(&mut self, id: &Value) -> GraphsonResult<NodeIndex> {
        let key = id.canonical_key();
        if let Some(&idx) = self.vertex_index.get(&key) {
            return Ok(idx);
        }
        let idx = self.graph.add_node(VertexNode::new(id.clone()));
        self.vertex_index.insert(key, idx);
        trace!(vertex_id = %id, "created vertex");
        Ok(idx)
    }

    fn create_edge(
        &mut self,
        id: &Value,
        out_vertex: &NodeIndex,
        in_vertex: &NodeIndex,
        label: &str,
    ) -> GraphsonResult<EdgeIndex> {
        let key = id.canonical_key();
        if self.edge_index.contains_key(&key) {
            return Err(GraphsonError::DuplicateEdgeId {
                edge_id: id.to_string(),
            });
        }
        if self.graph.node_weight(*out_vertex).is_none()
            || self.graph.node_weight(*in_vertex).is_none()
        {
            return Err(GraphsonError::store("edge endpoint is not a vertex of this graph"));
        }
        let idx = self
            .graph
            .add_edge(*out_vertex, *in_vertex, EdgeData::new(id.clone(), label));
        self.edge_index.insert(key, idx);
        trace!(edge_id = %id, label, "created edge");
        Ok(idx)
    }

    fn set_property(
        &mut self,
        element: ElementRef<'_, NodeIndex, EdgeIndex>,
        key: &str,
        value: &Value,
    ) -> GraphsonResult<()> {
        validate_property_key(key)?;
        let properties = match element {
            ElementRef::Vertex(&idx) => self.graph.node_weight_mut(idx).map(|v| &mut v.properties),
            ElementRef::Edge(&idx) => self.graph.edge_weight_mut(idx).map(|e| &mut e.properties),
        }
        .ok_or_else(|| GraphsonError::property_rejected(key, "element does not exist"))?;
        properties.insert(key.to_string(), value.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knows_graph() -> MemoryGraph {
        let mut graph = MemoryGraph::new();
        let marko = graph.create_vertex(&Value::Integer(1)).unwrap();
        let vadas = graph.create_vertex(&Value::Integer(2)).unwrap();
        let edge = graph
            .create_edge(&Value::Integer(7), &marko, &vadas, "knows")
            .unwrap();
        graph
            .set_property(ElementRef::Vertex(&marko), "name", &Value::from("marko"))
            .unwrap();
        graph
            .set_property(ElementRef::Edge(&edge), "weight", &Value::Float(0.5))
            .unwrap();
        graph
    }

    #[test]
    fn test_lookup_and_accessors() {
        let graph = knows_graph();
        assert_eq!(graph.vertex_count(), 2);
        assert_eq!(graph.edge_count(), 1);

        let marko = graph.vertex(&Value::Integer(1)).unwrap();
        assert_eq!(marko.property("name"), Some(&Value::from("marko")));

        let edge = graph.edge(&Value::Integer(7)).unwrap();
        assert_eq!(edge.label, "knows");
        assert_eq!(edge.property("weight"), Some(&Value::Float(0.5)));

        let (out_v, in_v) = graph.edge_endpoints(&Value::Integer(7)).unwrap();
        assert_eq!(out_v.id, Value::Integer(1));
        assert_eq!(in_v.id, Value::Integer(2));
    }

    #[test]
    fn test_ids_are_exact() {
        let graph = knows_graph();
        assert!(graph.vertex(&Value::from("1")).is_none());
        assert!(graph.vertex(&Value::Float(1.0)).is_none());
    }

    #[test]
    fn test_adjacency() {
        let graph = knows_graph();
        let out = graph.out_edges(&Value::Integer(1));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].1.id, Value::Integer(2));

        let incoming = graph.in_edges(&Value::Integer(2));
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].0.label, "knows");
        assert!(graph.out_edges(&Value::Integer(99)).is_empty());
    }

    #[test]
    fn test_duplicate_edge_id_rejected() {
        let mut graph = knows_graph();
        let v = graph.lookup_vertex(&Value::Integer(1)).unwrap().unwrap();
        let err = graph
            .create_edge(&Value::Integer(7), &v, &v, "again")
            .unwrap_err();
        assert!(matches!(err, GraphsonError::DuplicateEdgeId { .. }));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_reserved_keys_rejected() {
        let mut graph = knows_graph();
        let v = graph.lookup_vertex(&Value::Integer(1)).unwrap().unwrap();
        for key in ["", "id", "label"] {
            let err = graph
                .set_property(ElementRef::Vertex(&v), key, &Value::from("x"))
                .unwrap_err();
            assert!(matches!(err, GraphsonError::PropertyWriteRejected { .. }));
        }
    }

    #[test]
    fn test_create_vertex_is_idempotent() {
        let mut graph = MemoryGraph::new();
        let a = graph.create_vertex(&Value::from("a")).unwrap();
        let b = graph.create_vertex(&Value::from("a")).unwrap();
        assert_eq!(a, b);
        assert_eq!(graph.vertex_count(), 1);
    }

    #[test]
    fn test_commit_is_noop() {
        let mut graph = knows_graph();
        assert!(!graph.supports_transactions());
        graph.commit().unwrap();
        graph.rollback().unwrap();
        assert_eq!(graph.vertex_count(), 2);
    }

    #[test]
    fn test_serializes_with_petgraph() {
        let graph = knows_graph();
        let json = serde_json::to_value(graph.inner()).unwrap();
        assert_eq!(json["nodes"].as_array().unwrap().len(), 2);
    }
}
