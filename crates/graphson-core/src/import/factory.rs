//! Element factory: turns decoded records into store mutations.

use std::collections::BTreeMap;

use tracing::{trace, warn};

use crate::config::MissingVertexPolicy;
use crate::error::{Direction, GraphsonError, GraphsonResult};
use crate::traits::{ElementRef, GraphStore};
use crate::types::{EdgeRecord, Value, VertexRecord};

/// Creates or resolves elements in a destination store and applies their properties.
pub struct ElementFactory<'g, G: GraphStore> {
    graph: &'g mut G,
    missing_vertex_policy: MissingVertexPolicy,
    implicit_vertices: u64,
}

impl<'g, G: GraphStore> ElementFactory<'g, G> {
    /// Create a factory with the default (failing) missing vertex policy.
    pub fn new(graph: &'g mut G) -> Self {
        Self {
            graph,
            missing_vertex_policy: MissingVertexPolicy::Fail,
            implicit_vertices: 0,
        }
    }

    /// Set the policy applied to unresolved edge endpoints.
    pub fn with_missing_vertex_policy(mut self, policy: MissingVertexPolicy) -> Self {
        self.missing_vertex_policy = policy;
        self
    }

    pub fn graph_mut(&mut self) -> &mut G {
        &mut *self.graph
    }

    /// Vertices created because an edge referenced them before they were imported.
    pub fn implicit_vertices(&self) -> u64 {
        self.implicit_vertices
    }

    /// Look up or create the vertex, then overwrite every property of the record.
    pub fn materialize_vertex(&mut self, record: &VertexRecord) -> GraphsonResult<G::Vertex> {
        let vertex = match self.graph.lookup_vertex(&record.id)? {
            Some(vertex) => vertex,
            None => self.graph.create_vertex(&record.id)?,
        };
        self.apply_properties(ElementRef::Vertex(&vertex), &record.properties)?;
        Ok(vertex)
    }

    /// Resolve an edge endpoint by id.
    pub fn resolve_vertex(
        &mut self,
        id: &Value,
        direction: Direction,
    ) -> GraphsonResult<G::Vertex> {
        if let Some(vertex) = self.graph.lookup_vertex(id)? {
            return Ok(vertex);
        }
        match self.missing_vertex_policy {
            MissingVertexPolicy::Fail => Err(GraphsonError::VertexNotFound {
                vertex_id: id.to_string(),
                direction,
            }),
            MissingVertexPolicy::CreateOnReference => {
                warn!(
                    vertex_id = %id,
                    %direction,
                    "creating vertex referenced by edge before import"
                );
                self.implicit_vertices += 1;
                self.graph.create_vertex(id)
            }
        }
    }

    /// Create the edge `out -> in` and set every property of the record.
    pub fn materialize_edge(
        &mut self,
        record: &EdgeRecord,
        out_vertex: &G::Vertex,
        in_vertex: &G::Vertex,
    ) -> GraphsonResult<G::Edge> {
        let edge = self
            .graph
            .create_edge(&record.id, out_vertex, in_vertex, &record.label)?;
        self.apply_properties(ElementRef::Edge(&edge), &record.properties)?;
        Ok(edge)
    }

    fn apply_properties(
        &mut self,
        element: ElementRef<'_, G::Vertex, G::Edge>,
        properties: &BTreeMap<String, Value>,
    ) -> GraphsonResult<()> {
        for (key, value) in properties {
            if value.is_null() {
                trace!(key = %key, "skipping null property");
                continue;
            }
            self.graph
                .set_property(element, key, value)
                .map_err(|e| normalize_property_error(key, e))?;
        }
        Ok(())
    }
}

fn normalize_property_error(key: &str, err: GraphsonError) -> GraphsonError {
    match err {
        rejected @ GraphsonError::PropertyWriteRejected { .. } => rejected,
        other => GraphsonError::PropertyWriteRejected {
            key: key.to_string(),
            message: other.to_string(),
            source: Some(Box::new(other)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Minimal store keyed by canonical id, edges kept in a list.
    #[derive(Default)]
    struct MapStore {
        vertices: HashMap<String, BTreeMap<String, Value>>,
        edges: Vec<(String, String, String, String)>,
        fail_properties: bool,
    }

    impl GraphStore for MapStore {
        type Vertex = String;
        type Edge = usize;

        fn lookup_vertex(&mut self, id: &Value) -> GraphsonResult<Option<String>> {
            let key = id.canonical_key();
            Ok(self.vertices.contains_key(&key).then_some(key))
        }

        fn create_vertex(&mut self, id: &Value) -> GraphsonResult<String> {
            let key = id.canonical_key();
            self.vertices.entry(key.clone()).or_default();
            Ok(key)
        }

        fn create_edge(
            &mut self,
            id: &Value,
            out_vertex: &String,
            in_vertex: &String,
            label: &str,
        ) -> GraphsonResult<usize> {
            self.edges.push((
                id.canonical_key(),
                out_vertex.clone(),
                in_vertex.clone(),
                label.to_string(),
            ));
            Ok(self.edges.len() - 1)
        }

        fn set_property(
            &mut self,
            element: ElementRef<'_, String, usize>,
            key: &str,
            value: &Value,
        ) -> GraphsonResult<()> {
            if self.fail_properties {
                return Err(GraphsonError::store("disk full"));
            }
            if let ElementRef::Vertex(v) = element {
                self.vertices
                    .get_mut(v)
                    .ok_or_else(|| GraphsonError::internal("unknown vertex"))?
                    .insert(key.to_string(), value.clone());
            }
            Ok(())
        }
    }

    #[test]
    fn test_materialize_vertex_is_idempotent() {
        let mut store = MapStore::default();
        let mut factory = ElementFactory::new(&mut store);

        let first = VertexRecord::new("1")
            .with_property("name", "marko")
            .with_property("age", 29i64);
        let second = VertexRecord::new("1").with_property("age", 30i64);

        let a = factory.materialize_vertex(&first).unwrap();
        let b = factory.materialize_vertex(&second).unwrap();
        assert_eq!(a, b);

        assert_eq!(store.vertices.len(), 1);
        let props = &store.vertices[&Value::from("1").canonical_key()];
        assert_eq!(props["name"], Value::from("marko"));
        assert_eq!(props["age"], Value::Integer(30));
    }

    #[test]
    fn test_null_properties_are_skipped() {
        let mut store = MapStore::default();
        ElementFactory::new(&mut store)
            .materialize_vertex(&VertexRecord::new(1i64).with_property("gone", Value::Null))
            .unwrap();
        assert!(store.vertices[&Value::Integer(1).canonical_key()].is_empty());
    }

    #[test]
    fn test_resolve_missing_vertex_fails_by_default() {
        let mut store = MapStore::default();
        let mut factory = ElementFactory::new(&mut store);
        let err = factory
            .resolve_vertex(&Value::from("9"), Direction::Out)
            .unwrap_err();
        assert!(matches!(
            err,
            GraphsonError::VertexNotFound {
                direction: Direction::Out,
                ..
            }
        ));
    }

    #[test]
    fn test_resolve_missing_vertex_creates_on_reference() {
        let mut store = MapStore::default();
        let mut factory = ElementFactory::new(&mut store)
            .with_missing_vertex_policy(MissingVertexPolicy::CreateOnReference);

        factory
            .resolve_vertex(&Value::from("9"), Direction::In)
            .unwrap();
        assert_eq!(factory.implicit_vertices(), 1);
        assert_eq!(store.vertices.len(), 1);
    }

    #[test]
    fn test_materialize_edge() {
        let mut store = MapStore::default();
        let mut factory = ElementFactory::new(&mut store);
        let v = factory.materialize_vertex(&VertexRecord::new("1")).unwrap();

        let record = EdgeRecord::new("7", "1", "1", "self").with_property("weight", 0.5);
        factory.materialize_edge(&record, &v, &v).unwrap();

        assert_eq!(store.edges.len(), 1);
        assert_eq!(store.edges[0].3, "self");
    }

    #[test]
    fn test_store_property_errors_are_normalized() {
        let mut store = MapStore {
            fail_properties: true,
            ..Default::default()
        };
        let err = ElementFactory::new(&mut store)
            .materialize_vertex(&VertexRecord::new("1").with_property("name", "marko"))
            .unwrap_err();

        match err {
            GraphsonError::PropertyWriteRejected { key, source, .. } => {
                assert_eq!(key, "name");
                assert!(source.is_some());
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
