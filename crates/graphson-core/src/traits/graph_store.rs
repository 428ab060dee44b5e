//! Destination graph store trait and related types.

use crate::error::{GraphsonError, GraphsonResult};
use crate::tokens;
use crate::types::Value;

/// A borrowed handle to an element of the destination store.
#[derive(Debug)]
pub enum ElementRef<'a, V, E> {
    Vertex(&'a V),
    Edge(&'a E),
}

impl<V, E> Clone for ElementRef<'_, V, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V, E> Copy for ElementRef<'_, V, E> {}

/// Core GraphStore trait - every import destination implements this.
///
/// Handles are opaque to the importer and never outlive the record being processed. Stores
/// without transactions keep the default no-op `commit` and `rollback`.
pub trait GraphStore {
    /// Handle to a materialized vertex.
    type Vertex: Clone;
    /// Handle to a materialized edge.
    type Edge;

    /// Find a vertex by exact id.
    fn lookup_vertex(&mut self, id: &Value) -> GraphsonResult<Option<Self::Vertex>>;

    /// Create a vertex with the given id.
    fn create_vertex(&mut self, id: &Value) -> GraphsonResult<Self::Vertex>;

    /// Create an edge `out -> in`.
    ///
    /// Stores enforcing unique edge ids report a clash as [`GraphsonError::DuplicateEdgeId`].
    fn create_edge(
        &mut self,
        id: &Value,
        out_vertex: &Self::Vertex,
        in_vertex: &Self::Vertex,
        label: &str,
    ) -> GraphsonResult<Self::Edge>;

    /// Set or overwrite one property on an element.
    fn set_property(
        &mut self,
        element: ElementRef<'_, Self::Vertex, Self::Edge>,
        key: &str,
        value: &Value,
    ) -> GraphsonResult<()>;

    /// Make buffered mutations durable.
    fn commit(&mut self) -> GraphsonResult<()> {
        Ok(())
    }

    /// Discard buffered mutations.
    fn rollback(&mut self) -> GraphsonResult<()> {
        Ok(())
    }

    /// Whether `commit` and `rollback` do anything.
    fn supports_transactions(&self) -> bool {
        false
    }
}

impl<G: GraphStore + ?Sized> GraphStore for &mut G {
    type Vertex = G::Vertex;
    type Edge = G::Edge;

    fn lookup_vertex(&mut self, id: &Value) -> GraphsonResult<Option<Self::Vertex>> {
        (**self).lookup_vertex(id)
    }

    fn create_vertex(&mut self, id: &Value) -> GraphsonResult<Self::Vertex> {
        (**self).create_vertex(id)
    }

    fn create_edge(
        &mut self,
        id: &Value,
        out_vertex: &Self::Vertex,
        in_vertex: &Self::Vertex,
        label: &str,
    ) -> GraphsonResult<Self::Edge> {
        (**self).create_edge(id, out_vertex, in_vertex, label)
    }

    fn set_property(
        &mut self,
        element: ElementRef<'_, Self::Vertex, Self::Edge>,
        key: &str,
        value: &Value,
    ) -> GraphsonResult<()> {
        (**self).set_property(element, key, value)
    }

    fn commit(&mut self) -> GraphsonResult<()> {
        (**self).commit()
    }

    fn rollback(&mut self) -> GraphsonResult<()> {
        (**self).rollback()
    }

    fn supports_transactions(&self) -> bool {
        (**self).supports_transactions()
    }
}

/// Reject property keys that collide with element identity.
///
/// Shared by the bundled stores; `id` and `label` are reserved on every element.
pub fn validate_property_key(key: &str) -> GraphsonResult<()> {
    if key.is_empty() {
        return Err(GraphsonError::property_rejected(
            key,
            "property key can not be empty",
        ));
    }
    if key == tokens::ID || key == tokens::LABEL {
        return Err(GraphsonError::property_rejected(
            key,
            format!("property key is reserved for all vertices and edges: {}", key),
        ));
    }
    Ok(())
}
