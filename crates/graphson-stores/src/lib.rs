//! graphson-stores - Destination graph stores for graphson.
//!
//! This crate provides graph store implementations that GraphSON documents can be
//! imported into.
//!
//! # Supported Backends
//!
//! - **Memory** (feature: `memory`) - petgraph `DiGraph`, non-transactional
//! - **SQLite** (feature: `sqlite`) - persistent, transactional, via rusqlite

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "memory")]
pub use memory::{EdgeData, MemoryGraph, VertexNode};

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteGraph, StoredEdge};

// Re-export core types
pub use graphson_core::traits::{ElementRef, GraphStore};
