//! graphson-core - Core library for graphson.
//!
//! This crate provides the typed value model, the destination store and token source traits,
//! a pull tokenizer for JSON byte streams, and the streaming importer for GraphSON documents.
//!
//! # Example
//!
//! ```ignore
//! use graphson_core::{GraphsonReader, ImportConfig};
//!
//! let config = ImportConfig::builder().buffer_size(500).build()?;
//! let mut reader = GraphsonReader::with_config(graph, config);
//! let stats = reader.input_graph(File::open("graph.json")?)?;
//! println!("Imported {} vertices, {} edges", stats.vertices, stats.edges);
//! ```

pub mod config;
pub mod error;
pub mod import;
pub mod stream;
pub mod tokens;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::{ImportConfig, MissingVertexPolicy, DEFAULT_BUFFER_SIZE};
pub use error::{Direction, ErrorCode, GraphsonError, GraphsonResult, RecordKind, RecordLocator};
pub use import::{
    import_document, import_document_async, GraphsonReader, ImportStats, Importer, ValueDecoder,
};
pub use stream::JsonTokenReader;
pub use traits::{
    validate_property_key, ElementRef, GraphStore, Node, RawScalar, Token, TokenSource,
};
pub use types::{EdgeRecord, ElementRecord, Value, VertexRecord};
