//! Streaming GraphSON import.
//!
//! A document is consumed token by token: the driver detaches one vertex or edge record at a
//! time, the decoder turns it into typed values, the factory writes it into the destination
//! store and the batch controller commits every `buffer_size` records.
//!
//! # Example
//!
//! ```ignore
//! use graphson_core::import::import_document;
//! use graphson_core::stream::JsonTokenReader;
//!
//! let mut source = JsonTokenReader::new(File::open("graph.json")?);
//! import_document(&mut graph, &mut source, 1000)?;
//! ```

pub mod batch;
pub mod decoder;
pub mod driver;
pub mod factory;
pub mod reader;

pub use batch::BatchController;
pub use decoder::{decode_typed, infer_value, TypeTag, ValueDecoder};
pub use driver::{import_document, ImportState, ImportStats, Importer};
pub use factory::ElementFactory;
pub use reader::{import_document_async, GraphsonReader};
