//! Core traits for graphson collaborators.

mod graph_store;
mod token_source;

pub use graph_store::*;
pub use token_source::*;
