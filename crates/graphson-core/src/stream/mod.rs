//! Token cursor implementations.

pub mod json_reader;

pub use json_reader::{JsonTokenReader, MAX_NESTING};
