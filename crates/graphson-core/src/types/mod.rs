//! Core types for graphson.

mod record;
mod value;

pub use record::*;
pub use value::*;
