//! Results module
//!
//! Provider payload types and their normalization into the uniform result
//! shape.

mod normalizer;
mod types;

pub use normalizer::*;
pub use types::*;
