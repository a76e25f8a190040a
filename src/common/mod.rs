//! Common types and utilities shared by the record codecs and the drawing layer.

// Submodule declarations
pub mod binary;
pub mod error;

// Re-exports for convenience
pub use error::{Error, Result};
