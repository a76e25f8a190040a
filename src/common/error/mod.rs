//! Unified error types for the drawing layer.
//!
//! This module provides the single error type shared by the record codecs,
//! the drawing aggregate and the patriarch.

// Submodule declarations
pub mod types;

// Re-exports
pub use types::{Error, Result};
