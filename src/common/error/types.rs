//! Unified error types for the drawing layer.
//!
//! Structural errors abort patriarch construction; mutation errors are local
//! to the call that raised them and leave the shape tree unchanged.
use crate::common::binary::BinaryError;
use thiserror::Error;

/// Main error type for drawing operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Truncated or unreadable binary data
    #[error("Binary error: {0}")]
    Binary(#[from] BinaryError),

    /// The drawing aggregate lacks its group container or bounds record
    #[error("Malformed drawing: {0}")]
    MalformedDrawing(String),

    /// A persisted shape container matches no known shape variant
    #[error("Unrecognized shape: {0}")]
    UnrecognizedShape(String),

    /// The shape is not a direct child of the patriarch
    #[error("Shape is not a direct child of this patriarch")]
    NotAChild,

    /// The shape id does not name a live shape of this patriarch
    #[error("Unknown shape {0}")]
    UnknownShape(usize),

    /// An operation was applied to a shape of the wrong variant
    #[error("Wrong shape kind: expected {expected}, found {found}")]
    WrongShapeKind {
        expected: &'static str,
        found: &'static str,
    },

    /// Shape id outside the range representable by the dependent records
    #[error("Invalid shape id: {0}")]
    InvalidShapeId(u32),

    /// A record could not be decoded
    #[error("Invalid record 0x{record_type:04X}: {message}")]
    InvalidRecord { record_type: u16, message: String },
}

/// Result type for drawing operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for [`Error::InvalidRecord`].
    pub(crate) fn invalid_record(record_type: u16, message: impl Into<String>) -> Self {
        Error::InvalidRecord {
            record_type,
            message: message.into(),
        }
    }
}
