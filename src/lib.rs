//! xls-drawing - the drawing layer of legacy Excel (.xls) sheets
//!
//! A sheet's shapes, comments, pictures, polygons, text boxes and combo
//! boxes are stored twice: as a tree of OfficeArt (Escher) records cut into
//! BIFF8 `MSODRAWING` records, with `OBJ`, `TXO` and `NOTE` records keyed to
//! them by shape id, and as the navigable shape tree this crate exposes
//! through [`Patriarch`]. Every mutation of the shape tree updates the
//! records, so a workbook written back and read again yields the same shapes.
//!
//! # Features
//!
//! - **Shape tree**: groups, simple shapes, pictures, polygons, text boxes,
//!   comments and combo boxes, nested groups included
//! - **Shape ids**: workbook-wide allocator with per-drawing clusters of 1024
//!   ids, persisted in the `Dgg` record
//! - **Comment consistency**: `Sp`, `OBJ` and `NOTE` ids kept in step
//! - **Round trip**: unknown Escher atoms and drawing-group children are
//!   carried through as raw bytes
//!
//! # Example
//!
//! ```
//! use xls_drawing::{ClientAnchor, Workbook};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut workbook = Workbook::new();
//! let patriarch = workbook.create_sheet().create_drawing_patriarch()?;
//!
//! let comment = patriarch.create_comment(ClientAnchor::new(0, 0, 0, 0, 2, 1, 5, 6))?;
//! patriarch.set_string(comment, "comment1")?;
//! patriarch.set_row(comment, 1)?;
//! patriarch.set_column(comment, 1)?;
//!
//! let bytes = workbook.to_bytes()?;
//! let restored = Workbook::from_bytes(&bytes)?;
//! let patriarch = restored.sheet(0).and_then(|s| s.drawing_patriarch()).unwrap();
//! let comment = patriarch.children()[0];
//! assert_eq!(patriarch.string(comment)?, "comment1");
//! assert_eq!(patriarch.find_comment(1, 1), Some(comment));
//! # Ok(())
//! # }
//! ```
//!
//! # Logging
//!
//! Enable the `tracing` feature to get debug events for drawing decoding,
//! patriarch binding and shape-id allocation.

/// Shared binary helpers and error types
pub mod common;

/// Logging macros
pub mod log;

/// OLE-era binary formats: Escher records and the XLS drawing layer
pub mod ole;

pub use common::error::{Error, Result};
pub use ole::xls::drawing::{
    Anchor, ChildAnchor, ClientAnchor, DrawingAggregate, DrawingManager, NewShape, Parent,
    Patriarch, Shape, ShapeId, ShapeKind, SimpleShapeType,
};
pub use ole::xls::{Sheet, Workbook};
