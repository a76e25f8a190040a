//! Legacy Excel (.xls) drawing records
//!
//! This module covers the part of the BIFF8 workbook stream that carries
//! sheet drawings: the `MSODRAWINGGROUP` record of the workbook globals and,
//! per sheet, the `MSODRAWING`/`OBJ`/`TXO`/`NOTE` records. The shape tree
//! built on top of them lives in [`drawing`].

/// BIFF record framing and iteration
pub mod records;

/// BIFF record writing helpers
pub(crate) mod writer;

/// OBJ, TXO and NOTE record codecs
pub mod objects;

/// Shape tree of a sheet drawing
pub mod drawing;

/// Workbook and sheets owning the drawings
mod workbook;

pub use drawing::{ClientAnchor, Patriarch, ShapeId, ShapeKind};
pub use workbook::{Sheet, Workbook};
