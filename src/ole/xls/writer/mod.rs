//! XLS record writing
//!
//! Helpers that frame drawing-related BIFF8 records for a sheet or
//! workbook-globals substream.

/// BIFF8 record generation
pub(crate) mod biff;
