//! OfficeArt (Escher) records for the spreadsheet drawing layer.
//!
//! Escher is Microsoft's drawing layer format. A sheet's drawing is one
//! `DgContainer` record tree; this module keeps that tree as an owned,
//! mutable arena so shapes can be added and removed and the result written
//! back byte for byte.
//!
//! # Modules
//!
//! - `types`: record type ids, shape types and shape flags
//! - `record`: record arena, node and header structures
//! - `atoms`: fixed-layout atom payloads (`Sp`, `Spgr`, `Dg`, `Dgg`, anchors)
//! - `properties`: property tables (`Opt` records)
//! - `parser`: bytes to tree
//! - `writer`: tree to bytes

pub mod atoms;
pub mod parser;
pub mod properties;
pub mod record;
pub mod types;
pub mod writer;

pub use atoms::{EscherClientAnchor, EscherDg, EscherDgg, EscherRect, EscherSp, FileIdCluster};
pub use parser::EscherParser;
pub use properties::{EscherArrayProperty, EscherOpt, EscherProperty, EscherPropertyValue, prop_id};
pub use record::{EscherAtom, EscherNode, EscherRecordHeader, EscherTree, RecordBody, RecordId, options};
pub use types::{EscherRecordType, ShapeFlags, record_type, shape_type};
