//! Sheet drawing layer.
//!
//! - `aggregate`: decoded drawing records of one sheet
//! - `manager`: workbook-wide drawing groups and shape-id allocation
//! - `anchor`: cell and group-relative shape positions
//! - `shape`: shape variants and their record layouts
//! - `shape_factory`: shapes rebuilt from persisted records
//! - `patriarch`: the shape tree of a sheet

pub mod aggregate;
pub mod anchor;
pub mod manager;
pub mod patriarch;
pub mod shape;
mod shape_factory;

pub use aggregate::{AssociatedRecord, DEFAULT_GROUP_BOUNDS, DrawingAggregate};
pub use anchor::{Anchor, ChildAnchor, ClientAnchor};
pub use manager::{DrawingManager, DrawingManagerHandle, SHAPE_IDS_PER_CLUSTER};
pub use patriarch::Patriarch;
pub use shape::{NewShape, Parent, Shape, ShapeId, ShapeKind, ShapeRecords, SimpleShapeType};
