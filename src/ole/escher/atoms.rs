//! Typed payloads of the fixed-layout Escher atoms.
//!
//! The byte layouts follow MS-ODRAW; the spreadsheet-specific `ClientAnchor`
//! form is the 18-byte cell anchor of MS-XLS.

use super::types::ShapeFlags;
use crate::common::binary::{self, BinaryError, BinaryResult};
use zerocopy::byteorder::{I32, LE, U16, U32};
use zerocopy::{FromBytes, IntoBytes};
use zerocopy_derive::*;

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
struct SpData {
    spid: U32<LE>,
    flags: U32<LE>,
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
struct RectData {
    x1: I32<LE>,
    y1: I32<LE>,
    x2: I32<LE>,
    y2: I32<LE>,
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
struct DgData {
    num_shapes: U32<LE>,
    last_spid: U32<LE>,
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
struct ClientAnchorData {
    flag: U16<LE>,
    col1: U16<LE>,
    dx1: U16<LE>,
    row1: U16<LE>,
    dy1: U16<LE>,
    col2: U16<LE>,
    dx2: U16<LE>,
    row2: U16<LE>,
    dy2: U16<LE>,
}

fn read_fixed<T: FromBytes>(data: &[u8]) -> BinaryResult<T> {
    let size = std::mem::size_of::<T>();
    let bytes = binary::read_bytes(data, 0, size)?;
    T::read_from_bytes(bytes)
        .map_err(|_| BinaryError::ParseError("Failed to read Escher atom".to_string()))
}

/// Shape atom (`Sp`): shape id plus shape flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscherSp {
    pub shape_id: u32,
    pub flags: ShapeFlags,
}

impl EscherSp {
    pub const SIZE: usize = 8;

    pub const fn new(shape_id: u32, flags: ShapeFlags) -> Self {
        Self { shape_id, flags }
    }

    pub fn parse(data: &[u8]) -> BinaryResult<Self> {
        let raw: SpData = read_fixed(data)?;
        Ok(Self {
            shape_id: raw.spid.get(),
            flags: ShapeFlags::from_bits_retain(raw.flags.get()),
        })
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        let raw = SpData {
            spid: U32::new(self.shape_id),
            flags: U32::new(self.flags.bits()),
        };
        out.extend_from_slice(raw.as_bytes());
    }
}

/// A rectangle of four signed 32-bit coordinates.
///
/// Shared by the `Spgr` atom (group coordinate space) and the `ChildAnchor`
/// atom (position of a shape inside its group).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EscherRect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl EscherRect {
    pub const SIZE: usize = 16;

    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn parse(data: &[u8]) -> BinaryResult<Self> {
        let raw: RectData = read_fixed(data)?;
        Ok(Self::new(raw.x1.get(), raw.y1.get(), raw.x2.get(), raw.y2.get()))
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        let raw = RectData {
            x1: I32::new(self.x1),
            y1: I32::new(self.y1),
            x2: I32::new(self.x2),
            y2: I32::new(self.y2),
        };
        out.extend_from_slice(raw.as_bytes());
    }
}

/// Drawing atom (`Dg`). The drawing-group id lives in the record instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EscherDg {
    pub num_shapes: u32,
    pub last_spid: u32,
}

impl EscherDg {
    pub const SIZE: usize = 8;

    pub fn parse(data: &[u8]) -> BinaryResult<Self> {
        let raw: DgData = read_fixed(data)?;
        Ok(Self {
            num_shapes: raw.num_shapes.get(),
            last_spid: raw.last_spid.get(),
        })
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        let raw = DgData {
            num_shapes: U32::new(self.num_shapes),
            last_spid: U32::new(self.last_spid),
        };
        out.extend_from_slice(raw.as_bytes());
    }
}

/// One shape-id cluster of the `Dgg` atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileIdCluster {
    pub drawing_group_id: u32,
    pub num_shape_ids_used: u32,
}

/// Drawing-group atom (`Dgg`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EscherDgg {
    pub shape_id_max: u32,
    pub num_shapes_saved: u32,
    pub drawings_saved: u32,
    pub clusters: Vec<FileIdCluster>,
}

impl EscherDgg {
    pub fn parse(data: &[u8]) -> BinaryResult<Self> {
        let shape_id_max = binary::read_u32_le(data, 0)?;
        let id_clusters = binary::read_u32_le(data, 4)?;
        let num_shapes_saved = binary::read_u32_le(data, 8)?;
        let drawings_saved = binary::read_u32_le(data, 12)?;

        // `cidcl` counts one more than the clusters actually stored.
        let count = id_clusters.saturating_sub(1) as usize;
        let mut clusters = Vec::with_capacity(count.min(data.len() / 8));
        for index in 0..count {
            let offset = 16 + index * 8;
            clusters.push(FileIdCluster {
                drawing_group_id: binary::read_u32_le(data, offset)?,
                num_shape_ids_used: binary::read_u32_le(data, offset + 4)?,
            });
        }

        Ok(Self {
            shape_id_max,
            num_shapes_saved,
            drawings_saved,
            clusters,
        })
    }

    pub fn size(&self) -> usize {
        16 + self.clusters.len() * 8
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.shape_id_max.to_le_bytes());
        out.extend_from_slice(&(self.clusters.len() as u32 + 1).to_le_bytes());
        out.extend_from_slice(&self.num_shapes_saved.to_le_bytes());
        out.extend_from_slice(&self.drawings_saved.to_le_bytes());
        for cluster in &self.clusters {
            out.extend_from_slice(&cluster.drawing_group_id.to_le_bytes());
            out.extend_from_slice(&cluster.num_shape_ids_used.to_le_bytes());
        }
    }
}

/// Cell anchor (`ClientAnchor`, spreadsheet form).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EscherClientAnchor {
    pub flag: u16,
    pub col1: u16,
    pub dx1: u16,
    pub row1: u16,
    pub dy1: u16,
    pub col2: u16,
    pub dx2: u16,
    pub row2: u16,
    pub dy2: u16,
}

impl EscherClientAnchor {
    pub const SIZE: usize = 18;

    pub fn parse(data: &[u8]) -> BinaryResult<Self> {
        let raw: ClientAnchorData = read_fixed(data)?;
        Ok(Self {
            flag: raw.flag.get(),
            col1: raw.col1.get(),
            dx1: raw.dx1.get(),
            row1: raw.row1.get(),
            dy1: raw.dy1.get(),
            col2: raw.col2.get(),
            dx2: raw.dx2.get(),
            row2: raw.row2.get(),
            dy2: raw.dy2.get(),
        })
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        let raw = ClientAnchorData {
            flag: U16::new(self.flag),
            col1: U16::new(self.col1),
            dx1: U16::new(self.dx1),
            row1: U16::new(self.row1),
            dy1: U16::new(self.dy1),
            col2: U16::new(self.col2),
            dx2: U16::new(self.dx2),
            row2: U16::new(self.row2),
            dy2: U16::new(self.dy2),
        };
        out.extend_from_slice(raw.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sp_layout() {
        let sp = EscherSp::new(1025, ShapeFlags::HAVE_ANCHOR | ShapeFlags::HAVE_SPT);
        let mut out = Vec::new();
        sp.write(&mut out);
        assert_eq!(out, vec![0x01, 0x04, 0x00, 0x00, 0x00, 0x0A, 0x00, 0x00]);
        assert_eq!(EscherSp::parse(&out).unwrap(), sp);
    }

    #[test]
    fn test_dgg_cluster_count_is_offset_by_one() {
        let dgg = EscherDgg {
            shape_id_max: 2050,
            num_shapes_saved: 3,
            drawings_saved: 1,
            clusters: vec![FileIdCluster {
                drawing_group_id: 1,
                num_shape_ids_used: 3,
            }],
        };
        let mut out = Vec::new();
        dgg.write(&mut out);
        assert_eq!(out.len(), dgg.size());
        assert_eq!(binary::read_u32_le(&out, 4).unwrap(), 2);
        assert_eq!(EscherDgg::parse(&out).unwrap(), dgg);
    }

    #[test]
    fn test_short_client_anchor_is_rejected() {
        assert!(EscherClientAnchor::parse(&[0u8; 8]).is_err());
    }
}
