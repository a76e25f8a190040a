//! OBJ record (0x005D) and its sub-records.
//!
//! An OBJ record describes the spreadsheet side of a drawing object. It is a
//! list of sub-records, each framed by a 2-byte type (`ft`) and a 2-byte
//! size (`cb`), terminated by `ftEnd`. The first sub-record is always the
//! common object data (`ftCmo`), which carries the object type and id.

use bitflags::bitflags;
use smallvec::SmallVec;

use super::super::records::sid;
use crate::common::binary;
use crate::common::error::{Error, Result};

/// Object types stored in `ftCmo`.
pub mod object_type {
    pub const GROUP: u16 = 0x00;
    pub const LINE: u16 = 0x01;
    pub const RECTANGLE: u16 = 0x02;
    pub const OVAL: u16 = 0x03;
    pub const ARC: u16 = 0x04;
    pub const TEXT: u16 = 0x06;
    pub const PICTURE: u16 = 0x08;
    pub const COMBO_BOX: u16 = 0x14;
    pub const COMMENT: u16 = 0x19;
    pub const MICROSOFT_OFFICE_DRAWING: u16 = 0x1E;

    /// Short display name, used in diagnostics.
    pub fn name(value: u16) -> &'static str {
        match value {
            GROUP => "group",
            LINE => "line",
            RECTANGLE => "rectangle",
            OVAL => "oval",
            ARC => "arc",
            TEXT => "text",
            PICTURE => "picture",
            COMBO_BOX => "combo box",
            COMMENT => "comment",
            MICROSOFT_OFFICE_DRAWING => "office drawing",
            _ => "unknown",
        }
    }
}

/// Sub-record type ids (`ft`).
pub mod ft {
    pub const END: u16 = 0x00;
    pub const CF: u16 = 0x07;
    pub const PIO_GRBIT: u16 = 0x08;
    pub const CBLS: u16 = 0x0C;
    pub const NTS: u16 = 0x0D;
    pub const LBS_DATA: u16 = 0x13;
    pub const CMO: u16 = 0x15;
}

bitflags! {
    /// `ftCmo` option bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CommonObjectFlags: u16 {
        const LOCKED = 0x0001;
        const PRINTABLE = 0x0010;
        const AUTOFILL = 0x2000;
        const AUTOLINE = 0x4000;
    }
}

/// `ftCmo` sub-record (18 bytes of data)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommonObjectData {
    pub object_type: u16,
    pub object_id: u16,
    pub flags: CommonObjectFlags,
    pub reserved: [u8; 12],
}

impl CommonObjectData {
    pub const SIZE: usize = 18;

    pub fn new(object_type: u16, flags: CommonObjectFlags) -> Self {
        Self {
            object_type,
            object_id: 0,
            flags,
            reserved: [0; 12],
        }
    }

    fn parse(data: &[u8]) -> Result<Self> {
        binary::check_len(data, 0, Self::SIZE)?;
        let mut reserved = [0u8; 12];
        reserved.copy_from_slice(&data[6..18]);
        Ok(Self {
            object_type: binary::read_u16_le(data, 0)?,
            object_id: binary::read_u16_le(data, 2)?,
            flags: CommonObjectFlags::from_bits_retain(binary::read_u16_le(data, 4)?),
            reserved,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.object_type.to_le_bytes());
        out.extend_from_slice(&self.object_id.to_le_bytes());
        out.extend_from_slice(&self.flags.bits().to_le_bytes());
        out.extend_from_slice(&self.reserved);
    }
}

/// `ftNts` sub-record: note structure (22 bytes of data)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NoteStructure {
    pub guid: [u8; 16],
    pub shared: u16,
    pub reserved: u32,
}

impl NoteStructure {
    pub const SIZE: usize = 22;

    fn parse(data: &[u8]) -> Result<Self> {
        binary::check_len(data, 0, Self::SIZE)?;
        let mut guid = [0u8; 16];
        guid.copy_from_slice(&data[0..16]);
        Ok(Self {
            guid,
            shared: binary::read_u16_le(data, 16)?,
            reserved: binary::read_u32_le(data, 18)?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.guid);
        out.extend_from_slice(&self.shared.to_le_bytes());
        out.extend_from_slice(&self.reserved.to_le_bytes());
    }
}

/// A single OBJ sub-record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjSubRecord {
    CommonObjectData(CommonObjectData),
    Note(NoteStructure),
    /// `ftLbsData` body including its (unreliable) size field
    ListBoxData(Vec<u8>),
    /// Any other sub-record, kept verbatim
    Other { ft: u16, data: Vec<u8> },
}

impl ObjSubRecord {
    /// `ftCf` clipboard format for pictures.
    pub fn clipboard_format(format: u16) -> Self {
        ObjSubRecord::Other {
            ft: ft::CF,
            data: format.to_le_bytes().to_vec(),
        }
    }

    /// `ftPioGrbit` picture option flags.
    pub fn picture_options(flags: u16) -> Self {
        ObjSubRecord::Other {
            ft: ft::PIO_GRBIT,
            data: flags.to_le_bytes().to_vec(),
        }
    }

    /// `ftCbls`: reserved check box link data.
    pub fn check_box_link() -> Self {
        ObjSubRecord::Other {
            ft: ft::CBLS,
            data: vec![0; 20],
        }
    }

    /// `ftLbsData` for an auto-filter style drop-down with no entries.
    pub fn auto_filter_list() -> Self {
        let mut data = Vec::with_capacity(20);
        data.extend_from_slice(&0x1FEEu16.to_le_bytes()); // cbFContinued
        data.extend_from_slice(&0u16.to_le_bytes()); // cLines
        data.extend_from_slice(&0u16.to_le_bytes()); // iSel
        data.extend_from_slice(&0x0301u16.to_le_bytes()); // flags: combo style, valid plex
        data.extend_from_slice(&0u16.to_le_bytes()); // idEdit
        data.extend_from_slice(&0u16.to_le_bytes()); // wStyle
        data.extend_from_slice(&8u16.to_le_bytes()); // cLine
        data.extend_from_slice(&0u16.to_le_bytes()); // dxMin
        data.extend_from_slice(&[0, 0, 0]); // empty string
        data.push(0); // pad to even
        ObjSubRecord::ListBoxData(data)
    }

    fn write(&self, out: &mut Vec<u8>) {
        let (id, body): (u16, Vec<u8>) = match self {
            ObjSubRecord::CommonObjectData(cmo) => {
                let mut body = Vec::with_capacity(CommonObjectData::SIZE);
                cmo.write(&mut body);
                (ft::CMO, body)
            },
            ObjSubRecord::Note(nts) => {
                let mut body = Vec::with_capacity(NoteStructure::SIZE);
                nts.write(&mut body);
                (ft::NTS, body)
            },
            ObjSubRecord::ListBoxData(data) => {
                // The size field is part of the stored body.
                out.extend_from_slice(&ft::LBS_DATA.to_le_bytes());
                out.extend_from_slice(data);
                return;
            },
            ObjSubRecord::Other { ft, data } => (*ft, data.clone()),
        };
        out.extend_from_slice(&id.to_le_bytes());
        out.extend_from_slice(&(body.len() as u16).to_le_bytes());
        out.extend_from_slice(&body);
    }
}

/// OBJ record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjRecord {
    pub sub_records: SmallVec<[ObjSubRecord; 4]>,
}

impl ObjRecord {
    /// A record holding only the common object data.
    pub fn new(cmo: CommonObjectData) -> Self {
        let mut sub_records = SmallVec::new();
        sub_records.push(ObjSubRecord::CommonObjectData(cmo));
        Self { sub_records }
    }

    pub fn with(mut self, sub_record: ObjSubRecord) -> Self {
        self.sub_records.push(sub_record);
        self
    }

    /// Parse the body of an OBJ record.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut sub_records = SmallVec::new();
        let mut offset = 0;

        while offset + 4 <= data.len() {
            let id = binary::read_u16_le(data, offset)?;
            if id == ft::END {
                break;
            }

            if id == ft::LBS_DATA {
                // cb of ftLbsData is not a real length; it runs up to ftEnd.
                let end = if data.len() >= offset + 6 && data[data.len() - 4..] == [0, 0, 0, 0] {
                    data.len() - 4
                } else {
                    data.len()
                };
                sub_records.push(ObjSubRecord::ListBoxData(data[offset + 2..end].to_vec()));
                offset = end;
                continue;
            }

            let size = binary::read_u16_le(data, offset + 2)? as usize;
            let body = binary::read_bytes(data, offset + 4, size)?;
            sub_records.push(match id {
                ft::CMO => ObjSubRecord::CommonObjectData(CommonObjectData::parse(body)?),
                ft::NTS => ObjSubRecord::Note(NoteStructure::parse(body)?),
                _ => ObjSubRecord::Other {
                    ft: id,
                    data: body.to_vec(),
                },
            });
            offset += 4 + size;
        }

        match sub_records.first() {
            Some(ObjSubRecord::CommonObjectData(_)) => Ok(Self { sub_records }),
            _ => Err(Error::invalid_record(
                sid::OBJ,
                "first sub-record is not common object data",
            )),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64);
        for sub in &self.sub_records {
            sub.write(&mut out);
        }
        out.extend_from_slice(&ft::END.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out
    }

    pub fn common_data(&self) -> Option<&CommonObjectData> {
        self.sub_records.iter().find_map(|sub| match sub {
            ObjSubRecord::CommonObjectData(cmo) => Some(cmo),
            _ => None,
        })
    }

    pub fn common_data_mut(&mut self) -> Option<&mut CommonObjectData> {
        self.sub_records.iter_mut().find_map(|sub| match sub {
            ObjSubRecord::CommonObjectData(cmo) => Some(cmo),
            _ => None,
        })
    }

    #[inline]
    pub fn object_type(&self) -> Option<u16> {
        self.common_data().map(|cmo| cmo.object_type)
    }

    #[inline]
    pub fn object_id(&self) -> Option<u16> {
        self.common_data().map(|cmo| cmo.object_id)
    }

    pub fn set_object_id(&mut self, object_id: u16) {
        if let Some(cmo) = self.common_data_mut() {
            cmo.object_id = object_id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment_obj() -> ObjRecord {
        let mut cmo = CommonObjectData::new(
            object_type::COMMENT,
            CommonObjectFlags::LOCKED
                | CommonObjectFlags::PRINTABLE
                | CommonObjectFlags::AUTOFILL
                | CommonObjectFlags::AUTOLINE,
        );
        cmo.object_id = 1;
        ObjRecord::new(cmo).with(ObjSubRecord::Note(NoteStructure::default()))
    }

    #[test]
    fn test_comment_obj_layout() {
        let bytes = comment_obj().to_bytes();
        // ftCmo (4 + 18) + ftNts (4 + 22) + ftEnd (4)
        assert_eq!(bytes.len(), 52);
        assert_eq!(&bytes[0..6], &[0x15, 0x00, 0x12, 0x00, 0x19, 0x00]);
        assert_eq!(&bytes[8..10], &[0x11, 0x60]);
        assert_eq!(&bytes[48..], &[0, 0, 0, 0]);

        let parsed = ObjRecord::parse(&bytes).unwrap();
        assert_eq!(parsed, comment_obj());
        assert_eq!(parsed.object_id(), Some(1));
        assert_eq!(parsed.object_type(), Some(object_type::COMMENT));
    }

    #[test]
    fn test_unknown_sub_records_are_preserved() {
        let obj = ObjRecord::new(CommonObjectData::new(object_type::PICTURE, CommonObjectFlags::LOCKED))
            .with(ObjSubRecord::clipboard_format(0x0002))
            .with(ObjSubRecord::picture_options(0x0001));
        let parsed = ObjRecord::parse(&obj.to_bytes()).unwrap();
        assert_eq!(parsed.sub_records.len(), 3);
        assert_eq!(parsed, obj);
    }

    #[test]
    fn test_list_box_data_runs_to_end() {
        let obj = ObjRecord::new(CommonObjectData::new(object_type::COMBO_BOX, CommonObjectFlags::LOCKED))
            .with(ObjSubRecord::check_box_link())
            .with(ObjSubRecord::auto_filter_list());
        let bytes = obj.to_bytes();
        let parsed = ObjRecord::parse(&bytes).unwrap();
        assert_eq!(parsed, obj);
        assert_eq!(parsed.to_bytes(), bytes);
    }

    #[test]
    fn test_missing_common_data_is_rejected() {
        let bytes = [0x07, 0x00, 0x02, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00];
        assert!(ObjRecord::parse(&bytes).is_err());
    }

    #[test]
    fn test_set_object_id() {
        let mut obj = comment_obj();
        obj.set_object_id(42);
        assert_eq!(obj.object_id(), Some(42));
    }
}
