//! NOTE record (0x001C): the cell side of a comment.
//!
//! Layout: row, column, flags, object id (all `u16`), the author as a BIFF8
//! unicode string, and one trailing pad byte.

use super::super::records::sid;
use super::super::writer::biff::{unicode_string_size, write_unicode_string_biff8};
use crate::common::binary;
use crate::common::error::{Error, Result};

/// Comment is hidden until the cell is hovered.
pub const NOTE_HIDDEN: u16 = 0x0000;
/// Comment is always shown.
pub const NOTE_VISIBLE: u16 = 0x0002;

/// NOTE record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRecord {
    pub row: u16,
    pub column: u16,
    pub flags: u16,
    pub object_id: u16,
    pub author: String,
    /// Trailing pad byte, absent in some files
    pub padding: Option<u8>,
}

impl Default for NoteRecord {
    fn default() -> Self {
        Self {
            row: 0,
            column: 0,
            flags: NOTE_HIDDEN,
            object_id: 0,
            author: String::new(),
            padding: Some(0),
        }
    }
}

impl NoteRecord {
    #[inline]
    pub fn is_visible(&self) -> bool {
        self.flags & NOTE_VISIBLE != 0
    }

    #[inline]
    pub fn set_visible(&mut self, visible: bool) {
        self.flags = if visible { NOTE_VISIBLE } else { NOTE_HIDDEN };
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        let row = binary::read_u16_le(data, 0)?;
        let column = binary::read_u16_le(data, 2)?;
        let flags = binary::read_u16_le(data, 4)?;
        let object_id = binary::read_u16_le(data, 6)?;

        let author_len = binary::read_u16_le(data, 8)? as usize;
        let is_16bit = *data
            .get(10)
            .ok_or_else(|| Error::invalid_record(sid::NOTE, "missing author encoding flag"))?
            & 0x01
            != 0;
        let (author, end) = if is_16bit {
            (binary::parse_utf16le_string_len(data, 11, author_len)?, 11 + author_len * 2)
        } else {
            (binary::parse_compressed_string_len(data, 11, author_len)?, 11 + author_len)
        };

        Ok(Self {
            row,
            column,
            flags,
            object_id,
            author,
            padding: data.get(end).copied(),
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(8 + unicode_string_size(&self.author) + 1);
        out.extend_from_slice(&self.row.to_le_bytes());
        out.extend_from_slice(&self.column.to_le_bytes());
        out.extend_from_slice(&self.flags.to_le_bytes());
        out.extend_from_slice(&self.object_id.to_le_bytes());
        write_unicode_string_biff8(&mut out, sid::NOTE, &self.author)?;
        if let Some(pad) = self.padding {
            out.push(pad);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_layout() {
        let note = NoteRecord {
            row: 5,
            column: 2,
            object_id: 1,
            author: "Apache POI".to_string(),
            ..Default::default()
        };
        let bytes = note.to_bytes().unwrap();
        assert_eq!(bytes.len(), 8 + 3 + 10 + 1);
        assert_eq!(&bytes[0..8], &[5, 0, 2, 0, 0, 0, 1, 0]);
        assert_eq!(NoteRecord::parse(&bytes).unwrap(), note);
    }

    #[test]
    fn test_missing_padding_round_trips() {
        let note = NoteRecord {
            author: "\u{4F5C}\u{8005}".to_string(),
            padding: None,
            ..Default::default()
        };
        let bytes = note.to_bytes().unwrap();
        assert_eq!(bytes.len(), 8 + 3 + 4);
        assert_eq!(NoteRecord::parse(&bytes).unwrap(), note);
    }

    #[test]
    fn test_visibility_flag() {
        let mut note = NoteRecord::default();
        assert!(!note.is_visible());
        note.set_visible(true);
        assert_eq!(note.flags, NOTE_VISIBLE);
        assert!(note.is_visible());
    }

    #[test]
    fn test_truncated_note_fails() {
        assert!(NoteRecord::parse(&[0, 0, 0, 0, 0, 0, 1, 0, 5, 0]).is_err());
    }
}
