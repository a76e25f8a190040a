//! TXO record (0x01B6): text attached to a text box or comment.
//!
//! The TXO body is an 18-byte header. When the text is not empty, the
//! characters follow in one or more `CONTINUE` records (each starting with
//! its own compression flag byte) and the formatting runs follow in a final
//! `CONTINUE` record.

use std::io::Write;

use super::super::records::{MAX_RECORD_DATA, sid};
use super::super::writer::biff::{biff8_string_length, write_record, write_record_header};
use crate::common::binary;
use crate::common::error::{Error, Result};

/// Horizontal text alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HorizontalAlignment {
    Left = 1,
    Centered = 2,
    Right = 3,
    Justified = 4,
    Distributed = 7,
}

impl HorizontalAlignment {
    fn from_bits(bits: u16) -> Self {
        match bits {
            2 => Self::Centered,
            3 => Self::Right,
            4 => Self::Justified,
            7 => Self::Distributed,
            _ => Self::Left,
        }
    }
}

/// Vertical text alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VerticalAlignment {
    Top = 1,
    Center = 2,
    Bottom = 3,
    Justify = 4,
    Distributed = 7,
}

impl VerticalAlignment {
    fn from_bits(bits: u16) -> Self {
        match bits {
            2 => Self::Center,
            3 => Self::Bottom,
            4 => Self::Justify,
            7 => Self::Distributed,
            _ => Self::Top,
        }
    }
}

/// A formatting run: from `char_index` on, text uses font `font_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatRun {
    pub char_index: u16,
    pub font_index: u16,
}

impl FormatRun {
    pub const SIZE: usize = 8;
}

const HALIGN_MASK: u16 = 0x000E;
const VALIGN_MASK: u16 = 0x0070;
const TEXT_LOCKED: u16 = 0x0200;

/// TXO record with its text and formatting runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextObjectRecord {
    pub options: u16,
    pub orientation: u16,
    pub text: String,
    /// Runs excluding the terminating run at the end of the text
    pub runs: Vec<FormatRun>,
}

impl Default for TextObjectRecord {
    /// Left/top aligned, locked, horizontal, empty text.
    fn default() -> Self {
        let mut record = Self {
            options: TEXT_LOCKED,
            orientation: 0,
            text: String::new(),
            runs: Vec::new(),
        };
        record.set_horizontal_alignment(HorizontalAlignment::Left);
        record.set_vertical_alignment(VerticalAlignment::Top);
        record
    }
}

impl TextObjectRecord {
    pub const HEADER_SIZE: usize = 18;

    pub fn horizontal_alignment(&self) -> HorizontalAlignment {
        HorizontalAlignment::from_bits((self.options & HALIGN_MASK) >> 1)
    }

    pub fn set_horizontal_alignment(&mut self, alignment: HorizontalAlignment) {
        self.options = (self.options & !HALIGN_MASK) | ((alignment as u16) << 1);
    }

    pub fn vertical_alignment(&self) -> VerticalAlignment {
        VerticalAlignment::from_bits((self.options & VALIGN_MASK) >> 4)
    }

    pub fn set_vertical_alignment(&mut self, alignment: VerticalAlignment) {
        self.options = (self.options & !VALIGN_MASK) | ((alignment as u16) << 4);
    }

    #[inline]
    pub fn is_text_locked(&self) -> bool {
        self.options & TEXT_LOCKED != 0
    }

    /// Parse a TXO body and the `CONTINUE` bodies that follow it.
    pub fn parse(data: &[u8], continues: &[&[u8]]) -> Result<Self> {
        binary::check_len(data, 0, Self::HEADER_SIZE)?;
        let options = binary::read_u16_le(data, 0)?;
        let orientation = binary::read_u16_le(data, 2)?;
        let text_len = binary::read_u16_le(data, 10)? as usize;
        let runs_len = binary::read_u16_le(data, 12)? as usize;

        let mut pieces = continues.iter();
        let mut units: Vec<u16> = Vec::with_capacity(text_len);
        while units.len() < text_len {
            let piece = pieces.next().ok_or_else(|| {
                Error::invalid_record(sid::TXO, "text continues past the last CONTINUE record")
            })?;
            let Some((&flag, chars)) = piece.split_first() else {
                continue;
            };
            let wanted = text_len - units.len();
            if flag & 0x01 != 0 {
                let count = wanted.min(chars.len() / 2);
                units.extend(
                    chars[..count * 2]
                        .chunks_exact(2)
                        .map(|pair| u16::from_le_bytes([pair[0], pair[1]])),
                );
            } else {
                let count = wanted.min(chars.len());
                units.extend(chars[..count].iter().map(|&b| b as u16));
            }
        }
        let text = String::from_utf16_lossy(&units);

        let mut runs = Vec::new();
        if runs_len > 0 {
            let run_data: Vec<u8> = pieces.flat_map(|piece| piece.iter().copied()).collect();
            binary::check_len(&run_data, 0, runs_len)?;
            for chunk in run_data[..runs_len].chunks_exact(FormatRun::SIZE) {
                let run = FormatRun {
                    char_index: binary::read_u16_le(chunk, 0)?,
                    font_index: binary::read_u16_le(chunk, 2)?,
                };
                if run.char_index as usize >= text_len && text_len > 0 {
                    break;
                }
                runs.push(run);
            }
        }

        Ok(Self {
            options,
            orientation,
            text,
            runs,
        })
    }

    /// Write the TXO record followed by its `CONTINUE` records.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let text_len = biff8_string_length(sid::TXO, &self.text)?;
        let runs = self.runs_with_terminator(text_len);
        let runs_len = u16::try_from(runs.len() * FormatRun::SIZE)
            .map_err(|_| Error::invalid_record(sid::TXO, format!("{} formatting runs", runs.len())))?;

        let mut header = Vec::with_capacity(Self::HEADER_SIZE);
        header.extend_from_slice(&self.options.to_le_bytes());
        header.extend_from_slice(&self.orientation.to_le_bytes());
        header.extend_from_slice(&[0u8; 6]);
        header.extend_from_slice(&text_len.to_le_bytes());
        header.extend_from_slice(&runs_len.to_le_bytes());
        header.extend_from_slice(&[0u8; 4]);
        write_record(writer, sid::TXO, &header)?;

        if self.text.is_empty() {
            return Ok(());
        }

        let (is_16bit, bytes) = binary::encode_biff8_chars(&self.text);
        let unit_size = if is_16bit { 2 } else { 1 };
        let per_record = (MAX_RECORD_DATA - 1) / unit_size * unit_size;
        for chunk in bytes.chunks(per_record) {
            write_record_header(writer, sid::CONTINUE, (chunk.len() + 1) as u16)?;
            writer.write_all(&[is_16bit as u8])?;
            writer.write_all(chunk)?;
        }

        let mut run_data = Vec::with_capacity(runs.len() * FormatRun::SIZE);
        for run in &runs {
            run_data.extend_from_slice(&run.char_index.to_le_bytes());
            run_data.extend_from_slice(&run.font_index.to_le_bytes());
            run_data.extend_from_slice(&[0u8; 4]);
        }
        write_record(writer, sid::CONTINUE, &run_data)
    }

    fn runs_with_terminator(&self, text_len: u16) -> Vec<FormatRun> {
        if text_len == 0 {
            return Vec::new();
        }
        let mut runs: Vec<FormatRun> = self
            .runs
            .iter()
            .copied()
            .filter(|run| run.char_index < text_len)
            .collect();
        if runs.first().is_none_or(|run| run.char_index != 0) {
            runs.insert(0, FormatRun::default());
        }
        runs.push(FormatRun {
            char_index: text_len,
            font_index: 0,
        });
        runs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ole::xls::records::{Record, RecordIter};
    use std::io::Cursor;

    fn write_and_split(txo: &TextObjectRecord) -> Vec<Record> {
        let mut out = Vec::new();
        txo.write(&mut out).unwrap();
        RecordIter::new(Cursor::new(out))
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    fn reparse(records: &[Record]) -> TextObjectRecord {
        let continues: Vec<&[u8]> = records[1..].iter().map(|r| r.data.as_slice()).collect();
        TextObjectRecord::parse(&records[0].data, &continues).unwrap()
    }

    #[test]
    fn test_default_options() {
        let txo = TextObjectRecord::default();
        assert_eq!(txo.options, 0x0212);
        assert_eq!(txo.horizontal_alignment(), HorizontalAlignment::Left);
        assert_eq!(txo.vertical_alignment(), VerticalAlignment::Top);
        assert!(txo.is_text_locked());
    }

    #[test]
    fn test_empty_text_has_no_continue() {
        let records = write_and_split(&TextObjectRecord::default());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].data.len(), TextObjectRecord::HEADER_SIZE);
        assert_eq!(reparse(&records), TextObjectRecord::default());
    }

    #[test]
    fn test_text_and_runs_layout() {
        let txo = TextObjectRecord {
            text: "Hello, World!".to_string(),
            ..Default::default()
        };
        let records = write_and_split(&txo);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].sid(), sid::TXO);
        assert_eq!(&records[0].data[10..14], &[13, 0, 16, 0]);
        assert_eq!(records[1].data[0], 0);
        assert_eq!(&records[1].data[1..], b"Hello, World!");
        assert_eq!(records[2].data.len(), 16);
        assert_eq!(&records[2].data[8..10], &[13, 0]);

        let parsed = reparse(&records);
        assert_eq!(parsed.text, "Hello, World!");
        assert_eq!(parsed.runs, vec![FormatRun::default()]);
    }

    #[test]
    fn test_wide_text() {
        let txo = TextObjectRecord {
            text: "\u{6CE8}\u{91CA}".to_string(),
            ..Default::default()
        };
        let records = write_and_split(&txo);
        assert_eq!(records[1].data, vec![1, 0xE8, 0x6C, 0xCA, 0x91]);
        assert_eq!(reparse(&records).text, txo.text);
    }

    #[test]
    fn test_long_text_spans_continues() {
        let txo = TextObjectRecord {
            text: "x".repeat(MAX_RECORD_DATA * 2),
            ..Default::default()
        };
        let records = write_and_split(&txo);
        // header, three text pieces, runs
        assert_eq!(records.len(), 5);
        assert!(records.iter().all(|r| r.data.len() <= MAX_RECORD_DATA));
        assert_eq!(reparse(&records).text, txo.text);
    }

    #[test]
    fn test_text_length_limit() {
        let longest = TextObjectRecord {
            text: "x".repeat(u16::MAX as usize),
            ..Default::default()
        };
        assert_eq!(reparse(&write_and_split(&longest)).text.len(), u16::MAX as usize);

        let too_long = TextObjectRecord {
            text: "x".repeat(u16::MAX as usize + 1),
            ..Default::default()
        };
        let mut out = Vec::new();
        assert!(matches!(
            too_long.write(&mut out),
            Err(Error::InvalidRecord { record_type: sid::TXO, .. })
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn test_missing_text_continue_fails() {
        let records = write_and_split(&TextObjectRecord {
            text: "abc".to_string(),
            ..Default::default()
        });
        assert!(TextObjectRecord::parse(&records[0].data, &[]).is_err());
    }

    #[test]
    fn test_alignment_setters() {
        let mut txo = TextObjectRecord::default();
        txo.set_horizontal_alignment(HorizontalAlignment::Right);
        txo.set_vertical_alignment(VerticalAlignment::Bottom);
        assert_eq!(txo.horizontal_alignment(), HorizontalAlignment::Right);
        assert_eq!(txo.vertical_alignment(), VerticalAlignment::Bottom);
        assert!(txo.is_text_locked());
    }
}
