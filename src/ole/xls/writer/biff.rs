//! BIFF record writer for XLS files
//!
//! This module provides functions to generate BIFF8 (Binary Interchange File Format)
//! records for writing XLS files. BIFF8 is the format used by Excel 97-2003.
//!
//! # BIFF Record Structure
//!
//! Each BIFF record consists of:
//! - Record type (2 bytes) - identifies the record
//! - Record length (2 bytes) - length of data in bytes
//! - Record data (variable length, at most 8224 bytes)
//!
//! # References
//!
//! Based on Microsoft's "[MS-XLS]: Excel Binary File Format (.xls) Structure" specification
//! and Apache POI's BIFF record generation.

use super::super::records::{BofRecord, MAX_RECORD_DATA, sid};
use crate::common::binary::{biff8_char_count, encode_biff8_chars};
use crate::common::error::{Error, Result};
use std::io::Write;

/// Write a BIFF record header
///
/// # Arguments
///
/// * `writer` - Output writer
/// * `record_type` - BIFF record type (e.g., 0x0809 for BOF)
/// * `data_len` - Length of record data in bytes
#[inline]
pub(crate) fn write_record_header<W: Write>(
    writer: &mut W,
    record_type: u16,
    data_len: u16,
) -> Result<()> {
    writer.write_all(&record_type.to_le_bytes())?;
    writer.write_all(&data_len.to_le_bytes())?;
    Ok(())
}

/// Write a record body, spilling anything past the first 8224 bytes into
/// `CONTINUE` records.
pub(crate) fn write_record<W: Write>(writer: &mut W, record_type: u16, data: &[u8]) -> Result<()> {
    let mut chunks = data.chunks(MAX_RECORD_DATA);
    let first = chunks.next().unwrap_or(&[]);
    write_record_header(writer, record_type, first.len() as u16)?;
    writer.write_all(first)?;

    for chunk in chunks {
        write_record_header(writer, sid::CONTINUE, chunk.len() as u16)?;
        writer.write_all(chunk)?;
    }
    Ok(())
}

/// Size of a BIFF8 unicode string with a 16-bit character count.
pub(crate) fn unicode_string_size(value: &str) -> usize {
    let (_, bytes) = encode_biff8_chars(value);
    3 + bytes.len()
}

/// Character count of a BIFF8 string stored in record `record_type`.
///
/// The count field is 16 bits wide; longer strings are rejected.
pub(crate) fn biff8_string_length(record_type: u16, value: &str) -> Result<u16> {
    let count = biff8_char_count(value);
    u16::try_from(count).map_err(|_| {
        Error::invalid_record(
            record_type,
            format!("string of {} characters exceeds {}", count, u16::MAX),
        )
    })
}

pub(crate) fn write_unicode_string_biff8<W: Write>(
    writer: &mut W,
    record_type: u16,
    value: &str,
) -> Result<()> {
    let char_count = biff8_string_length(record_type, value)?;
    writer.write_all(&char_count.to_le_bytes())?;

    let (is_16bit, bytes) = encode_biff8_chars(value);
    writer.write_all(&[if is_16bit { 0x01 } else { 0x00 }])?;
    writer.write_all(&bytes)?;

    Ok(())
}

/// Write BOF (Beginning of File) record
///
/// Record type: 0x0809
///
/// # Arguments
///
/// * `writer` - Output writer
/// * `substream_type` - Type of substream (0x0005 = Workbook, 0x0010 = Worksheet)
pub fn write_bof<W: Write>(writer: &mut W, substream_type: u16) -> Result<()> {
    write_record(writer, sid::BOF, &BofRecord::new(substream_type).to_bytes())
}

/// Write EOF (End of File) record
///
/// Record type: 0x000A
pub fn write_eof<W: Write>(writer: &mut W) -> Result<()> {
    write_record_header(writer, sid::EOF, 0)
}
