//! BIFF record parsing for XLS files
//!
//! This module handles the framing of BIFF8 (Binary Interchange File Format)
//! records: a 4-byte header (type + length) followed by at most
//! [`MAX_RECORD_DATA`] bytes of data. Bodies longer than that continue in
//! `CONTINUE` records.

use std::io::{Read, Seek, SeekFrom};

use crate::common::binary;
use crate::common::error::{Error, Result};

/// Largest body a single BIFF8 record may carry.
pub const MAX_RECORD_DATA: usize = 8224;

/// Record type ids used by the drawing layer.
pub mod sid {
    pub const NOTE: u16 = 0x001C;
    pub const EOF: u16 = 0x000A;
    pub const CONTINUE: u16 = 0x003C;
    pub const OBJ: u16 = 0x005D;
    pub const MSODRAWINGGROUP: u16 = 0x00EB;
    pub const MSODRAWING: u16 = 0x00EC;
    pub const TXO: u16 = 0x01B6;
    pub const BOF: u16 = 0x0809;
}

/// BIFF record header (4 bytes: type + length)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHeader {
    pub record_type: u16,
    pub data_len: u16,
}

impl RecordHeader {
    /// Parse record header from stream
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        Ok(RecordHeader {
            record_type: binary::read_u16_le(&buf, 0)?,
            data_len: binary::read_u16_le(&buf, 2)?,
        })
    }
}

/// A BIFF record with header and data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub header: RecordHeader,
    pub data: Vec<u8>,
}

impl Record {
    /// Read a complete record from the stream
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let header = RecordHeader::read(reader)?;
        let mut data = vec![0u8; header.data_len as usize];
        reader.read_exact(&mut data)?;
        Ok(Record { header, data })
    }

    #[inline]
    pub fn sid(&self) -> u16 {
        self.header.record_type
    }
}

/// Iterator over BIFF records in a stream
pub struct RecordIter<R> {
    reader: R,
    stream_len: u64,
    current_pos: u64,
}

impl<R: Read + Seek> RecordIter<R> {
    pub fn new(mut reader: R) -> Result<Self> {
        let stream_len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        Ok(RecordIter {
            reader,
            stream_len,
            current_pos: 0,
        })
    }
}

impl<R: Read + Seek> Iterator for RecordIter<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_pos >= self.stream_len {
            return None;
        }

        match Record::read(&mut self.reader) {
            Ok(record) => {
                self.current_pos += 4 + record.header.data_len as u64;
                Some(Ok(record))
            },
            Err(e) => {
                // A broken header ends the stream.
                self.current_pos = self.stream_len;
                Some(Err(e))
            },
        }
    }
}

/// BOF stream types
pub mod bof_type {
    pub const WORKBOOK_GLOBALS: u16 = 0x0005;
    pub const WORKSHEET: u16 = 0x0010;
}

/// BOF (Beginning of File) record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BofRecord {
    pub version: u16,
    pub stream_type: u16,
}

impl BofRecord {
    pub const BIFF8: u16 = 0x0600;

    pub fn new(stream_type: u16) -> Self {
        Self {
            version: Self::BIFF8,
            stream_type,
        }
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        let version = binary::read_u16_le(data, 0)?;
        if version != Self::BIFF8 {
            return Err(Error::invalid_record(
                sid::BOF,
                format!("unsupported BIFF version 0x{:04X}", version),
            ));
        }
        Ok(Self {
            version,
            stream_type: binary::read_u16_le(data, 2)?,
        })
    }

    /// BIFF8 BOF body (16 bytes): version, type, build id/year, history and lowest version.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16);
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.stream_type.to_le_bytes());
        out.extend_from_slice(&0x0DBBu16.to_le_bytes());
        out.extend_from_slice(&0x07CCu16.to_le_bytes());
        out.extend_from_slice(&0x0000_0041u32.to_le_bytes());
        out.extend_from_slice(&0x0000_0006u32.to_le_bytes());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_record_iter_reads_headers() {
        let data = vec![0x0A, 0x00, 0x00, 0x00, 0x3C, 0x00, 0x02, 0x00, 0xAB, 0xCD];
        let records: Vec<_> = RecordIter::new(Cursor::new(data))
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sid(), sid::EOF);
        assert_eq!(records[1].data, vec![0xAB, 0xCD]);
    }

    #[test]
    fn test_truncated_record_stops_iteration() {
        let data = vec![0x3C, 0x00, 0x08, 0x00, 0x01];
        let mut iter = RecordIter::new(Cursor::new(data)).unwrap();
        assert!(iter.next().unwrap().is_err());
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_bof_round_trip() {
        let bof = BofRecord::new(bof_type::WORKSHEET);
        assert_eq!(BofRecord::parse(&bof.to_bytes()).unwrap(), bof);
        assert!(BofRecord::parse(&[0x00, 0x05, 0x10, 0x00]).is_err());
    }
}
