//! Binary data parsing utilities shared across the record codecs.
//!
//! This module provides common functions for reading binary data in little-endian format
//! and parsing the string encodings (UTF-16LE, compressed Latin-1) used by BIFF8 records.

use zerocopy::{FromBytes, LE, U16, U32};

/// Binary parsing error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinaryError {
    /// Not enough data to read the requested type
    InsufficientData { expected: usize, available: usize },
    /// Failed to parse the data
    ParseError(String),
}

impl std::fmt::Display for BinaryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinaryError::InsufficientData {
                expected,
                available,
            } => {
                write!(
                    f,
                    "Insufficient data: expected {}, got {}",
                    expected, available
                )
            },
            BinaryError::ParseError(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for BinaryError {}

/// Result type for binary operations
pub type BinaryResult<T> = Result<T, BinaryError>;

/// Ensure `width` bytes are available at `offset`.
#[inline]
pub fn check_len(data: &[u8], offset: usize, width: usize) -> BinaryResult<()> {
    if offset + width > data.len() {
        return Err(BinaryError::InsufficientData {
            expected: offset + width,
            available: data.len(),
        });
    }
    Ok(())
}

/// Read a little-endian u16 from a byte slice at the given offset.
///
/// # Examples
///
/// ```
/// use xls_drawing::common::binary::read_u16_le;
/// let data = [0x34, 0x12, 0x78, 0x56];
/// assert_eq!(read_u16_le(&data, 0).unwrap(), 0x1234);
/// assert_eq!(read_u16_le(&data, 2).unwrap(), 0x5678);
/// ```
#[inline]
pub fn read_u16_le(data: &[u8], offset: usize) -> BinaryResult<u16> {
    check_len(data, offset, 2)?;
    U16::<LE>::read_from_bytes(&data[offset..offset + 2])
        .map(|v| v.get())
        .map_err(|_| BinaryError::ParseError("Failed to read u16".to_string()))
}

/// Read a little-endian u32 from a byte slice at the given offset.
///
/// # Examples
///
/// ```
/// use xls_drawing::common::binary::read_u32_le;
/// let data = [0x78, 0x56, 0x34, 0x12];
/// assert_eq!(read_u32_le(&data, 0).unwrap(), 0x12345678);
/// ```
#[inline]
pub fn read_u32_le(data: &[u8], offset: usize) -> BinaryResult<u32> {
    check_len(data, offset, 4)?;
    U32::<LE>::read_from_bytes(&data[offset..offset + 4])
        .map(|v| v.get())
        .map_err(|_| BinaryError::ParseError("Failed to read u32".to_string()))
}

/// Borrow `len` bytes starting at `offset`.
#[inline]
pub fn read_bytes(data: &[u8], offset: usize, len: usize) -> BinaryResult<&[u8]> {
    check_len(data, offset, len)?;
    Ok(&data[offset..offset + len])
}

/// Parse UTF-16LE string with specified length (in characters, not bytes).
///
/// Based on Apache POI's StringUtil.getFromUnicodeLE(byte[], int, int).
///
/// # Examples
///
/// ```
/// use xls_drawing::common::binary::parse_utf16le_string_len;
/// let data = vec![0x48, 0x00, 0x65, 0x00, 0x6C, 0x00, 0x6C, 0x00, 0x6F, 0x00];
/// assert_eq!(parse_utf16le_string_len(&data, 0, 5).unwrap(), "Hello");
/// assert_eq!(parse_utf16le_string_len(&data, 0, 3).unwrap(), "Hel");
/// ```
pub fn parse_utf16le_string_len(
    data: &[u8],
    offset: usize,
    char_count: usize,
) -> BinaryResult<String> {
    let bytes = read_bytes(data, offset, char_count * 2)?;
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    Ok(String::from_utf16_lossy(&units))
}

/// Parse a BIFF8 "compressed" string: one byte per character, high byte zero.
///
/// # Examples
///
/// ```
/// use xls_drawing::common::binary::parse_compressed_string_len;
/// let data = b"Hello World";
/// assert_eq!(parse_compressed_string_len(data, 0, 5).unwrap(), "Hello");
/// ```
pub fn parse_compressed_string_len(
    data: &[u8],
    offset: usize,
    length: usize,
) -> BinaryResult<String> {
    Ok(read_bytes(data, offset, length)?
        .iter()
        .map(|&b| b as char)
        .collect())
}

/// Whether the string needs the 16-bit BIFF8 encoding.
#[inline]
pub fn has_multibyte_char(s: &str) -> bool {
    s.chars().any(|c| c as u32 > 0xFF)
}

/// Encode a string into its BIFF8 character bytes, compressed when possible.
///
/// Returns `(is_16bit, bytes)`.
pub fn encode_biff8_chars(s: &str) -> (bool, Vec<u8>) {
    if has_multibyte_char(s) {
        let bytes = s.encode_utf16().flat_map(|unit| unit.to_le_bytes()).collect();
        (true, bytes)
    } else {
        (false, s.chars().map(|c| c as u8).collect())
    }
}

/// Number of BIFF8 characters (UTF-16 code units) in a string.
#[inline]
pub fn biff8_char_count(s: &str) -> usize {
    if has_multibyte_char(s) {
        s.encode_utf16().count()
    } else {
        s.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_reads_report_sizes() {
        let data = [0x01, 0x02, 0x03];
        assert_eq!(
            read_u32_le(&data, 0),
            Err(BinaryError::InsufficientData {
                expected: 4,
                available: 3
            })
        );
        assert_eq!(read_u16_le(&data, 1).unwrap(), 0x0302);
    }

    #[test]
    fn test_biff8_char_encoding() {
        let (wide, bytes) = encode_biff8_chars("abc");
        assert!(!wide);
        assert_eq!(bytes, b"abc");

        let (wide, bytes) = encode_biff8_chars("ж");
        assert!(wide);
        assert_eq!(bytes, vec![0x36, 0x04]);
        assert_eq!(parse_utf16le_string_len(&bytes, 0, 1).unwrap(), "ж");
    }

    #[test]
    fn test_compressed_string_is_latin1() {
        let data = [0x63, 0xE9];
        assert_eq!(parse_compressed_string_len(&data, 0, 2).unwrap(), "cé");
        assert_eq!(biff8_char_count("cé"), 2);
    }
}
