//! Escher shape property table (`Opt` record).
//!
//! Properties control shape appearance: text margins, fill, line, geometry.
//! Based on MS-ODRAW specification section 2.3.
//!
//! # Complex Properties
//!
//! Properties can be simple (4-byte value) or complex (variable-length data).
//! The record body is the list of 6-byte property headers followed by the
//! complex data of each complex property, in header order. Array properties
//! are complex properties whose data starts with a 6-byte array header.

use super::types::record_type;
use crate::common::binary::{self, BinaryResult};
use crate::common::error::{Error, Result};

const IS_COMPLEX: u16 = 0x8000;
const IS_BLIP: u16 = 0x4000;
const PROPERTY_ID_MASK: u16 = 0x3FFF;

/// Property numbers used by the spreadsheet drawing layer.
pub mod prop_id {
    pub const TEXT_ID: u16 = 0x0080;
    pub const TEXT_LEFT: u16 = 0x0081;
    pub const TEXT_TOP: u16 = 0x0082;
    pub const TEXT_RIGHT: u16 = 0x0083;
    pub const TEXT_BOTTOM: u16 = 0x0084;
    pub const WRAP_TEXT: u16 = 0x0085;
    pub const ANCHOR_TEXT: u16 = 0x0087;
    pub const SIZE_TEXT_TO_FIT_SHAPE: u16 = 0x00BF;
    pub const BLIP_TO_DISPLAY: u16 = 0x0104;
    pub const GEOMETRY_RIGHT: u16 = 0x0142;
    pub const GEOMETRY_BOTTOM: u16 = 0x0143;
    pub const SHAPE_PATH: u16 = 0x0144;
    pub const VERTICES: u16 = 0x0145;
    pub const SEGMENT_INFO: u16 = 0x0146;
    pub const FILL_OK: u16 = 0x017F;
    pub const FILL_COLOR: u16 = 0x0181;
    pub const FILL_BACK_COLOR: u16 = 0x0183;
    pub const NO_FILL_HIT_TEST: u16 = 0x01BF;
    pub const LINE_COLOR: u16 = 0x01C0;
    pub const LINE_WIDTH: u16 = 0x01CB;
    pub const LINE_DASHING: u16 = 0x01CE;
    pub const NO_LINE_DRAW_DASH: u16 = 0x01FF;
    pub const SHADOW_COLOR: u16 = 0x0201;
    pub const SHADOW_OBSCURED: u16 = 0x023F;
    pub const GROUP_NAME: u16 = 0x0380;
    pub const GROUP_PRINT: u16 = 0x03BF;
}

/// Escher property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscherPropertyValue {
    Simple(u32),
    Complex(Vec<u8>),
}

/// One entry of a property table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscherProperty {
    /// Property number (the low 14 bits of the header id)
    pub id: u16,
    /// The value is a BLIP index rather than a plain number
    pub is_blip_id: bool,
    pub value: EscherPropertyValue,
}

impl EscherProperty {
    pub fn simple(id: u16, value: u32) -> Self {
        Self {
            id: id & PROPERTY_ID_MASK,
            is_blip_id: false,
            value: EscherPropertyValue::Simple(value),
        }
    }

    pub fn blip(id: u16, value: u32) -> Self {
        Self {
            is_blip_id: true,
            ..Self::simple(id, value)
        }
    }

    pub fn complex(id: u16, data: Vec<u8>) -> Self {
        Self {
            id: id & PROPERTY_ID_MASK,
            is_blip_id: false,
            value: EscherPropertyValue::Complex(data),
        }
    }

    #[inline]
    pub fn is_complex(&self) -> bool {
        matches!(self.value, EscherPropertyValue::Complex(_))
    }

    /// Simple value, or `None` for complex properties.
    pub fn simple_value(&self) -> Option<u32> {
        match self.value {
            EscherPropertyValue::Simple(value) => Some(value),
            EscherPropertyValue::Complex(_) => None,
        }
    }

    pub fn complex_data(&self) -> Option<&[u8]> {
        match &self.value {
            EscherPropertyValue::Complex(data) => Some(data),
            EscherPropertyValue::Simple(_) => None,
        }
    }

    fn header_id(&self) -> u16 {
        let mut id = self.id;
        if self.is_blip_id {
            id |= IS_BLIP;
        }
        if self.is_complex() {
            id |= IS_COMPLEX;
        }
        id
    }
}

/// Shape property table (`Opt` record body).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EscherOpt {
    properties: Vec<EscherProperty>,
}

impl EscherOpt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an `Opt` body holding `count` properties (the record instance).
    pub fn parse(data: &[u8], count: usize) -> BinaryResult<Self> {
        let mut properties = Vec::with_capacity(count);
        let mut complex_offset = count * 6;

        for index in 0..count {
            let offset = index * 6;
            let id_raw = binary::read_u16_le(data, offset)?;
            let value = binary::read_u32_le(data, offset + 2)?;

            let id = id_raw & PROPERTY_ID_MASK;
            let is_blip_id = id_raw & IS_BLIP != 0;
            let value = if id_raw & IS_COMPLEX != 0 {
                let bytes = binary::read_bytes(data, complex_offset, value as usize)?;
                complex_offset += bytes.len();
                EscherPropertyValue::Complex(bytes.to_vec())
            } else {
                EscherPropertyValue::Simple(value)
            };

            properties.push(EscherProperty {
                id,
                is_blip_id,
                value,
            });
        }

        Ok(Self { properties })
    }

    /// Number of properties, written as the record instance.
    #[inline]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EscherProperty> {
        self.properties.iter()
    }

    pub fn lookup(&self, id: u16) -> Option<&EscherProperty> {
        self.properties.iter().find(|p| p.id == id)
    }

    pub fn simple_value(&self, id: u16) -> Option<u32> {
        self.lookup(id).and_then(EscherProperty::simple_value)
    }

    /// Insert or replace a property, keeping the table sorted by number.
    pub fn set(&mut self, property: EscherProperty) {
        match self.properties.iter_mut().find(|p| p.id == property.id) {
            Some(existing) => *existing = property,
            None => {
                self.properties.push(property);
                self.properties.sort_by_key(|p| p.id);
            },
        }
    }

    pub fn remove(&mut self, id: u16) -> Option<EscherProperty> {
        let index = self.properties.iter().position(|p| p.id == id)?;
        Some(self.properties.remove(index))
    }

    pub fn size(&self) -> usize {
        self.properties
            .iter()
            .map(|p| 6 + p.complex_data().map_or(0, <[u8]>::len))
            .sum()
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        for property in &self.properties {
            out.extend_from_slice(&property.header_id().to_le_bytes());
            let value = match &property.value {
                EscherPropertyValue::Simple(value) => *value,
                EscherPropertyValue::Complex(data) => data.len() as u32,
            };
            out.extend_from_slice(&value.to_le_bytes());
        }
        for property in &self.properties {
            if let Some(data) = property.complex_data() {
                out.extend_from_slice(data);
            }
        }
    }
}

/// Array property payload: 6-byte header followed by fixed-size elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscherArrayProperty {
    raw_element_size: u16,
    elements: Vec<Vec<u8>>,
}

impl EscherArrayProperty {
    /// Element size marker for 4-byte points stored as two 16-bit halves.
    pub const POINT_ELEMENT_SIZE: u16 = 0xFFF0;

    pub fn new(raw_element_size: u16) -> Self {
        Self {
            raw_element_size,
            elements: Vec::new(),
        }
    }

    pub fn parse(data: &[u8]) -> BinaryResult<Self> {
        let count = binary::read_u16_le(data, 0)? as usize;
        let raw_element_size = binary::read_u16_le(data, 4)?;
        let element_size = Self::decode_element_size(raw_element_size);

        let elements = (0..count)
            .map(|i| binary::read_bytes(data, 6 + i * element_size, element_size).map(<[u8]>::to_vec))
            .collect::<BinaryResult<Vec<_>>>()?;

        Ok(Self {
            raw_element_size,
            elements,
        })
    }

    fn decode_element_size(raw: u16) -> usize {
        let size = raw as i16;
        if size < 0 {
            ((-size) >> 2) as usize
        } else {
            size as usize
        }
    }

    /// Append an element. The array header counts elements in 16 bits, so
    /// the 65536th element is rejected.
    pub fn push(&mut self, element: Vec<u8>) -> Result<()> {
        if self.elements.len() >= u16::MAX as usize {
            return Err(Error::invalid_record(
                record_type::OPT,
                format!("array property holds at most {} elements", u16::MAX),
            ));
        }
        self.elements.push(element);
        Ok(())
    }

    pub fn elements(&self) -> impl Iterator<Item = &[u8]> {
        self.elements.iter().map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        // bounded by `push` and `parse`
        let count = self.elements.len() as u16;
        let mut out = Vec::with_capacity(6 + self.elements.iter().map(Vec::len).sum::<usize>());
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&self.raw_element_size.to_le_bytes());
        for element in &self.elements {
            out.extend_from_slice(element);
        }
        out
    }
}
