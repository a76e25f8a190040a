//! Escher record parser.
//!
//! Decodes a byte stream into an [`EscherTree`]. Atoms the drawing layer
//! understands are decoded into typed payloads; everything else (and any
//! atom whose body does not fit its layout) is kept as raw bytes so it
//! serializes back unchanged.

use super::atoms::{EscherClientAnchor, EscherDg, EscherDgg, EscherRect, EscherSp};
use super::properties::EscherOpt;
use super::record::{EscherAtom, EscherNode, EscherRecordHeader, EscherTree, RecordBody, RecordId};
use super::types::record_type;
use crate::common::error::{Error, Result};
use crate::log::warn;
use zerocopy::FromBytes;

/// Escher parser over a borrowed byte stream.
pub struct EscherParser<'data> {
    data: &'data [u8],
}

impl<'data> EscherParser<'data> {
    /// Create a new Escher parser from drawing data.
    #[inline]
    pub fn new(data: &'data [u8]) -> Self {
        Self { data }
    }

    /// Parse every top-level record into `tree`, returning their ids in order.
    pub fn parse_into(&self, tree: &mut EscherTree) -> Result<Vec<RecordId>> {
        let mut roots = Vec::new();
        let mut offset = 0;
        while offset + EscherRecordHeader::SIZE <= self.data.len() {
            let (id, consumed) = self.parse_record(tree, offset, self.data.len())?;
            roots.push(id);
            offset += consumed;
        }
        Ok(roots)
    }

    fn parse_record(
        &self,
        tree: &mut EscherTree,
        offset: usize,
        end: usize,
    ) -> Result<(RecordId, usize)> {
        let header_end = offset + EscherRecordHeader::SIZE;
        let header = self
            .data
            .get(offset..header_end)
            .and_then(|bytes| EscherRecordHeader::read_from_bytes(bytes).ok())
            .ok_or_else(|| {
                Error::MalformedDrawing("not enough data for Escher record header".to_string())
            })?;

        let rec_type = header.record_type.get();
        let length = header.length.get() as usize;
        let mut body_end = header_end + length;

        if body_end > end {
            if !header.is_container() {
                return Err(Error::invalid_record(
                    rec_type,
                    format!(
                        "record data extends beyond bounds: offset={}, length={}, available={}",
                        offset,
                        length,
                        end - header_end
                    ),
                ));
            }
            // Allow partial reads for container records
            warn!(
                "Escher container 0x{:04X} truncated from {} to {} bytes",
                rec_type,
                length,
                end - header_end
            );
            body_end = end;
        }

        let body = if header.is_container() {
            let mut children = Vec::new();
            let mut child_offset = header_end;
            while child_offset + EscherRecordHeader::SIZE <= body_end {
                let (child, consumed) = self.parse_record(tree, child_offset, body_end)?;
                children.push(child);
                child_offset += consumed;
            }
            RecordBody::Container(children)
        } else {
            let instance = header.options.get() >> 4;
            RecordBody::Atom(decode_atom(rec_type, instance, &self.data[header_end..body_end]))
        };

        let id = tree.insert(EscherNode {
            record_type: rec_type,
            options: header.options.get(),
            body,
        });
        Ok((id, body_end - offset))
    }
}

fn decode_atom(rec_type: u16, instance: u16, body: &[u8]) -> EscherAtom {
    let decoded = match rec_type {
        record_type::SP => EscherSp::parse(body).map(EscherAtom::Sp),
        record_type::SPGR => EscherRect::parse(body).map(EscherAtom::Spgr),
        record_type::CHILD_ANCHOR => EscherRect::parse(body).map(EscherAtom::ChildAnchor),
        record_type::CLIENT_ANCHOR if body.len() == EscherClientAnchor::SIZE => {
            EscherClientAnchor::parse(body).map(EscherAtom::ClientAnchor)
        },
        record_type::DG => EscherDg::parse(body).map(EscherAtom::Dg),
        record_type::DGG => EscherDgg::parse(body).map(EscherAtom::Dgg),
        record_type::OPT => EscherOpt::parse(body, instance as usize).map(EscherAtom::Opt),
        _ => return EscherAtom::Raw(body.to_vec()),
    };

    decoded.unwrap_or_else(|_e| {
        warn!("keeping Escher atom 0x{:04X} raw: {}", rec_type, _e);
        EscherAtom::Raw(body.to_vec())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_builds_container_tree() {
        let data = vec![
            0x0F, 0x00, 0x04, 0xF0, 0x18, 0x00, 0x00, 0x00, // SpContainer, 24 bytes
            0xA2, 0x0C, 0x0A, 0xF0, 0x08, 0x00, 0x00, 0x00, // Sp, instance 202
            0x01, 0x04, 0x00, 0x00, 0x00, 0x0A, 0x00, 0x00, // spid 1025, flags 0x0A00
            0x00, 0x00, 0x11, 0xF0, 0x00, 0x00, 0x00, 0x00, // ClientData
        ];

        let mut tree = EscherTree::new();
        let roots = EscherParser::new(&data).parse_into(&mut tree).unwrap();
        assert_eq!(roots.len(), 1);

        let children = tree.children(roots[0]);
        assert_eq!(children.len(), 2);
        assert_eq!(tree.sp(children[0]).unwrap().shape_id, 1025);
        assert_eq!(tree.node(children[0]).unwrap().instance(), 202);
        assert_eq!(tree.record_type(children[1]), Some(record_type::CLIENT_DATA));
    }

    #[test]
    fn test_atom_overrun_is_an_error() {
        let data = vec![0x02, 0x00, 0x0A, 0xF0, 0x08, 0x00, 0x00, 0x00, 0x01, 0x02];
        let mut tree = EscherTree::new();
        assert!(EscherParser::new(&data).parse_into(&mut tree).is_err());
    }

    #[test]
    fn test_malformed_sp_stays_raw() {
        let data = vec![0x02, 0x00, 0x0A, 0xF0, 0x02, 0x00, 0x00, 0x00, 0x01, 0x02];
        let mut tree = EscherTree::new();
        let roots = EscherParser::new(&data).parse_into(&mut tree).unwrap();
        assert!(tree.sp(roots[0]).is_none());
        assert_eq!(
            tree.node(roots[0]).unwrap().body,
            RecordBody::Atom(EscherAtom::Raw(vec![0x01, 0x02]))
        );
    }
}
