//! Escher record serialization.
//!
//! Container lengths are computed up front so records are written in a
//! single pass straight into the output buffer. The optional observer is
//! told where every record ends, which is what the sheet drawing stream
//! needs to cut its `MSODRAWING` records after each `ClientData` and
//! `ClientTextbox` record.

use super::record::{EscherRecordHeader, EscherTree, RecordBody, RecordId};
use zerocopy::IntoBytes;

impl EscherTree {
    /// Serialized size of a record including its header.
    pub fn record_size(&self, id: RecordId) -> usize {
        EscherRecordHeader::SIZE
            + match self.node(id).map(|n| &n.body) {
                Some(RecordBody::Container(children)) => {
                    children.iter().map(|&c| self.record_size(c)).sum()
                },
                Some(RecordBody::Atom(atom)) => atom.size(),
                None => 0,
            }
    }

    /// Serialize a record subtree.
    pub fn serialize(&self, id: RecordId) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.record_size(id));
        self.serialize_with(id, &mut out, &mut |_, _| {});
        out
    }

    /// Serialize a record subtree, reporting `(record, end offset in out)`
    /// after each record has been fully written.
    pub fn serialize_with(
        &self,
        id: RecordId,
        out: &mut Vec<u8>,
        on_record_end: &mut impl FnMut(RecordId, usize),
    ) {
        let Some(node) = self.node(id) else {
            return;
        };

        let length = self.record_size(id) - EscherRecordHeader::SIZE;
        let header = EscherRecordHeader::new(node.header_options(), node.record_type, length as u32);
        out.extend_from_slice(header.as_bytes());

        match &node.body {
            RecordBody::Container(children) => {
                for &child in children {
                    self.serialize_with(child, out, on_record_end);
                }
            },
            RecordBody::Atom(atom) => atom.write(out),
        }

        on_record_end(id, out.len());
    }
}
