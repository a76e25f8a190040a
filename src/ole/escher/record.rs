//! Owned Escher record tree.
//!
//! Records live in an arena and are addressed by [`RecordId`]. Containers
//! hold the ordered ids of their children, so a shape can keep a stable
//! handle on its records while siblings are inserted or removed around it.
//!
//! # Format
//!
//! Escher records have an 8-byte header:
//! - Bytes 0-1: Version (4 bits) | Instance (12 bits)
//! - Bytes 2-3: Record Type
//! - Bytes 4-7: Record Length (32-bit)

use super::atoms::{EscherClientAnchor, EscherDg, EscherDgg, EscherRect, EscherSp};
use super::properties::EscherOpt;
use super::types::{EscherRecordType, record_type};
use crate::common::error::{Error, Result};
use zerocopy::byteorder::{LE, U16, U32};
use zerocopy_derive::*;

/// Escher record header (8 bytes) - zerocopy compatible
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct EscherRecordHeader {
    pub options: U16<LE>,
    pub record_type: U16<LE>,
    pub length: U32<LE>,
}

impl EscherRecordHeader {
    pub const SIZE: usize = 8;

    pub fn new(options: u16, record_type: u16, length: u32) -> Self {
        Self {
            options: U16::new(options),
            record_type: U16::new(record_type),
            length: U32::new(length),
        }
    }

    #[inline]
    pub fn version(&self) -> u16 {
        self.options.get() & 0x000F
    }

    #[inline]
    pub fn is_container(&self) -> bool {
        self.version() == 0x000F
    }
}

/// Pack a version and instance into a header options word.
#[inline]
pub const fn options(version: u16, instance: u16) -> u16 {
    (version & 0x000F) | ((instance & 0x0FFF) << 4)
}

/// Handle of a record in an [`EscherTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(usize);

/// Typed atom payloads. Atoms the drawing layer never interprets stay raw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscherAtom {
    Sp(EscherSp),
    Spgr(EscherRect),
    ChildAnchor(EscherRect),
    ClientAnchor(EscherClientAnchor),
    Dg(EscherDg),
    Dgg(EscherDgg),
    Opt(EscherOpt),
    Raw(Vec<u8>),
}

impl EscherAtom {
    pub fn size(&self) -> usize {
        match self {
            EscherAtom::Sp(_) => EscherSp::SIZE,
            EscherAtom::Spgr(_) | EscherAtom::ChildAnchor(_) => EscherRect::SIZE,
            EscherAtom::ClientAnchor(_) => EscherClientAnchor::SIZE,
            EscherAtom::Dg(_) => EscherDg::SIZE,
            EscherAtom::Dgg(dgg) => dgg.size(),
            EscherAtom::Opt(opt) => opt.size(),
            EscherAtom::Raw(data) => data.len(),
        }
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        match self {
            EscherAtom::Sp(sp) => sp.write(out),
            EscherAtom::Spgr(rect) | EscherAtom::ChildAnchor(rect) => rect.write(out),
            EscherAtom::ClientAnchor(anchor) => anchor.write(out),
            EscherAtom::Dg(dg) => dg.write(out),
            EscherAtom::Dgg(dgg) => dgg.write(out),
            EscherAtom::Opt(opt) => opt.write(out),
            EscherAtom::Raw(data) => out.extend_from_slice(data),
        }
    }
}

/// Record body: either ordered children or an atom payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordBody {
    Container(Vec<RecordId>),
    Atom(EscherAtom),
}

/// A single record of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscherNode {
    pub record_type: u16,
    pub options: u16,
    pub body: RecordBody,
}

impl EscherNode {
    #[inline]
    pub fn kind(&self) -> EscherRecordType {
        EscherRecordType::from(self.record_type)
    }

    #[inline]
    pub fn version(&self) -> u16 {
        self.options & 0x000F
    }

    #[inline]
    pub fn instance(&self) -> u16 {
        self.options >> 4
    }

    #[inline]
    pub fn set_instance(&mut self, instance: u16) {
        self.options = options(self.version(), instance);
    }

    #[inline]
    pub fn is_container(&self) -> bool {
        matches!(self.body, RecordBody::Container(_))
    }

    /// Options word as written; an `Opt` instance always equals its property count.
    pub fn header_options(&self) -> u16 {
        match &self.body {
            RecordBody::Atom(EscherAtom::Opt(opt)) => options(self.version(), opt.len() as u16),
            _ => self.options,
        }
    }
}

macro_rules! atom_accessors {
    ($($get:ident, $get_mut:ident => $variant:ident($ty:ty);)*) => {
        $(
            pub fn $get(&self, id: RecordId) -> Option<&$ty> {
                match self.node(id).map(|n| &n.body) {
                    Some(RecordBody::Atom(EscherAtom::$variant(value))) => Some(value),
                    _ => None,
                }
            }

            pub fn $get_mut(&mut self, id: RecordId) -> Option<&mut $ty> {
                match self.node_mut(id).map(|n| &mut n.body) {
                    Some(RecordBody::Atom(EscherAtom::$variant(value))) => Some(value),
                    _ => None,
                }
            }
        )*
    };
}

/// Arena of Escher records.
#[derive(Debug, Clone, Default)]
pub struct EscherTree {
    nodes: Vec<Option<EscherNode>>,
}

impl EscherTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a detached record to the arena.
    pub fn insert(&mut self, node: EscherNode) -> RecordId {
        self.nodes.push(Some(node));
        RecordId(self.nodes.len() - 1)
    }

    /// Add a detached container holding `children`.
    pub fn container(
        &mut self,
        record_type: u16,
        children: impl IntoIterator<Item = RecordId>,
    ) -> RecordId {
        self.insert(EscherNode {
            record_type,
            options: options(0x0F, 0),
            body: RecordBody::Container(children.into_iter().collect()),
        })
    }

    /// Add a detached atom.
    pub fn atom(&mut self, record_type: u16, options: u16, atom: EscherAtom) -> RecordId {
        self.insert(EscherNode {
            record_type,
            options,
            body: RecordBody::Atom(atom),
        })
    }

    #[inline]
    pub fn node(&self, id: RecordId) -> Option<&EscherNode> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    #[inline]
    pub fn node_mut(&mut self, id: RecordId) -> Option<&mut EscherNode> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    #[inline]
    pub fn record_type(&self, id: RecordId) -> Option<u16> {
        self.node(id).map(|n| n.record_type)
    }

    /// Ordered children of a container; empty for atoms and unknown ids.
    pub fn children(&self, id: RecordId) -> &[RecordId] {
        match self.node(id).map(|n| &n.body) {
            Some(RecordBody::Container(children)) => children,
            _ => &[],
        }
    }

    pub fn child(&self, id: RecordId, index: usize) -> Option<RecordId> {
        self.children(id).get(index).copied()
    }

    /// Append `child` to the container `parent`.
    pub fn add_child(&mut self, parent: RecordId, child: RecordId) -> Result<()> {
        match self.node_mut(parent).map(|n| (n.record_type, &mut n.body)) {
            Some((_, RecordBody::Container(children))) => {
                children.push(child);
                Ok(())
            },
            Some((record_type, RecordBody::Atom(_))) => Err(Error::invalid_record(
                record_type,
                "cannot add a child to an atom record",
            )),
            None => Err(Error::MalformedDrawing(format!(
                "unknown parent record {:?}",
                parent
            ))),
        }
    }

    /// Detach `child` from `parent`. Returns whether it was present.
    pub fn remove_child(&mut self, parent: RecordId, child: RecordId) -> bool {
        match self.node_mut(parent).map(|n| &mut n.body) {
            Some(RecordBody::Container(children)) => {
                let before = children.len();
                children.retain(|&c| c != child);
                children.len() != before
            },
            _ => false,
        }
    }

    /// First direct child of `parent` with the given record type.
    pub fn child_by_type(&self, parent: RecordId, record_type: u16) -> Option<RecordId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&c| self.record_type(c) == Some(record_type))
    }

    /// Direct children of `parent` that are containers.
    pub fn child_containers(&self, parent: RecordId) -> Vec<RecordId> {
        self.children(parent)
            .iter()
            .copied()
            .filter(|&c| self.node(c).is_some_and(EscherNode::is_container))
            .collect()
    }

    /// Depth-first, pre-order search for a record type below (and including) `from`.
    pub fn find_first(&self, from: RecordId, record_type: u16) -> Option<RecordId> {
        if self.record_type(from) == Some(record_type) {
            return Some(from);
        }
        self.children(from)
            .iter()
            .find_map(|&c| self.find_first(c, record_type))
    }

    /// Depth-first, pre-order visit of `from` and all its descendants.
    pub fn walk(&self, from: RecordId, visit: &mut impl FnMut(RecordId, &EscherNode)) {
        if let Some(node) = self.node(from) {
            visit(from, node);
            for &child in self.children(from) {
                self.walk(child, visit);
            }
        }
    }

    /// Release a detached subtree's slots.
    pub fn free_subtree(&mut self, id: RecordId) {
        let children = self.children(id).to_vec();
        for child in children {
            self.free_subtree(child);
        }
        if let Some(slot) = self.nodes.get_mut(id.0) {
            *slot = None;
        }
    }

    /// Number of live records in the arena.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    atom_accessors! {
        sp, sp_mut => Sp(EscherSp);
        spgr, spgr_mut => Spgr(EscherRect);
        child_anchor, child_anchor_mut => ChildAnchor(EscherRect);
        client_anchor, client_anchor_mut => ClientAnchor(EscherClientAnchor);
        dg, dg_mut => Dg(EscherDg);
        dgg, dgg_mut => Dgg(EscherDgg);
        opt, opt_mut => Opt(EscherOpt);
    }

    /// The `Sp` atom of a shape container.
    pub fn shape_record(&self, sp_container: RecordId) -> Option<RecordId> {
        self.child_by_type(sp_container, record_type::SP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ole::escher::types::ShapeFlags;

    #[test]
    fn test_child_lookup_and_removal() {
        let mut tree = EscherTree::new();
        let sp = tree.atom(
            record_type::SP,
            options(2, 202),
            EscherAtom::Sp(EscherSp::new(1025, ShapeFlags::HAVE_ANCHOR)),
        );
        let data = tree.atom(record_type::CLIENT_DATA, 0, EscherAtom::Raw(Vec::new()));
        let container = tree.container(record_type::SP_CONTAINER, [sp, data]);

        assert_eq!(tree.child_by_type(container, record_type::CLIENT_DATA), Some(data));
        assert_eq!(tree.node(sp).unwrap().instance(), 202);
        assert_eq!(tree.sp(sp).unwrap().shape_id, 1025);
        assert!(tree.child_containers(container).is_empty());

        assert!(tree.remove_child(container, data));
        assert!(!tree.remove_child(container, data));
        assert_eq!(tree.children(container), &[sp]);
    }

    #[test]
    fn test_find_first_is_preorder() {
        let mut tree = EscherTree::new();
        let inner = tree.atom(record_type::DG, options(0, 1), EscherAtom::Dg(EscherDg::default()));
        let nested = tree.container(record_type::SP_CONTAINER, [inner]);
        let outer = tree.atom(record_type::DG, options(0, 2), EscherAtom::Dg(EscherDg::default()));
        let root = tree.container(record_type::DG_CONTAINER, [nested, outer]);

        assert_eq!(tree.find_first(root, record_type::DG), Some(inner));
        assert_eq!(tree.find_first(root, record_type::OPT), None);
    }

    #[test]
    fn test_add_child_to_atom_fails() {
        let mut tree = EscherTree::new();
        let atom = tree.atom(record_type::CLIENT_DATA, 0, EscherAtom::Raw(Vec::new()));
        let other = tree.atom(record_type::CLIENT_DATA, 0, EscherAtom::Raw(Vec::new()));
        assert!(tree.add_child(atom, other).is_err());
    }

    #[test]
    fn test_free_subtree_releases_slots() {
        let mut tree = EscherTree::new();
        let atom = tree.atom(record_type::CLIENT_DATA, 0, EscherAtom::Raw(Vec::new()));
        let container = tree.container(record_type::SP_CONTAINER, [atom]);
        assert_eq!(tree.len(), 2);
        tree.free_subtree(container);
        assert!(tree.is_empty());
        assert!(tree.node(atom).is_none());
    }
}
