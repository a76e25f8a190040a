//! Sheet drawing aggregate.
//!
//! A sheet's drawing is persisted as one Escher `DgContainer` cut into
//! `MSODRAWING` records. Every `ClientData` record is followed by the `OBJ`
//! record describing that shape, every `ClientTextbox` record by the `TXO`
//! record holding its text. Comment `NOTE` records come after the drawing.
//!
//! The aggregate owns the decoded record tree, the association from
//! `ClientData`/`ClientTextbox` records to their `OBJ`/`TXO` records, and the
//! tail `NOTE` records keyed by object id.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;

use crate::common::error::{Error, Result};
use crate::log::{debug, warn};
use crate::ole::escher::{
    EscherAtom, EscherDg, EscherParser, EscherRect, EscherSp, EscherTree, RecordBody, RecordId,
    ShapeFlags, options, record_type, shape_type,
};
use crate::ole::xls::objects::{NoteRecord, ObjRecord, TextObjectRecord};
use crate::ole::xls::records::{Record, sid};
use crate::ole::xls::writer::biff::write_record;

/// Default coordinate space of a new drawing.
pub const DEFAULT_GROUP_BOUNDS: EscherRect = EscherRect::new(0, 0, 1023, 255);

/// A BIFF record attached to an Escher record of a shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssociatedRecord {
    /// `OBJ`, attached to `ClientData`
    Obj(ObjRecord),
    /// `TXO`, attached to `ClientTextbox`
    Text(TextObjectRecord),
}

/// Decoded drawing records of one sheet.
#[derive(Debug, Clone, Default)]
pub struct DrawingAggregate {
    tree: EscherTree,
    root: Option<RecordId>,
    shape_to_obj: HashMap<RecordId, AssociatedRecord>,
    tail_records: BTreeMap<u16, NoteRecord>,
    patriarch_registered: bool,
}

impl DrawingAggregate {
    /// A drawing with no shapes: `Dg`, and a top group holding only the
    /// patriarch's own shape record.
    pub fn new_empty() -> Self {
        let mut tree = EscherTree::new();
        let dg = tree.atom(record_type::DG, options(0, 0), EscherAtom::Dg(EscherDg::default()));
        let spgr = tree.atom(record_type::SPGR, options(1, 0), EscherAtom::Spgr(DEFAULT_GROUP_BOUNDS));
        let sp = tree.atom(
            record_type::SP,
            options(2, shape_type::NOT_PRIMITIVE),
            EscherAtom::Sp(EscherSp::new(0, ShapeFlags::GROUP | ShapeFlags::PATRIARCH)),
        );
        let sp_container = tree.container(record_type::SP_CONTAINER, [spgr, sp]);
        let spgr_container = tree.container(record_type::SPGR_CONTAINER, [sp_container]);
        let root = tree.container(record_type::DG_CONTAINER, [dg, spgr_container]);

        Self {
            tree,
            root: Some(root),
            ..Self::default()
        }
    }

    /// Decode the drawing records of a sheet substream.
    ///
    /// Records unrelated to drawings are ignored. Returns `Ok(None)` when the
    /// sheet has no `MSODRAWING` record.
    pub fn from_records(records: &[Record]) -> Result<Option<Self>> {
        #[derive(PartialEq)]
        enum Last {
            Drawing,
            Text,
            Other,
        }

        let mut escher = Vec::new();
        let mut associated = Vec::new();
        let mut tail_records = BTreeMap::new();
        let mut last = Last::Other;

        let mut index = 0;
        while index < records.len() {
            let record = &records[index];
            index += 1;
            match record.sid() {
                sid::MSODRAWING => {
                    escher.extend_from_slice(&record.data);
                    last = Last::Drawing;
                },
                sid::CONTINUE if last == Last::Drawing => {
                    escher.extend_from_slice(&record.data);
                },
                sid::OBJ => {
                    associated.push(AssociatedRecord::Obj(ObjRecord::parse(&record.data)?));
                    last = Last::Other;
                },
                sid::TXO => {
                    let mut continues = Vec::new();
                    while let Some(next) = records.get(index).filter(|r| r.sid() == sid::CONTINUE) {
                        continues.push(next.data.as_slice());
                        index += 1;
                    }
                    associated.push(AssociatedRecord::Text(TextObjectRecord::parse(
                        &record.data,
                        &continues,
                    )?));
                    last = Last::Text;
                },
                sid::NOTE => {
                    let mut data = record.data.clone();
                    while let Some(next) = records.get(index).filter(|r| r.sid() == sid::CONTINUE) {
                        data.extend_from_slice(&next.data);
                        index += 1;
                    }
                    let note = NoteRecord::parse(&data)?;
                    tail_records.insert(note.object_id, note);
                    last = Last::Other;
                },
                _ => last = Last::Other,
            }
        }

        if escher.is_empty() {
            return Ok(None);
        }

        let mut tree = EscherTree::new();
        let roots = EscherParser::new(&escher).parse_into(&mut tree)?;
        let root = roots
            .into_iter()
            .find(|&id| tree.record_type(id) == Some(record_type::DG_CONTAINER))
            .ok_or_else(|| Error::MalformedDrawing("drawing has no DgContainer".to_string()))?;

        let mut anchors = Vec::new();
        tree.walk(root, &mut |id, node| {
            if matches!(node.record_type, record_type::CLIENT_DATA | record_type::CLIENT_TEXTBOX) {
                anchors.push((id, node.record_type));
            }
        });

        if anchors.len() != associated.len() {
            return Err(Error::MalformedDrawing(format!(
                "{} shape records but {} OBJ/TXO records",
                anchors.len(),
                associated.len()
            )));
        }

        let mut shape_to_obj = HashMap::with_capacity(anchors.len());
        for ((id, kind), record) in anchors.into_iter().zip(associated) {
            match (kind, &record) {
                (record_type::CLIENT_DATA, AssociatedRecord::Obj(_))
                | (record_type::CLIENT_TEXTBOX, AssociatedRecord::Text(_)) => {
                    shape_to_obj.insert(id, record);
                },
                _ => {
                    return Err(Error::MalformedDrawing(format!(
                        "record 0x{:04X} paired with the wrong BIFF record",
                        kind
                    )));
                },
            }
        }

        debug!(
            "decoded drawing: {} records, {} objects, {} notes",
            tree.len(),
            shape_to_obj.len(),
            tail_records.len()
        );

        Ok(Some(Self {
            tree,
            root: Some(root),
            shape_to_obj,
            tail_records,
            patriarch_registered: false,
        }))
    }

    /// Write the drawing as `MSODRAWING`/`OBJ`/`TXO` records followed by the
    /// `NOTE` records.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let Some(root) = self.root else {
            return Ok(());
        };

        let mut bytes = Vec::with_capacity(self.tree.record_size(root));
        let mut cuts = Vec::new();
        self.tree.serialize_with(root, &mut bytes, &mut |id, end| {
            if matches!(
                self.tree.record_type(id),
                Some(record_type::CLIENT_DATA | record_type::CLIENT_TEXTBOX)
            ) {
                cuts.push((id, end));
            }
        });

        let mut start = 0;
        for (id, end) in cuts {
            write_record(writer, sid::MSODRAWING, &bytes[start..end])?;
            start = end;
            match self.shape_to_obj.get(&id) {
                Some(AssociatedRecord::Obj(obj)) => write_record(writer, sid::OBJ, &obj.to_bytes())?,
                Some(AssociatedRecord::Text(txo)) => txo.write(writer)?,
                None => {
                    return Err(Error::MalformedDrawing(format!(
                        "shape record {:?} has no associated OBJ/TXO record",
                        id
                    )));
                },
            }
        }
        if start < bytes.len() {
            write_record(writer, sid::MSODRAWING, &bytes[start..])?;
        }

        for note in self.tail_records.values() {
            write_record(writer, sid::NOTE, &note.to_bytes()?)?;
        }
        Ok(())
    }

    #[inline]
    pub fn tree(&self) -> &EscherTree {
        &self.tree
    }

    #[inline]
    pub fn tree_mut(&mut self) -> &mut EscherTree {
        &mut self.tree
    }

    /// The `DgContainer`, if the aggregate has a record tree.
    #[inline]
    pub fn escher_container(&self) -> Option<RecordId> {
        self.root
    }

    /// First record of the given type anywhere in the drawing, pre-order.
    pub fn find_first(&self, record_type: u16) -> Option<RecordId> {
        self.root.and_then(|root| self.tree.find_first(root, record_type))
    }

    fn dg_record(&self) -> Option<RecordId> {
        self.root.and_then(|root| self.tree.child_by_type(root, record_type::DG))
    }

    /// Drawing group id (the `Dg` instance).
    pub fn dg_id(&self) -> Option<u16> {
        self.dg_record()
            .and_then(|id| self.tree.node(id))
            .map(|node| node.instance())
    }

    pub fn set_dg_id(&mut self, dg_id: u16) {
        if let Some(node) = self.dg_record().and_then(|id| self.tree.node_mut(id)) {
            node.set_instance(dg_id);
        }
    }

    /// The `Dg` atom, mutable for shape-id allocation.
    pub fn dg_mut(&mut self) -> Option<&mut EscherDg> {
        let id = self.dg_record()?;
        self.tree.dg_mut(id)
    }

    /// The patriarch's own shape container (first child of the top group).
    fn main_sp_container(&self) -> Option<RecordId> {
        let root = self.root?;
        let group = self.tree.child_containers(root).first().copied()?;
        self.tree.child(group, 0)
    }

    /// Stamp the shape id of the patriarch's own `Sp` record.
    pub fn set_main_sp_record_id(&mut self, shape_id: u32) {
        let sp = self
            .main_sp_container()
            .and_then(|container| self.tree.shape_record(container));
        if let Some(sp) = sp.and_then(|id| self.tree.sp_mut(id)) {
            sp.shape_id = shape_id;
        }
    }

    /// Every shape id stored in an `Sp` record of this drawing.
    pub fn shape_ids(&self) -> Vec<u32> {
        let mut ids = Vec::new();
        if let Some(root) = self.root {
            self.tree.walk(root, &mut |_, node| {
                if let RecordBody::Atom(EscherAtom::Sp(sp)) = &node.body {
                    if sp.shape_id != 0 {
                        ids.push(sp.shape_id);
                    }
                }
            });
        }
        ids
    }

    pub fn associate(&mut self, record: RecordId, associated: AssociatedRecord) {
        self.shape_to_obj.insert(record, associated);
    }

    pub fn dissociate(&mut self, record: RecordId) -> Option<AssociatedRecord> {
        self.shape_to_obj.remove(&record)
    }

    pub fn obj(&self, client_data: RecordId) -> Option<&ObjRecord> {
        match self.shape_to_obj.get(&client_data) {
            Some(AssociatedRecord::Obj(obj)) => Some(obj),
            _ => None,
        }
    }

    pub fn obj_mut(&mut self, client_data: RecordId) -> Option<&mut ObjRecord> {
        match self.shape_to_obj.get_mut(&client_data) {
            Some(AssociatedRecord::Obj(obj)) => Some(obj),
            _ => None,
        }
    }

    pub fn text(&self, client_textbox: RecordId) -> Option<&TextObjectRecord> {
        match self.shape_to_obj.get(&client_textbox) {
            Some(AssociatedRecord::Text(txo)) => Some(txo),
            _ => None,
        }
    }

    pub fn text_mut(&mut self, client_textbox: RecordId) -> Option<&mut TextObjectRecord> {
        match self.shape_to_obj.get_mut(&client_textbox) {
            Some(AssociatedRecord::Text(txo)) => Some(txo),
            _ => None,
        }
    }

    /// Number of `OBJ`/`TXO` records attached to shape records.
    #[inline]
    pub fn associated_count(&self) -> usize {
        self.shape_to_obj.len()
    }

    #[inline]
    pub fn tail_records(&self) -> &BTreeMap<u16, NoteRecord> {
        &self.tail_records
    }

    pub fn tail_record(&self, object_id: u16) -> Option<&NoteRecord> {
        self.tail_records.get(&object_id)
    }

    pub fn tail_record_mut(&mut self, object_id: u16) -> Option<&mut NoteRecord> {
        self.tail_records.get_mut(&object_id)
    }

    pub fn add_tail_record(&mut self, note: NoteRecord) {
        if self.tail_records.contains_key(&note.object_id) {
            warn!("replacing NOTE record for object {}", note.object_id);
        }
        self.tail_records.insert(note.object_id, note);
    }

    pub fn remove_tail_record(&mut self, object_id: u16) -> Option<NoteRecord> {
        self.tail_records.remove(&object_id)
    }

    /// Move a `NOTE` record to a new object id.
    pub(crate) fn rekey_tail_record(&mut self, from: u16, to: u16) {
        if let Some(mut note) = self.tail_records.remove(&from) {
            note.object_id = to;
            self.add_tail_record(note);
        }
    }

    #[inline]
    pub fn is_patriarch_registered(&self) -> bool {
        self.patriarch_registered
    }

    pub(crate) fn register_patriarch(&mut self) {
        self.patriarch_registered = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ole::xls::objects::{CommonObjectData, CommonObjectFlags, object_type};
    use crate::ole::xls::records::RecordIter;
    use std::io::Cursor;

    fn read_back(aggregate: &DrawingAggregate) -> Vec<Record> {
        let mut out = Vec::new();
        aggregate.write(&mut out).unwrap();
        RecordIter::new(Cursor::new(out))
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_empty_aggregate_layout() {
        let aggregate = DrawingAggregate::new_empty();
        let tree = aggregate.tree();
        let root = aggregate.escher_container().unwrap();

        assert_eq!(tree.children(root).len(), 2);
        assert_eq!(aggregate.dg_id(), Some(0));
        let spgr = aggregate.find_first(record_type::SPGR).unwrap();
        assert_eq!(tree.spgr(spgr), Some(&DEFAULT_GROUP_BOUNDS));
        assert!(aggregate.tail_records().is_empty());
        assert!(aggregate.shape_ids().is_empty());
    }

    #[test]
    fn test_dg_id_and_main_sp() {
        let mut aggregate = DrawingAggregate::new_empty();
        aggregate.set_dg_id(3);
        aggregate.set_main_sp_record_id(3072);
        assert_eq!(aggregate.dg_id(), Some(3));
        assert_eq!(aggregate.shape_ids(), vec![3072]);
    }

    #[test]
    fn test_empty_drawing_is_one_record() {
        let records = read_back(&DrawingAggregate::new_empty());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sid(), sid::MSODRAWING);

        let restored = DrawingAggregate::from_records(&records).unwrap().unwrap();
        assert_eq!(restored.tree().len(), DrawingAggregate::new_empty().tree().len());
    }

    #[test]
    fn test_obj_follows_client_data() {
        let mut aggregate = DrawingAggregate::new_empty();
        let root = aggregate.escher_container().unwrap();
        let group = aggregate.tree().child_containers(root)[0];

        let tree = aggregate.tree_mut();
        let data = tree.atom(record_type::CLIENT_DATA, 0, EscherAtom::Raw(Vec::new()));
        let container = tree.container(record_type::SP_CONTAINER, [data]);
        tree.add_child(group, container).unwrap();

        let mut cmo = CommonObjectData::new(object_type::RECTANGLE, CommonObjectFlags::LOCKED);
        cmo.object_id = 1;
        aggregate.associate(data, AssociatedRecord::Obj(ObjRecord::new(cmo)));

        let records = read_back(&aggregate);
        let sids: Vec<u16> = records.iter().map(Record::sid).collect();
        assert_eq!(sids, vec![sid::MSODRAWING, sid::OBJ]);

        let restored = DrawingAggregate::from_records(&records).unwrap().unwrap();
        let restored_data = restored.find_first(record_type::CLIENT_DATA).unwrap();
        assert_eq!(restored.obj(restored_data).and_then(ObjRecord::object_id), Some(1));
    }

    #[test]
    fn test_missing_obj_is_an_error() {
        let mut aggregate = DrawingAggregate::new_empty();
        let root = aggregate.escher_container().unwrap();
        let tree = aggregate.tree_mut();
        let data = tree.atom(record_type::CLIENT_DATA, 0, EscherAtom::Raw(Vec::new()));
        tree.add_child(root, data).unwrap();

        let mut out = Vec::new();
        assert!(matches!(aggregate.write(&mut out), Err(Error::MalformedDrawing(_))));
    }

    #[test]
    fn test_tail_record_rekey() {
        let mut aggregate = DrawingAggregate::new_empty();
        aggregate.add_tail_record(NoteRecord {
            object_id: 1,
            ..Default::default()
        });
        aggregate.rekey_tail_record(1, 1000);
        assert!(aggregate.tail_record(1).is_none());
        assert_eq!(aggregate.tail_record(1000).map(|n| n.object_id), Some(1000));
    }

    #[test]
    fn test_sheet_without_drawing() {
        assert!(DrawingAggregate::from_records(&[]).unwrap().is_none());
    }
}
