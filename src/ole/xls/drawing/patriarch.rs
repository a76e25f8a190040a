//! Drawing patriarch: the root of a sheet's shape tree.
//!
//! The patriarch owns the sheet's [`DrawingAggregate`] and an arena of
//! [`Shape`]s mirroring the shape containers of the aggregate's top group.
//! Every mutation goes through the patriarch so the record tree, the
//! `OBJ`/`TXO` mapping and the `NOTE` tail records stay in step with the
//! shape list.
//!
//! # Example
//!
//! ```
//! use xls_drawing::ole::xls::drawing::{DrawingAggregate, DrawingManager, Patriarch};
//!
//! let manager = DrawingManager::new().into_handle();
//! let mut patriarch = Patriarch::bind(DrawingAggregate::new_empty(), manager)?;
//! patriarch.after_create()?;
//!
//! let anchor = Patriarch::create_anchor(0, 0, 0, 0, 1, 1, 4, 6);
//! let comment = patriarch.create_comment(anchor)?;
//! patriarch.set_string(comment, "Reviewed")?;
//! patriarch.set_author(comment, "Finance")?;
//!
//! assert_eq!(patriarch.children().len(), 1);
//! assert_eq!(patriarch.shape_id(comment)?, 1025);
//! # Ok::<(), xls_drawing::Error>(())
//! ```

use encoding_rs::UTF_16LE;

use super::aggregate::{AssociatedRecord, DrawingAggregate};
use super::anchor::{Anchor, ChildAnchor, ClientAnchor};
use super::manager::{DrawingManagerHandle, SHAPE_IDS_PER_CLUSTER};
use super::shape::{
    self, GROUP_PRINT_HIDDEN, GROUP_PRINT_VISIBLE, NewShape, Parent, Shape, ShapeId, ShapeKind,
    SimpleShapeType,
};
use super::shape_factory;
use crate::common::error::{Error, Result};
use crate::log::{debug, warn};
use crate::ole::escher::{EscherProperty, EscherRect, RecordId, ShapeFlags, prop_id, record_type};
use crate::ole::xls::objects::{NoteRecord, ObjRecord};
use crate::ole::xls::records::sid;
use crate::ole::xls::writer::biff::biff8_string_length;

/// Group name marking a drawing that holds an embedded chart.
const CHART_MARKER: &str = "Chart 1\0";

/// Object id stored in `OBJ` and `NOTE` records for shape id `shape_id`.
fn object_id_for(shape_id: u32) -> Result<u16> {
    shape_id
        .checked_sub(SHAPE_IDS_PER_CLUSTER)
        .and_then(|id| u16::try_from(id).ok())
        .ok_or(Error::InvalidShapeId(shape_id))
}

/// Root of a sheet's shape tree.
#[derive(Debug)]
pub struct Patriarch {
    aggregate: DrawingAggregate,
    manager: DrawingManagerHandle,
    /// Top `SpgrContainer`; its first child describes the patriarch
    group_container: RecordId,
    /// Shared bounds record of the top group
    spgr: RecordId,
    shapes: Vec<Option<Shape>>,
    children: Vec<ShapeId>,
}

impl Patriarch {
    /// Bind a patriarch to a drawing and rebuild its shapes.
    ///
    /// Fails with [`Error::MalformedDrawing`] when the drawing has no top
    /// group or no bounds record, and with [`Error::UnrecognizedShape`]
    /// when a persisted shape cannot be identified.
    pub fn bind(mut aggregate: DrawingAggregate, manager: DrawingManagerHandle) -> Result<Self> {
        let root = aggregate
            .escher_container()
            .ok_or_else(|| Error::MalformedDrawing("drawing has no record tree".to_string()))?;
        let tree = aggregate.tree();
        let group_container = tree
            .child_containers(root)
            .first()
            .copied()
            .ok_or_else(|| Error::MalformedDrawing("drawing has no group container".to_string()))?;
        let spgr = tree
            .child(group_container, 0)
            .and_then(|descriptor| tree.child_by_type(descriptor, record_type::SPGR))
            .ok_or_else(|| Error::MalformedDrawing("group container has no Spgr record".to_string()))?;

        if aggregate.is_patriarch_registered() {
            warn!("drawing already had a patriarch bound");
        }
        aggregate.register_patriarch();

        let mut patriarch = Self {
            aggregate,
            manager,
            group_container,
            spgr,
            shapes: Vec::new(),
            children: Vec::new(),
        };
        patriarch.build_shape_tree()?;
        debug!(
            "bound patriarch with {} top-level shapes",
            patriarch.children.len()
        );
        Ok(patriarch)
    }

    /// Rebuild the shape list from the persisted records.
    pub fn build_shape_tree(&mut self) -> Result<()> {
        if self.aggregate.escher_container().is_none() {
            return Ok(());
        }
        let containers = self.aggregate.tree().child_containers(self.group_container);
        for &container in containers.iter().skip(1) {
            let id = shape_factory::create_shape_tree(
                &self.aggregate,
                &mut self.shapes,
                container,
                Parent::Patriarch,
            )?;
            self.add_shape(id);
        }
        Ok(())
    }

    /// Append an already-built shape to the top level without touching
    /// the record tree.
    pub(crate) fn add_shape(&mut self, id: ShapeId) {
        if let Some(Some(shape)) = self.shapes.get_mut(id.0) {
            shape.parent = Parent::Patriarch;
            self.children.push(id);
        }
    }

    /// Register a brand-new drawing with the workbook: reserve a drawing
    /// group id and give the patriarch's own shape record an id.
    ///
    /// Must run exactly once per new drawing; a second call reserves a
    /// second drawing group.
    pub fn after_create(&mut self) -> Result<()> {
        let dg_id = self.manager.lock().find_new_drawing_group_id();
        self.aggregate.set_dg_id(dg_id);
        let main_shape_id = self.new_shape_id()?;
        self.aggregate.set_main_sp_record_id(main_shape_id);
        self.manager.lock().increment_drawings_saved();
        debug!("registered drawing group {}", dg_id);
        Ok(())
    }

    /// Allocate a shape id in this drawing's group.
    ///
    /// The id is reserved as soon as it is returned, whether or not a
    /// shape ends up carrying it.
    pub fn new_shape_id(&mut self) -> Result<u32> {
        let dg_id = self
            .aggregate
            .dg_id()
            .ok_or_else(|| Error::MalformedDrawing("drawing has no Dg record".to_string()))?;
        let dg = self
            .aggregate
            .dg_mut()
            .ok_or_else(|| Error::MalformedDrawing("drawing has no Dg record".to_string()))?;
        self.manager.lock().allocate_shape_id(dg_id, dg)
    }

    /// Cell anchor from two corners given in any order.
    #[allow(clippy::too_many_arguments)]
    pub fn create_anchor(
        dx1: u16,
        dy1: u16,
        dx2: u16,
        dy2: u16,
        col1: u16,
        row1: u16,
        col2: u16,
        row2: u16,
    ) -> ClientAnchor {
        ClientAnchor::new(dx1, dy1, dx2, dy2, col1, row1, col2, row2)
    }

    pub fn create_group(&mut self, anchor: ClientAnchor) -> Result<ShapeId> {
        self.create(NewShape::Group, anchor.into(), Parent::Patriarch)
    }

    pub fn create_simple_shape(
        &mut self,
        anchor: ClientAnchor,
        shape_type: SimpleShapeType,
    ) -> Result<ShapeId> {
        self.create(NewShape::SimpleShape(shape_type), anchor.into(), Parent::Patriarch)
    }

    pub fn create_picture(&mut self, anchor: ClientAnchor, picture_index: u32) -> Result<ShapeId> {
        self.create(NewShape::Picture { picture_index }, anchor.into(), Parent::Patriarch)
    }

    pub fn create_polygon(&mut self, anchor: ClientAnchor) -> Result<ShapeId> {
        self.create(NewShape::Polygon, anchor.into(), Parent::Patriarch)
    }

    pub fn create_textbox(&mut self, anchor: ClientAnchor) -> Result<ShapeId> {
        self.create(NewShape::Textbox, anchor.into(), Parent::Patriarch)
    }

    /// Create a cell comment. The comment starts hidden, at row 0 and
    /// column 0, with an empty author.
    pub fn create_comment(&mut self, anchor: ClientAnchor) -> Result<ShapeId> {
        self.create(NewShape::Comment, anchor.into(), Parent::Patriarch)
    }

    /// Create an auto-filter drop-down.
    pub fn create_combo_box(&mut self, anchor: ClientAnchor) -> Result<ShapeId> {
        self.create(NewShape::ComboBox, anchor.into(), Parent::Patriarch)
    }

    /// Create a shape inside `group`, positioned in the group's coordinate
    /// space.
    pub fn create_in_group(
        &mut self,
        group: ShapeId,
        new: NewShape,
        anchor: ChildAnchor,
    ) -> Result<ShapeId> {
        self.create(new, anchor.into(), Parent::Group(group))
    }

    fn create(&mut self, new: NewShape, anchor: Anchor, parent: Parent) -> Result<ShapeId> {
        let parent_container = match parent {
            Parent::Patriarch => self.group_container,
            Parent::Group(group) => {
                let shape = self.get(group)?;
                if !shape.kind.is_group() {
                    return Err(Error::WrongShapeKind {
                        expected: "group",
                        found: shape.kind.name(),
                    });
                }
                shape.records.container
            },
        };

        let mut built = shape::build(self.aggregate.tree_mut(), new, &anchor);
        let container = built.records.container;
        if let Err(err) = self.aggregate.tree_mut().add_child(parent_container, container) {
            self.aggregate.tree_mut().free_subtree(container);
            return Err(err);
        }
        let allocated = self
            .new_shape_id()
            .and_then(|id| object_id_for(id).map(|object_id| (id, object_id)));
        let (shape_id, object_id) = match allocated {
            Ok(ids) => ids,
            Err(err) => {
                let tree = self.aggregate.tree_mut();
                tree.remove_child(parent_container, container);
                tree.free_subtree(container);
                return Err(err);
            },
        };

        let tree = self.aggregate.tree_mut();
        if let Some(sp) = tree.sp_mut(built.records.sp) {
            sp.shape_id = shape_id;
            if matches!(new, NewShape::SimpleShape(_) | NewShape::Picture { .. }) {
                if anchor.is_horizontally_flipped() {
                    sp.flags |= ShapeFlags::FLIP_H;
                }
                if anchor.is_vertically_flipped() {
                    sp.flags |= ShapeFlags::FLIP_V;
                }
            }
        }

        built.obj.set_object_id(object_id);
        if let Some(client_data) = built.records.client_data {
            self.aggregate.associate(client_data, AssociatedRecord::Obj(built.obj));
        }
        if let (Some(client_textbox), Some(text)) = (built.records.client_textbox, built.text) {
            self.aggregate.associate(client_textbox, AssociatedRecord::Text(text));
        }
        if let Some(mut note) = built.note {
            note.object_id = object_id;
            self.aggregate.add_tail_record(note);
        }

        self.shapes.push(Some(Shape {
            kind: built.kind,
            anchor,
            parent,
            records: built.records,
        }));
        let id = ShapeId(self.shapes.len() - 1);
        match parent {
            Parent::Patriarch => self.children.push(id),
            Parent::Group(group) => {
                if let Some(ShapeKind::Group { children }) = self.get_mut(group).ok().map(|s| &mut s.kind) {
                    children.push(id);
                }
            },
        }

        debug!("created {} with shape id {}", new_name(new), shape_id);
        Ok(id)
    }

    /// Remove a top-level shape together with its records.
    ///
    /// Fails with [`Error::NotAChild`] when `id` is not a direct child of
    /// the patriarch; nothing changes in that case.
    pub fn remove_shape(&mut self, id: ShapeId) -> Result<()> {
        let position = self
            .children
            .iter()
            .position(|&child| child == id)
            .ok_or(Error::NotAChild)?;
        let container = self.get(id)?.records.container;

        let tree = self.aggregate.tree_mut();
        tree.remove_child(self.group_container, container);
        self.detach(id);
        self.aggregate.tree_mut().free_subtree(container);
        self.children.remove(position);
        Ok(())
    }

    /// Drop the shape, its descendants and their associated records.
    fn detach(&mut self, id: ShapeId) {
        let Some(shape) = self.shapes.get_mut(id.0).and_then(Option::take) else {
            return;
        };
        for &child in shape.children() {
            self.detach(child);
        }

        if let Some(client_data) = shape.records.client_data {
            let removed = self.aggregate.dissociate(client_data);
            if shape.kind == ShapeKind::Comment {
                if let Some(AssociatedRecord::Obj(obj)) = removed {
                    if let Some(object_id) = obj.object_id() {
                        self.aggregate.remove_tail_record(object_id);
                    }
                }
            }
        }
        if let Some(client_textbox) = shape.records.client_textbox {
            self.aggregate.dissociate(client_textbox);
        }
    }

    /// Number of shapes in the tree, nested ones included.
    pub fn count_of_all_children(&self) -> usize {
        fn count(patriarch: &Patriarch, ids: &[ShapeId]) -> usize {
            ids.iter()
                .map(|&id| 1 + patriarch.shape(id).map_or(0, |s| count(patriarch, s.children())))
                .sum()
        }
        count(self, &self.children)
    }

    /// Set the coordinate space shared by the top-level shapes.
    pub fn set_coordinates(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) {
        if let Some(rect) = self.aggregate.tree_mut().spgr_mut(self.spgr) {
            *rect = EscherRect::new(x1, y1, x2, y2);
        }
    }

    fn bounds(&self) -> EscherRect {
        self.aggregate.tree().spgr(self.spgr).copied().unwrap_or_default()
    }

    pub fn x1(&self) -> i32 {
        self.bounds().x1
    }

    pub fn y1(&self) -> i32 {
        self.bounds().y1
    }

    pub fn x2(&self) -> i32 {
        self.bounds().x2
    }

    pub fn y2(&self) -> i32 {
        self.bounds().y2
    }

    /// Whether the drawing references an embedded chart.
    ///
    /// Only the first `Opt` record of the drawing is inspected, for a group
    /// name of exactly `"Chart 1"` plus terminator. Charts stored any other
    /// way are not detected.
    pub fn contains_chart(&self) -> bool {
        let Some(opt) = self
            .aggregate
            .find_first(record_type::OPT)
            .and_then(|id| self.aggregate.tree().opt(id))
        else {
            return false;
        };

        opt.iter()
            .filter(|property| property.id == prop_id::GROUP_NAME)
            .filter_map(EscherProperty::complex_data)
            .any(|data| UTF_16LE.decode_without_bom_handling(data).0 == CHART_MARKER)
    }

    /// Top-level shapes in z-order.
    #[inline]
    pub fn children(&self) -> &[ShapeId] {
        &self.children
    }

    #[inline]
    pub fn shape(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.get(id.0).and_then(Option::as_ref)
    }

    #[inline]
    pub fn shape_kind(&self, id: ShapeId) -> Option<&ShapeKind> {
        self.shape(id).map(Shape::kind)
    }

    /// All live shapes, top-level and nested, in creation order.
    pub fn shapes(&self) -> impl Iterator<Item = (ShapeId, &Shape)> {
        self.shapes
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|shape| (ShapeId(index), shape)))
    }

    #[inline]
    pub fn aggregate(&self) -> &DrawingAggregate {
        &self.aggregate
    }

    /// Give the drawing back, dropping the shape list.
    pub fn into_aggregate(self) -> DrawingAggregate {
        self.aggregate
    }

    fn get(&self, id: ShapeId) -> Result<&Shape> {
        self.shape(id).ok_or(Error::UnknownShape(id.0))
    }

    fn get_mut(&mut self, id: ShapeId) -> Result<&mut Shape> {
        self.shapes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(Error::UnknownShape(id.0))
    }

    fn expect_kind(
        &self,
        id: ShapeId,
        expected: &'static str,
        matches: impl Fn(&ShapeKind) -> bool,
    ) -> Result<&Shape> {
        let shape = self.get(id)?;
        if matches(&shape.kind) {
            Ok(shape)
        } else {
            Err(Error::WrongShapeKind {
                expected,
                found: shape.kind.name(),
            })
        }
    }

    // Shape ids

    pub fn shape_id(&self, id: ShapeId) -> Result<u32> {
        let sp = self.get(id)?.records.sp;
        self.aggregate
            .tree()
            .sp(sp)
            .map(|sp| sp.shape_id)
            .ok_or_else(|| Error::MalformedDrawing("shape has no Sp record".to_string()))
    }

    /// Reassign a shape id. The `OBJ` record, and for a comment the `NOTE`
    /// record, follow with object id `shape_id - 1024`.
    ///
    /// The new id must be unused in the workbook and must not collide with
    /// another comment's `NOTE`; otherwise [`Error::InvalidShapeId`] is
    /// returned and nothing changes. The previous id stays reserved.
    pub fn set_shape_id(&mut self, id: ShapeId, shape_id: u32) -> Result<()> {
        let object_id = object_id_for(shape_id)?;
        let shape = self.get(id)?;
        let records = shape.records;
        let is_comment = shape.kind == ShapeKind::Comment;
        if self.shape_id(id)? == shape_id {
            return Ok(());
        }
        if self.aggregate.tail_record(object_id).is_some() {
            return Err(Error::InvalidShapeId(shape_id));
        }

        let dg_id = self
            .aggregate
            .dg_id()
            .ok_or_else(|| Error::MalformedDrawing("drawing has no Dg record".to_string()))?;
        let dg = self
            .aggregate
            .dg_mut()
            .ok_or_else(|| Error::MalformedDrawing("drawing has no Dg record".to_string()))?;
        self.manager.lock().reserve_shape_id(dg_id, shape_id, dg)?;

        if let Some(sp) = self.aggregate.tree_mut().sp_mut(records.sp) {
            sp.shape_id = shape_id;
        }
        let previous = records.client_data.and_then(|data| {
            let obj = self.aggregate.obj_mut(data)?;
            let previous = obj.object_id();
            obj.set_object_id(object_id);
            previous
        });
        if is_comment {
            if let Some(previous) = previous {
                self.aggregate.rekey_tail_record(previous, object_id);
            }
        }
        Ok(())
    }

    /// The `OBJ` record of a shape.
    pub fn obj_record(&self, id: ShapeId) -> Option<&ObjRecord> {
        self.shape(id)?
            .records
            .client_data
            .and_then(|data| self.aggregate.obj(data))
    }

    // Text

    fn text_record(&self, id: ShapeId) -> Result<RecordId> {
        let shape = self.get(id)?;
        shape.records.client_textbox.ok_or(Error::WrongShapeKind {
            expected: "shape with text",
            found: shape.kind.name(),
        })
    }

    pub fn string(&self, id: ShapeId) -> Result<&str> {
        let record = self.text_record(id)?;
        Ok(self
            .aggregate
            .text(record)
            .map_or("", |txo| txo.text.as_str()))
    }

    /// Replace the text of a text box or comment. Formatting runs are
    /// dropped. Text longer than 65535 characters is rejected.
    pub fn set_string(&mut self, id: ShapeId, text: impl Into<String>) -> Result<()> {
        let record = self.text_record(id)?;
        let text = text.into();
        biff8_string_length(sid::TXO, &text)?;
        let txo = self
            .aggregate
            .text_mut(record)
            .ok_or_else(|| Error::MalformedDrawing("text box has no TXO record".to_string()))?;
        txo.text = text;
        txo.runs.clear();
        Ok(())
    }

    // Comments

    /// The `NOTE` record of a comment.
    pub fn note_record(&self, id: ShapeId) -> Result<&NoteRecord> {
        let shape = self.expect_kind(id, "comment", |kind| *kind == ShapeKind::Comment)?;
        let object_id = shape
            .records
            .client_data
            .and_then(|data| self.aggregate.obj(data))
            .and_then(ObjRecord::object_id)
            .ok_or_else(|| Error::MalformedDrawing("comment has no OBJ record".to_string()))?;
        self.aggregate
            .tail_record(object_id)
            .ok_or_else(|| Error::MalformedDrawing(format!("comment {} has no NOTE record", object_id)))
    }

    fn note_mut(&mut self, id: ShapeId) -> Result<&mut NoteRecord> {
        let object_id = self.note_record(id)?.object_id;
        self.aggregate
            .tail_record_mut(object_id)
            .ok_or_else(|| Error::MalformedDrawing(format!("comment {} has no NOTE record", object_id)))
    }

    pub fn author(&self, id: ShapeId) -> Result<&str> {
        Ok(self.note_record(id)?.author.as_str())
    }

    pub fn set_author(&mut self, id: ShapeId, author: impl Into<String>) -> Result<()> {
        let author = author.into();
        biff8_string_length(sid::NOTE, &author)?;
        self.note_mut(id)?.author = author;
        Ok(())
    }

    pub fn row(&self, id: ShapeId) -> Result<u16> {
        Ok(self.note_record(id)?.row)
    }

    pub fn set_row(&mut self, id: ShapeId, row: u16) -> Result<()> {
        self.note_mut(id)?.row = row;
        Ok(())
    }

    pub fn column(&self, id: ShapeId) -> Result<u16> {
        Ok(self.note_record(id)?.column)
    }

    pub fn set_column(&mut self, id: ShapeId, column: u16) -> Result<()> {
        self.note_mut(id)?.column = column;
        Ok(())
    }

    pub fn is_visible(&self, id: ShapeId) -> Result<bool> {
        Ok(self.note_record(id)?.is_visible())
    }

    /// Show or hide a comment. Both the `NOTE` flags and the shape's print
    /// property change.
    pub fn set_visible(&mut self, id: ShapeId, visible: bool) -> Result<()> {
        self.note_mut(id)?.set_visible(visible);
        let opt = self.get(id)?.records.opt;
        if let Some(opt) = opt.and_then(|opt| self.aggregate.tree_mut().opt_mut(opt)) {
            let value = if visible { GROUP_PRINT_VISIBLE } else { GROUP_PRINT_HIDDEN };
            opt.set(EscherProperty::simple(prop_id::GROUP_PRINT, value));
        }
        Ok(())
    }

    /// The comment attached to a cell, if any.
    pub fn find_comment(&self, row: u16, column: u16) -> Option<ShapeId> {
        self.shapes()
            .filter(|(_, shape)| shape.kind == ShapeKind::Comment)
            .map(|(id, _)| id)
            .find(|&id| {
                self.note_record(id)
                    .is_ok_and(|note| note.row == row && note.column == column)
            })
    }

    // Groups

    pub fn group_coordinates(&self, group: ShapeId) -> Result<EscherRect> {
        let shape = self.expect_kind(group, "group", ShapeKind::is_group)?;
        Ok(shape
            .records
            .spgr
            .and_then(|spgr| self.aggregate.tree().spgr(spgr))
            .copied()
            .unwrap_or_default())
    }

    /// Set the coordinate space of a group's children.
    pub fn set_group_coordinates(
        &mut self,
        group: ShapeId,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
    ) -> Result<()> {
        let spgr = self
            .expect_kind(group, "group", ShapeKind::is_group)?
            .records
            .spgr
            .ok_or_else(|| Error::MalformedDrawing("group has no Spgr record".to_string()))?;
        if let Some(rect) = self.aggregate.tree_mut().spgr_mut(spgr) {
            *rect = EscherRect::new(x1, y1, x2, y2);
        }
        Ok(())
    }

    // Polygons

    fn polygon_opt(&self, id: ShapeId) -> Result<RecordId> {
        self.expect_kind(id, "polygon", |kind| *kind == ShapeKind::Polygon)?
            .records
            .opt
            .ok_or_else(|| Error::MalformedDrawing("polygon has no Opt record".to_string()))
    }

    /// Outline of a polygon, without the closing point.
    pub fn polygon_points(&self, id: ShapeId) -> Result<Vec<(i32, i32)>> {
        let opt = self.polygon_opt(id)?;
        Ok(self
            .aggregate
            .tree()
            .opt(opt)
            .and_then(|opt| opt.lookup(prop_id::VERTICES))
            .and_then(EscherProperty::complex_data)
            .map(shape::polygon_points)
            .unwrap_or_default())
    }

    /// Replace the outline of a polygon. The outline is closed
    /// automatically.
    pub fn set_polygon_points(&mut self, id: ShapeId, points: &[(i32, i32)]) -> Result<()> {
        let opt = self.polygon_opt(id)?;
        let (vertices, segments) = shape::polygon_properties(points)?;
        if let Some(opt) = self.aggregate.tree_mut().opt_mut(opt) {
            opt.set(vertices);
            opt.set(segments);
        }
        Ok(())
    }

    /// Size of the polygon's own coordinate space.
    pub fn set_polygon_draw_area(&mut self, id: ShapeId, width: u32, height: u32) -> Result<()> {
        let opt = self.polygon_opt(id)?;
        if let Some(opt) = self.aggregate.tree_mut().opt_mut(opt) {
            opt.set(EscherProperty::simple(prop_id::GEOMETRY_RIGHT, width));
            opt.set(EscherProperty::simple(prop_id::GEOMETRY_BOTTOM, height));
        }
        Ok(())
    }

    // Pictures

    fn picture_opt(&self, id: ShapeId) -> Result<RecordId> {
        self.expect_kind(id, "picture", |kind| *kind == ShapeKind::Picture)?
            .records
            .opt
            .ok_or_else(|| Error::MalformedDrawing("picture has no Opt record".to_string()))
    }

    /// Index of the picture in the workbook's picture store.
    pub fn picture_index(&self, id: ShapeId) -> Result<u32> {
        let opt = self.picture_opt(id)?;
        Ok(self
            .aggregate
            .tree()
            .opt(opt)
            .and_then(|opt| opt.simple_value(prop_id::BLIP_TO_DISPLAY))
            .unwrap_or_default())
    }

    pub fn set_picture_index(&mut self, id: ShapeId, picture_index: u32) -> Result<()> {
        let opt = self.picture_opt(id)?;
        if let Some(opt) = self.aggregate.tree_mut().opt_mut(opt) {
            opt.set(EscherProperty::blip(prop_id::BLIP_TO_DISPLAY, picture_index));
        }
        Ok(())
    }

    // Simple shapes

    /// Change the geometry of a simple shape.
    pub fn set_simple_shape_type(&mut self, id: ShapeId, shape_type: SimpleShapeType) -> Result<()> {
        let records = self
            .expect_kind(id, "simple shape", |kind| matches!(kind, ShapeKind::SimpleShape(_)))?
            .records;

        if let Some(node) = self.aggregate.tree_mut().node_mut(records.sp) {
            node.set_instance(shape_type.shape_type());
        }
        if let Some(obj) = records
            .client_data
            .and_then(|data| self.aggregate.obj_mut(data))
            .and_then(ObjRecord::common_data_mut)
        {
            obj.object_type = shape_type.object_type();
        }
        self.get_mut(id)?.kind = ShapeKind::SimpleShape(Some(shape_type));
        Ok(())
    }
}

fn new_name(new: NewShape) -> &'static str {
    match new {
        NewShape::Group => "group",
        NewShape::SimpleShape(_) => "simple shape",
        NewShape::Picture { .. } => "picture",
        NewShape::Polygon => "polygon",
        NewShape::Textbox => "textbox",
        NewShape::Comment => "comment",
        NewShape::ComboBox => "combo box",
    }
}
