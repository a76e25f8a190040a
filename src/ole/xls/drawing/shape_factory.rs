//! Shape factory: rebuilds shapes from persisted drawing records.
//!
//! # Implementation Notes
//!
//! - `SpgrContainer`: a group. Its first `SpContainer` describes the group
//!   itself; the remaining child containers are its children.
//! - `SpContainer`: a single shape. The variant is decided by the `OBJ`
//!   record attached to its `ClientData`.
//!
//! Shapes wrap the existing records. Nothing is copied and no shape id is
//! allocated.

use super::aggregate::DrawingAggregate;
use super::anchor::{Anchor, ChildAnchor, ClientAnchor};
use super::shape::{Parent, Shape, ShapeId, ShapeKind, ShapeRecords, SimpleShapeType};
use crate::common::error::{Error, Result};
use crate::log::debug;
use crate::ole::escher::{EscherTree, RecordId, ShapeFlags, prop_id, record_type};
use crate::ole::xls::objects::object_type;

/// Rebuild the shape stored in `container` and, for groups, all of its
/// descendants. Shapes are appended to `shapes`; the returned id is the
/// shape built from `container`.
pub(crate) fn create_shape_tree(
    aggregate: &DrawingAggregate,
    shapes: &mut Vec<Option<Shape>>,
    container: RecordId,
    parent: Parent,
) -> Result<ShapeId> {
    match aggregate.tree().record_type(container) {
        Some(record_type::SPGR_CONTAINER) => create_group(aggregate, shapes, container, parent),
        Some(record_type::SP_CONTAINER) => {
            let shape = create_shape(aggregate, container, parent)?;
            Ok(push(shapes, shape))
        },
        other => Err(Error::UnrecognizedShape(format!(
            "record 0x{:04X} is not a shape container",
            other.unwrap_or_default()
        ))),
    }
}

fn push(shapes: &mut Vec<Option<Shape>>, shape: Shape) -> ShapeId {
    shapes.push(Some(shape));
    ShapeId(shapes.len() - 1)
}

fn create_group(
    aggregate: &DrawingAggregate,
    shapes: &mut Vec<Option<Shape>>,
    container: RecordId,
    parent: Parent,
) -> Result<ShapeId> {
    let tree = aggregate.tree();
    let containers = tree.child_containers(container);
    let Some((&descriptor, members)) = containers.split_first() else {
        return Err(Error::UnrecognizedShape(
            "group container has no shape record".to_string(),
        ));
    };

    let mut records = shape_records(tree, container, descriptor)?;
    records.spgr = tree.child_by_type(descriptor, record_type::SPGR);
    let group = push(
        shapes,
        Shape {
            kind: ShapeKind::Group { children: Vec::new() },
            anchor: read_anchor(tree, &records),
            parent,
            records,
        },
    );

    let mut children = Vec::with_capacity(members.len());
    for &member in members {
        children.push(create_shape_tree(aggregate, shapes, member, Parent::Group(group))?);
    }
    if let Some(Some(Shape {
        kind: ShapeKind::Group { children: slot },
        ..
    })) = shapes.get_mut(group.0)
    {
        *slot = children;
    }

    Ok(group)
}

fn create_shape(aggregate: &DrawingAggregate, container: RecordId, parent: Parent) -> Result<Shape> {
    let tree = aggregate.tree();
    let records = shape_records(tree, container, container)?;

    let obj = records
        .client_data
        .and_then(|id| aggregate.obj(id))
        .ok_or_else(|| Error::UnrecognizedShape("shape has no OBJ record".to_string()))?;
    let cmo_type = obj
        .object_type()
        .ok_or_else(|| Error::UnrecognizedShape("OBJ record has no ftCmo".to_string()))?;

    let kind = match cmo_type {
        object_type::LINE | object_type::RECTANGLE | object_type::OVAL | object_type::ARC => {
            ShapeKind::SimpleShape(SimpleShapeType::from_object_type(cmo_type))
        },
        object_type::PICTURE => ShapeKind::Picture,
        object_type::TEXT => ShapeKind::Textbox,
        object_type::COMMENT => {
            let object_id = obj.object_id().unwrap_or_default();
            if aggregate.tail_record(object_id).is_none() {
                return Err(Error::UnrecognizedShape(format!(
                    "comment {} has no NOTE record",
                    object_id
                )));
            }
            ShapeKind::Comment
        },
        object_type::COMBO_BOX => ShapeKind::ComboBox,
        object_type::MICROSOFT_OFFICE_DRAWING => {
            let has_vertices = records
                .opt
                .and_then(|id| tree.opt(id))
                .is_some_and(|opt| opt.lookup(prop_id::VERTICES).is_some());
            if has_vertices {
                ShapeKind::Polygon
            } else {
                ShapeKind::SimpleShape(None)
            }
        },
        other => {
            return Err(Error::UnrecognizedShape(format!(
                "unsupported object type {} ({})",
                other,
                object_type::name(other)
            )));
        },
    };

    debug!("rebuilt {} from record {:?}", kind.name(), container);
    Ok(Shape {
        anchor: read_anchor(tree, &records),
        kind,
        parent,
        records,
    })
}

fn shape_records(tree: &EscherTree, container: RecordId, sp_container: RecordId) -> Result<ShapeRecords> {
    let sp = tree
        .shape_record(sp_container)
        .ok_or_else(|| Error::UnrecognizedShape("shape container has no Sp record".to_string()))?;
    let anchor = tree
        .child_by_type(sp_container, record_type::CLIENT_ANCHOR)
        .or_else(|| tree.child_by_type(sp_container, record_type::CHILD_ANCHOR));

    Ok(ShapeRecords {
        container,
        sp_container,
        sp,
        spgr: None,
        opt: tree.child_by_type(sp_container, record_type::OPT),
        anchor,
        client_data: tree.child_by_type(sp_container, record_type::CLIENT_DATA),
        client_textbox: tree.child_by_type(sp_container, record_type::CLIENT_TEXTBOX),
    })
}

fn read_anchor(tree: &EscherTree, records: &ShapeRecords) -> Anchor {
    let flags = tree.sp(records.sp).map_or(ShapeFlags::empty(), |sp| sp.flags);
    let flip_h = flags.contains(ShapeFlags::FLIP_H);
    let flip_v = flags.contains(ShapeFlags::FLIP_V);

    let anchor = match records.anchor {
        Some(id) if tree.record_type(id) == Some(record_type::CHILD_ANCHOR) => tree
            .child_anchor(id)
            .map(|rect| Anchor::Child(ChildAnchor::from_record(rect))),
        Some(id) => tree
            .client_anchor(id)
            .map(|record| Anchor::Client(ClientAnchor::from_record(record))),
        None => None,
    };
    anchor
        .unwrap_or(Anchor::Client(ClientAnchor::default()))
        .with_flips(flip_h, flip_v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ole::escher::{EscherAtom, EscherClientAnchor, EscherSp, options, shape_type};
    use crate::ole::xls::drawing::aggregate::AssociatedRecord;
    use crate::ole::xls::objects::{CommonObjectData, CommonObjectFlags, ObjRecord};

    fn top_group(aggregate: &DrawingAggregate) -> RecordId {
        let root = aggregate.escher_container().unwrap();
        aggregate.tree().child_containers(root)[0]
    }

    fn add_shape(aggregate: &mut DrawingAggregate, parent: RecordId, cmo_type: u16, flags: ShapeFlags) -> RecordId {
        let tree = aggregate.tree_mut();
        let sp = tree.atom(
            record_type::SP,
            options(2, shape_type::RECTANGLE),
            EscherAtom::Sp(EscherSp::new(1025, flags)),
        );
        let anchor = tree.atom(
            record_type::CLIENT_ANCHOR,
            0,
            EscherAtom::ClientAnchor(EscherClientAnchor {
                col1: 1,
                row1: 2,
                col2: 3,
                row2: 4,
                ..Default::default()
            }),
        );
        let data = tree.atom(record_type::CLIENT_DATA, 0, EscherAtom::Raw(Vec::new()));
        let container = tree.container(record_type::SP_CONTAINER, [sp, anchor, data]);
        tree.add_child(parent, container).unwrap();

        let mut cmo = CommonObjectData::new(cmo_type, CommonObjectFlags::LOCKED);
        cmo.object_id = 1;
        aggregate.associate(data, AssociatedRecord::Obj(ObjRecord::new(cmo)));
        container
    }

    #[test]
    fn test_rectangle_is_simple_shape() {
        let mut aggregate = DrawingAggregate::new_empty();
        let group = top_group(&aggregate);
        let container = add_shape(
            &mut aggregate,
            group,
            object_type::RECTANGLE,
            ShapeFlags::HAVE_ANCHOR | ShapeFlags::FLIP_V,
        );

        let mut shapes = Vec::new();
        let id = create_shape_tree(&aggregate, &mut shapes, container, Parent::Patriarch).unwrap();
        let shape = shapes[id.0].as_ref().unwrap();
        assert_eq!(shape.kind(), &ShapeKind::SimpleShape(Some(SimpleShapeType::Rectangle)));
        assert!(shape.anchor().is_vertically_flipped());
        assert!(!shape.anchor().is_horizontally_flipped());
        match shape.anchor() {
            Anchor::Client(anchor) => assert_eq!((anchor.col1, anchor.row2), (1, 4)),
            Anchor::Child(_) => panic!("expected a client anchor"),
        }
    }

    #[test]
    fn test_comment_without_note_is_unrecognized() {
        let mut aggregate = DrawingAggregate::new_empty();
        let group = top_group(&aggregate);
        let container = add_shape(&mut aggregate, group, object_type::COMMENT, ShapeFlags::HAVE_ANCHOR);

        let result = create_shape_tree(&aggregate, &mut Vec::new(), container, Parent::Patriarch);
        assert!(matches!(result, Err(Error::UnrecognizedShape(_))));
    }

    #[test]
    fn test_unknown_object_type_is_unrecognized() {
        let mut aggregate = DrawingAggregate::new_empty();
        let group = top_group(&aggregate);
        let container = add_shape(&mut aggregate, group, 0x12, ShapeFlags::HAVE_ANCHOR);

        let result = create_shape_tree(&aggregate, &mut Vec::new(), container, Parent::Patriarch);
        assert!(matches!(result, Err(Error::UnrecognizedShape(_))));
    }

    #[test]
    fn test_nested_group_skips_descriptor() {
        let mut aggregate = DrawingAggregate::new_empty();
        let group = top_group(&aggregate);

        let tree = aggregate.tree_mut();
        let sp = tree.atom(
            record_type::SP,
            options(2, 0),
            EscherAtom::Sp(EscherSp::new(1026, ShapeFlags::GROUP | ShapeFlags::HAVE_ANCHOR)),
        );
        let descriptor = tree.container(record_type::SP_CONTAINER, [sp]);
        let nested = tree.container(record_type::SPGR_CONTAINER, [descriptor]);
        tree.add_child(group, nested).unwrap();
        add_shape(&mut aggregate, nested, object_type::OVAL, ShapeFlags::CHILD);
        add_shape(&mut aggregate, nested, object_type::LINE, ShapeFlags::CHILD);

        let mut shapes = Vec::new();
        let id = create_shape_tree(&aggregate, &mut shapes, nested, Parent::Patriarch).unwrap();
        let group_shape = shapes[id.0].as_ref().unwrap();
        assert!(group_shape.kind().is_group());
        assert_eq!(group_shape.children().len(), 2);
        assert_eq!(shapes.len(), 3);

        let first = shapes[group_shape.children()[0].0].as_ref().unwrap();
        assert_eq!(first.parent(), Parent::Group(id));
        assert_eq!(first.kind(), &ShapeKind::SimpleShape(Some(SimpleShapeType::Oval)));
    }
}
