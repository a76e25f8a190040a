//! Shape model.
//!
//! Shapes are a closed set of variants stored in the patriarch's arena and
//! addressed by [`ShapeId`]. A shape does not own its records: it holds the
//! [`RecordId`]s of the Escher records backing it, while the `OBJ`, `TXO`
//! and `NOTE` records live in the drawing aggregate.
//!
//! The second half of this module builds the record subtree of a new shape
//! for each variant.

use super::anchor::Anchor;
use crate::common::error::Result;
use crate::ole::escher::{
    EscherArrayProperty, EscherAtom, EscherOpt, EscherProperty, EscherSp, EscherTree, RecordId,
    ShapeFlags, options, prop_id, record_type, shape_type,
};
use crate::ole::xls::objects::{
    CommonObjectData, CommonObjectFlags, NoteRecord, NoteStructure, ObjRecord, ObjSubRecord,
    TextObjectRecord, object_type,
};

/// Handle of a shape in a patriarch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(pub(crate) usize);

/// Container a shape belongs to. Never owning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parent {
    Patriarch,
    Group(ShapeId),
}

/// Geometry of a simple shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimpleShapeType {
    #[default]
    Line,
    Rectangle,
    Oval,
    Arc,
}

impl SimpleShapeType {
    /// `ftCmo` object type
    pub const fn object_type(self) -> u16 {
        match self {
            SimpleShapeType::Line => object_type::LINE,
            SimpleShapeType::Rectangle => object_type::RECTANGLE,
            SimpleShapeType::Oval => object_type::OVAL,
            SimpleShapeType::Arc => object_type::ARC,
        }
    }

    /// Escher shape type stored in the `Sp` instance
    pub const fn shape_type(self) -> u16 {
        match self {
            SimpleShapeType::Line => shape_type::LINE,
            SimpleShapeType::Rectangle => shape_type::RECTANGLE,
            SimpleShapeType::Oval => shape_type::ELLIPSE,
            SimpleShapeType::Arc => shape_type::ARC,
        }
    }

    pub fn from_object_type(value: u16) -> Option<Self> {
        match value {
            object_type::LINE => Some(SimpleShapeType::Line),
            object_type::RECTANGLE => Some(SimpleShapeType::Rectangle),
            object_type::OVAL => Some(SimpleShapeType::Oval),
            object_type::ARC => Some(SimpleShapeType::Arc),
            _ => None,
        }
    }
}

/// Shape variant with its variant-specific state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeKind {
    /// Children in z-order
    Group { children: Vec<ShapeId> },
    /// `None` when the object is an office drawing without vertices
    SimpleShape(Option<SimpleShapeType>),
    Picture,
    Polygon,
    Textbox,
    Comment,
    ComboBox,
}

impl ShapeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Group { .. } => "group",
            ShapeKind::SimpleShape(_) => "simple shape",
            ShapeKind::Picture => "picture",
            ShapeKind::Polygon => "polygon",
            ShapeKind::Textbox => "textbox",
            ShapeKind::Comment => "comment",
            ShapeKind::ComboBox => "combo box",
        }
    }

    #[inline]
    pub fn is_group(&self) -> bool {
        matches!(self, ShapeKind::Group { .. })
    }
}

/// What to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewShape {
    Group,
    SimpleShape(SimpleShapeType),
    Picture { picture_index: u32 },
    Polygon,
    Textbox,
    Comment,
    ComboBox,
}

/// Escher records backing a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeRecords {
    /// `SpgrContainer` for groups, the shape's `SpContainer` otherwise
    pub container: RecordId,
    /// The `SpContainer` describing the shape itself
    pub sp_container: RecordId,
    pub sp: RecordId,
    pub spgr: Option<RecordId>,
    pub opt: Option<RecordId>,
    pub anchor: Option<RecordId>,
    pub client_data: Option<RecordId>,
    pub client_textbox: Option<RecordId>,
}

/// A shape of the drawing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    pub(crate) kind: ShapeKind,
    pub(crate) anchor: Anchor,
    pub(crate) parent: Parent,
    pub(crate) records: ShapeRecords,
}

impl Shape {
    #[inline]
    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    #[inline]
    pub fn anchor(&self) -> &Anchor {
        &self.anchor
    }

    #[inline]
    pub fn parent(&self) -> Parent {
        self.parent
    }

    #[inline]
    pub fn records(&self) -> &ShapeRecords {
        &self.records
    }

    /// Children of a group; empty for other variants.
    pub fn children(&self) -> &[ShapeId] {
        match &self.kind {
            ShapeKind::Group { children } => children,
            _ => &[],
        }
    }
}

/// `GROUP_PRINT` value of a visible shape.
pub(crate) const GROUP_PRINT_VISIBLE: u32 = 0x0008_0000;
/// `GROUP_PRINT` value of a hidden comment.
pub(crate) const GROUP_PRINT_HIDDEN: u32 = 0x000A_0002;

const LINE_WIDTH_DEFAULT: u32 = 9525;
const FILL_COLOR_DEFAULT: u32 = 0x0800_0009;
const LINE_COLOR_DEFAULT: u32 = 0x0800_0040;
const COMMENT_FILL_COLOR: u32 = 0x0800_0050;
const NO_FILL_HIT_TEST_FALSE: u32 = 0x0001_0000;
const NO_LINE_DRAW_DASH: u32 = 0x0008_0008;
const SHAPE_PATH_COMPLEX: u32 = 4;
const POLYGON_DRAW_AREA: u32 = 100;

/// Records of a freshly built shape, not yet spliced into the drawing.
pub(crate) struct BuiltShape {
    pub kind: ShapeKind,
    pub records: ShapeRecords,
    pub obj: ObjRecord,
    pub text: Option<TextObjectRecord>,
    pub note: Option<NoteRecord>,
}

/// Build the detached record subtree and BIFF records of a new shape.
pub(crate) fn build(tree: &mut EscherTree, new: NewShape, anchor: &Anchor) -> BuiltShape {
    if new == NewShape::Group {
        return build_group(tree, anchor);
    }

    let (spt, obj, has_text) = match new {
        NewShape::SimpleShape(simple) => (
            simple.shape_type(),
            ObjRecord::new(common_data(simple.object_type())),
            true,
        ),
        NewShape::Picture { .. } => (
            shape_type::PICTURE_FRAME,
            ObjRecord::new(common_data(object_type::PICTURE))
                .with(ObjSubRecord::clipboard_format(0x0002))
                .with(ObjSubRecord::picture_options(0x0001)),
            false,
        ),
        NewShape::Polygon => (
            shape_type::NOT_PRIMITIVE,
            ObjRecord::new(common_data(object_type::MICROSOFT_OFFICE_DRAWING)),
            false,
        ),
        NewShape::Textbox => (
            shape_type::TEXT_BOX,
            ObjRecord::new(common_data(object_type::TEXT)),
            true,
        ),
        NewShape::Comment => (
            shape_type::TEXT_BOX,
            ObjRecord::new(common_data(object_type::COMMENT))
                .with(ObjSubRecord::Note(NoteStructure::default())),
            true,
        ),
        NewShape::ComboBox => (
            shape_type::HOST_CONTROL,
            ObjRecord::new(CommonObjectData::new(
                object_type::COMBO_BOX,
                CommonObjectFlags::LOCKED | CommonObjectFlags::AUTOFILL,
            ))
            .with(ObjSubRecord::check_box_link())
            .with(ObjSubRecord::auto_filter_list()),
            false,
        ),
        NewShape::Group => unreachable!("groups are built separately"),
    };

    let mut flags = ShapeFlags::HAVE_ANCHOR | ShapeFlags::HAVE_SPT;
    if matches!(anchor, Anchor::Child(_)) {
        flags |= ShapeFlags::CHILD;
    }

    let sp = tree.atom(record_type::SP, options(2, spt), EscherAtom::Sp(EscherSp::new(0, flags)));
    let opt_props = default_properties(new);
    let opt = tree.atom(record_type::OPT, options(3, 0), EscherAtom::Opt(opt_props));
    let anchor_record = anchor_record(tree, anchor);
    let client_data = tree.atom(record_type::CLIENT_DATA, 0, EscherAtom::Raw(Vec::new()));

    let mut children = vec![sp, opt, anchor_record, client_data];
    let client_textbox = has_text.then(|| {
        let id = tree.atom(record_type::CLIENT_TEXTBOX, 0, EscherAtom::Raw(Vec::new()));
        children.push(id);
        id
    });
    let container = tree.container(record_type::SP_CONTAINER, children);

    let kind = match new {
        NewShape::SimpleShape(simple) => ShapeKind::SimpleShape(Some(simple)),
        NewShape::Picture { .. } => ShapeKind::Picture,
        NewShape::Polygon => ShapeKind::Polygon,
        NewShape::Textbox => ShapeKind::Textbox,
        NewShape::Comment => ShapeKind::Comment,
        NewShape::ComboBox => ShapeKind::ComboBox,
        NewShape::Group => ShapeKind::Group { children: Vec::new() },
    };

    BuiltShape {
        kind,
        records: ShapeRecords {
            container,
            sp_container: container,
            sp,
            spgr: None,
            opt: Some(opt),
            anchor: Some(anchor_record),
            client_data: Some(client_data),
            client_textbox,
        },
        obj,
        text: has_text.then(TextObjectRecord::default),
        note: (new == NewShape::Comment).then(NoteRecord::default),
    }
}

fn build_group(tree: &mut EscherTree, anchor: &Anchor) -> BuiltShape {
    let mut flags = ShapeFlags::GROUP | ShapeFlags::HAVE_ANCHOR;
    if matches!(anchor, Anchor::Child(_)) {
        flags |= ShapeFlags::CHILD;
    }

    let spgr = tree.atom(
        record_type::SPGR,
        options(1, 0),
        EscherAtom::Spgr(super::aggregate::DEFAULT_GROUP_BOUNDS),
    );
    let sp = tree.atom(
        record_type::SP,
        options(2, shape_type::NOT_PRIMITIVE),
        EscherAtom::Sp(EscherSp::new(0, flags)),
    );
    let anchor_record = anchor_record(tree, anchor);
    let client_data = tree.atom(record_type::CLIENT_DATA, 0, EscherAtom::Raw(Vec::new()));
    let sp_container =
        tree.container(record_type::SP_CONTAINER, [spgr, sp, anchor_record, client_data]);
    let container = tree.container(record_type::SPGR_CONTAINER, [sp_container]);

    BuiltShape {
        kind: ShapeKind::Group { children: Vec::new() },
        records: ShapeRecords {
            container,
            sp_container,
            sp,
            spgr: Some(spgr),
            opt: None,
            anchor: Some(anchor_record),
            client_data: Some(client_data),
            client_textbox: None,
        },
        obj: ObjRecord::new(common_data(object_type::GROUP)),
        text: None,
        note: None,
    }
}

fn anchor_record(tree: &mut EscherTree, anchor: &Anchor) -> RecordId {
    match anchor {
        Anchor::Client(client) => tree.atom(
            record_type::CLIENT_ANCHOR,
            0,
            EscherAtom::ClientAnchor(client.to_record()),
        ),
        Anchor::Child(child) => {
            tree.atom(record_type::CHILD_ANCHOR, 0, EscherAtom::ChildAnchor(child.to_record()))
        },
    }
}

fn common_data(object_type: u16) -> CommonObjectData {
    CommonObjectData::new(
        object_type,
        CommonObjectFlags::LOCKED
            | CommonObjectFlags::PRINTABLE
            | CommonObjectFlags::AUTOFILL
            | CommonObjectFlags::AUTOLINE,
    )
}

fn line_and_fill(opt: &mut EscherOpt) {
    opt.set(EscherProperty::simple(prop_id::LINE_DASHING, 0));
    opt.set(EscherProperty::simple(prop_id::NO_LINE_DRAW_DASH, NO_LINE_DRAW_DASH));
    opt.set(EscherProperty::simple(prop_id::LINE_WIDTH, LINE_WIDTH_DEFAULT));
    opt.set(EscherProperty::simple(prop_id::FILL_COLOR, FILL_COLOR_DEFAULT));
    opt.set(EscherProperty::simple(prop_id::LINE_COLOR, LINE_COLOR_DEFAULT));
    opt.set(EscherProperty::simple(prop_id::NO_FILL_HIT_TEST, NO_FILL_HIT_TEST_FALSE));
    opt.set(EscherProperty::simple(prop_id::GROUP_PRINT, GROUP_PRINT_VISIBLE));
}

fn text_properties(opt: &mut EscherOpt) {
    opt.set(EscherProperty::simple(prop_id::TEXT_ID, 0));
    opt.set(EscherProperty::simple(prop_id::WRAP_TEXT, 0));
    opt.set(EscherProperty::simple(prop_id::ANCHOR_TEXT, 0));
}

fn default_properties(new: NewShape) -> EscherOpt {
    let mut opt = EscherOpt::new();
    match new {
        NewShape::SimpleShape(_) => line_and_fill(&mut opt),
        NewShape::Picture { picture_index } => {
            line_and_fill(&mut opt);
            opt.remove(prop_id::LINE_DASHING);
            opt.remove(prop_id::NO_LINE_DRAW_DASH);
            opt.set(EscherProperty::blip(prop_id::BLIP_TO_DISPLAY, picture_index));
        },
        NewShape::Polygon => {
            line_and_fill(&mut opt);
            opt.remove(prop_id::LINE_DASHING);
            opt.set(EscherProperty::simple(prop_id::GEOMETRY_RIGHT, POLYGON_DRAW_AREA));
            opt.set(EscherProperty::simple(prop_id::GEOMETRY_BOTTOM, POLYGON_DRAW_AREA));
            opt.set(EscherProperty::simple(prop_id::SHAPE_PATH, SHAPE_PATH_COMPLEX));
            opt.set(EscherProperty::simple(prop_id::FILL_OK, 0x0001_0001));
            opt.set(EscherProperty::complex(
                prop_id::VERTICES,
                EscherArrayProperty::new(EscherArrayProperty::POINT_ELEMENT_SIZE).to_bytes(),
            ));
        },
        NewShape::Textbox => {
            text_properties(&mut opt);
            for id in [prop_id::TEXT_LEFT, prop_id::TEXT_TOP, prop_id::TEXT_RIGHT, prop_id::TEXT_BOTTOM] {
                opt.set(EscherProperty::simple(id, 0));
            }
            line_and_fill(&mut opt);
        },
        NewShape::Comment => {
            text_properties(&mut opt);
            line_and_fill(&mut opt);
            opt.set(EscherProperty::simple(prop_id::FILL_COLOR, COMMENT_FILL_COLOR));
            opt.set(EscherProperty::simple(prop_id::GROUP_PRINT, GROUP_PRINT_HIDDEN));
        },
        NewShape::ComboBox => {
            opt.set(EscherProperty::simple(prop_id::SIZE_TEXT_TO_FIT_SHAPE, 0x0008_0008));
            opt.set(EscherProperty::simple(prop_id::NO_LINE_DRAW_DASH, 0x0008_0000));
            opt.set(EscherProperty::simple(prop_id::GROUP_PRINT, 0x0002_0000));
        },
        NewShape::Group => {},
    }
    opt
}

/// Vertices and segment info of a closed polygon through `points`.
pub(crate) fn polygon_properties(points: &[(i32, i32)]) -> Result<(EscherProperty, EscherProperty)> {
    let mut vertices = EscherArrayProperty::new(EscherArrayProperty::POINT_ELEMENT_SIZE);
    let point_bytes = |(x, y): (i32, i32)| {
        let mut element = Vec::with_capacity(4);
        element.extend_from_slice(&(x as i16).to_le_bytes());
        element.extend_from_slice(&(y as i16).to_le_bytes());
        element
    };
    for &point in points {
        vertices.push(point_bytes(point))?;
    }
    if let Some(&first) = points.first() {
        vertices.push(point_bytes(first))?;
    }

    let mut segments = EscherArrayProperty::new(2);
    if !points.is_empty() {
        segments.push(0x4000u16.to_le_bytes().to_vec())?;
        for _ in 1..points.len() {
            segments.push(0xAC01u16.to_le_bytes().to_vec())?;
        }
        segments.push(0x6001u16.to_le_bytes().to_vec())?;
        segments.push(0x8000u16.to_le_bytes().to_vec())?;
    }

    Ok((
        EscherProperty::complex(prop_id::VERTICES, vertices.to_bytes()),
        EscherProperty::complex(prop_id::SEGMENT_INFO, segments.to_bytes()),
    ))
}

/// Points stored in a vertices property, without the closing point.
pub(crate) fn polygon_points(vertices: &[u8]) -> Vec<(i32, i32)> {
    let Ok(array) = EscherArrayProperty::parse(vertices) else {
        return Vec::new();
    };
    let mut points: Vec<(i32, i32)> = array
        .elements()
        .filter(|element| element.len() >= 4)
        .map(|element| {
            let x = i16::from_le_bytes([element[0], element[1]]);
            let y = i16::from_le_bytes([element[2], element[3]]);
            (x as i32, y as i32)
        })
        .collect();
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ole::xls::drawing::anchor::{ChildAnchor, ClientAnchor};

    fn client() -> Anchor {
        Anchor::Client(ClientAnchor::default())
    }

    #[test]
    fn test_comment_records() {
        let mut tree = EscherTree::new();
        let built = build(&mut tree, NewShape::Comment, &client());

        assert_eq!(tree.children(built.records.container).len(), 5);
        assert_eq!(tree.node(built.records.sp).unwrap().instance(), shape_type::TEXT_BOX);
        assert_eq!(tree.opt(built.records.opt.unwrap()).unwrap().len(), 10);
        assert_eq!(built.obj.object_type(), Some(object_type::COMMENT));
        assert_eq!(built.obj.sub_records.len(), 2);
        assert!(built.text.is_some());
        assert!(built.note.is_some());
    }

    #[test]
    fn test_group_records() {
        let mut tree = EscherTree::new();
        let built = build(&mut tree, NewShape::Group, &client());

        assert_eq!(tree.record_type(built.records.container), Some(record_type::SPGR_CONTAINER));
        assert_eq!(tree.child(built.records.container, 0), Some(built.records.sp_container));
        let sp = tree.sp(built.records.sp).unwrap();
        assert_eq!(sp.flags, ShapeFlags::GROUP | ShapeFlags::HAVE_ANCHOR);
        assert!(built.records.spgr.is_some());
        assert_eq!(built.obj.object_type(), Some(object_type::GROUP));
    }

    #[test]
    fn test_child_shapes_use_child_anchor() {
        let mut tree = EscherTree::new();
        let anchor = Anchor::Child(ChildAnchor::new(0, 0, 100, 100));
        let built = build(&mut tree, NewShape::SimpleShape(SimpleShapeType::Oval), &anchor);

        let sp = tree.sp(built.records.sp).unwrap();
        assert!(sp.flags.contains(ShapeFlags::CHILD));
        assert_eq!(tree.record_type(built.records.anchor.unwrap()), Some(record_type::CHILD_ANCHOR));
        assert_eq!(tree.node(built.records.sp).unwrap().instance(), shape_type::ELLIPSE);
    }

    #[test]
    fn test_picture_and_combo_have_no_text() {
        let mut tree = EscherTree::new();
        let picture = build(&mut tree, NewShape::Picture { picture_index: 3 }, &client());
        assert!(picture.records.client_textbox.is_none());
        let opt = tree.opt(picture.records.opt.unwrap()).unwrap();
        let blip = opt.lookup(prop_id::BLIP_TO_DISPLAY).unwrap();
        assert!(blip.is_blip_id);
        assert_eq!(blip.simple_value(), Some(3));

        let combo = build(&mut tree, NewShape::ComboBox, &client());
        assert!(combo.text.is_none());
        assert_eq!(tree.node(combo.records.sp).unwrap().instance(), shape_type::HOST_CONTROL);
    }

    #[test]
    fn test_polygon_geometry() {
        let (vertices, segments) = polygon_properties(&[(1, 2), (3, 4), (5, 6)]).unwrap();
        let vertex_bytes = vertices.complex_data().unwrap();
        // 3 points plus the closing point
        assert_eq!(&vertex_bytes[0..6], &[4, 0, 4, 0, 0xF0, 0xFF]);
        assert_eq!(polygon_points(vertex_bytes), vec![(1, 2), (3, 4), (5, 6)]);

        let segment_bytes = segments.complex_data().unwrap();
        let values: Vec<u16> = segment_bytes[6..]
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        assert_eq!(values, vec![0x4000, 0xAC01, 0xAC01, 0x6001, 0x8000]);
    }

    #[test]
    fn test_simple_shape_type_mapping() {
        for simple in [
            SimpleShapeType::Line,
            SimpleShapeType::Rectangle,
            SimpleShapeType::Oval,
            SimpleShapeType::Arc,
        ] {
            assert_eq!(SimpleShapeType::from_object_type(simple.object_type()), Some(simple));
        }
        assert_eq!(SimpleShapeType::from_object_type(object_type::PICTURE), None);
    }
}
