//! Property tests for shape-id allocation, bounds and comment ids.

use proptest::prelude::*;
use xls_drawing::ole::escher::EscherDg;
use xls_drawing::ole::xls::objects::ObjRecord;
use xls_drawing::{ClientAnchor, DrawingManager, SimpleShapeType, Workbook};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_allocator_never_repeats(groups in prop::collection::vec(1u16..4, 1..300)) {
        let mut manager = DrawingManager::new();
        let mut drawings = [EscherDg::default(), EscherDg::default(), EscherDg::default()];
        let mut seen = std::collections::HashSet::new();

        for dg_id in groups {
            let dg = &mut drawings[(dg_id - 1) as usize];
            let id = manager.allocate_shape_id(dg_id, dg).unwrap();
            prop_assert!(id >= 1024);
            prop_assert!(seen.insert(id), "shape id {} handed out twice", id);
            prop_assert!(dg.last_spid >= id);
        }
    }

    #[test]
    fn prop_bounds_are_stored_verbatim(
        x1 in any::<i32>(),
        y1 in any::<i32>(),
        x2 in any::<i32>(),
        y2 in any::<i32>(),
    ) {
        let mut workbook = Workbook::new();
        let drawing = workbook.create_sheet().create_drawing_patriarch().unwrap();
        drawing.set_coordinates(x1, y1, x2, y2);
        prop_assert_eq!(
            (drawing.x1(), drawing.y1(), drawing.x2(), drawing.y2()),
            (x1, y1, x2, y2)
        );
    }

    #[test]
    fn prop_comment_ids_stay_consistent(shape_id in 1025u32..=(1024 + 65535)) {
        let mut workbook = Workbook::new();
        let drawing = workbook.create_sheet().create_drawing_patriarch().unwrap();
        let comment = drawing.create_comment(ClientAnchor::default()).unwrap();
        drawing.set_shape_id(comment, shape_id).unwrap();

        let object_id = (shape_id - 1024) as u16;
        prop_assert_eq!(drawing.shape_id(comment).unwrap(), shape_id);
        prop_assert_eq!(drawing.obj_record(comment).and_then(ObjRecord::object_id), Some(object_id));
        prop_assert_eq!(drawing.note_record(comment).unwrap().object_id, object_id);
    }

    #[test]
    fn prop_create_remove_keeps_mirroring(ops in prop::collection::vec(0u8..4, 1..40)) {
        let mut workbook = Workbook::new();
        let drawing = workbook.create_sheet().create_drawing_patriarch().unwrap();

        for op in ops {
            match op {
                0 => { drawing.create_comment(ClientAnchor::default()).unwrap(); },
                1 => { drawing.create_simple_shape(ClientAnchor::default(), SimpleShapeType::Oval).unwrap(); },
                2 => { drawing.create_textbox(ClientAnchor::default()).unwrap(); },
                _ => {
                    if let Some(&first) = drawing.children().first() {
                        drawing.remove_shape(first).unwrap();
                    }
                },
            }
        }

        let aggregate = drawing.aggregate();
        let root = aggregate.escher_container().unwrap();
        let top = aggregate.tree().child_containers(root)[0];
        let persisted = aggregate.tree().child_containers(top).len() - 1;
        prop_assert_eq!(drawing.count_of_all_children(), persisted);

        let comments = drawing
            .children()
            .iter()
            .filter(|&&id| drawing.note_record(id).is_ok())
            .count();
        prop_assert_eq!(aggregate.tail_records().len(), comments);
    }
}
