//! Spreadsheet records paired with drawing shapes.
//!
//! - `obj`: OBJ record, one per shape (`ClientData`)
//! - `txo`: TXO record, the text of text boxes and comments (`ClientTextbox`)
//! - `note`: NOTE record, the cell side of a comment

pub mod note;
pub mod obj;
pub mod txo;

pub use note::{NOTE_HIDDEN, NOTE_VISIBLE, NoteRecord};
pub use obj::{
    CommonObjectData, CommonObjectFlags, NoteStructure, ObjRecord, ObjSubRecord, object_type,
};
pub use txo::{FormatRun, HorizontalAlignment, TextObjectRecord, VerticalAlignment};
