//! OLE-era binary formats
//!
//! - `escher`: the OfficeArt (Escher) drawing record tree shared by the
//!   legacy Office formats
//! - `xls`: the BIFF8 records and shape tree of spreadsheet drawings

/// OfficeArt (Escher) record tree
pub mod escher;

/// Legacy Excel drawing layer
pub mod xls;
