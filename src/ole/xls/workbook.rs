//! Minimal workbook host for sheet drawings.
//!
//! A [`Workbook`] owns the workbook-wide [`DrawingManager`] and a list of
//! [`Sheet`]s, each with at most one [`Patriarch`]. It reads and writes the
//! BIFF8 workbook stream carrying the drawing records:
//!
//! ```text
//! BOF(globals) MSODRAWINGGROUP EOF
//! BOF(worksheet) MSODRAWING OBJ ... TXO CONTINUE CONTINUE ... NOTE ... EOF
//! ...
//! ```
//!
//! Cells, formats and every other record kind are not part of this model;
//! foreign records are skipped when reading.
//!
//! # Example
//!
//! ```rust,no_run
//! use xls_drawing::ole::xls::Workbook;
//! use xls_drawing::ole::xls::drawing::ClientAnchor;
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.create_sheet();
//! let patriarch = sheet.create_drawing_patriarch()?;
//! let comment = patriarch.create_comment(ClientAnchor::default())?;
//! patriarch.set_string(comment, "Check this total")?;
//!
//! workbook.save("comments.bin")?;
//! let reopened = Workbook::open("comments.bin")?;
//! assert_eq!(reopened.sheets().len(), 1);
//! # Ok::<(), xls_drawing::Error>(())
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;

use super::drawing::{DrawingAggregate, DrawingManager, DrawingManagerHandle, Patriarch};
use super::records::{BofRecord, Record, RecordIter, bof_type, sid};
use super::writer::biff::{write_bof, write_eof, write_record};
use crate::common::error::{Error, Result};
use crate::log::{debug, warn};

/// One worksheet and its drawing.
#[derive(Debug)]
pub struct Sheet {
    manager: DrawingManagerHandle,
    patriarch: Option<Patriarch>,
}

impl Sheet {
    fn new(manager: DrawingManagerHandle) -> Self {
        Self {
            manager,
            patriarch: None,
        }
    }

    /// Give the sheet a new, empty drawing and return its patriarch.
    ///
    /// An existing drawing is dropped, but its drawing group and shape ids
    /// stay reserved in the workbook; the new drawing gets a fresh group.
    pub fn create_drawing_patriarch(&mut self) -> Result<&mut Patriarch> {
        let mut patriarch = Patriarch::bind(DrawingAggregate::new_empty(), self.manager.clone())?;
        patriarch.after_create()?;
        Ok(self.patriarch.insert(patriarch))
    }

    #[inline]
    pub fn drawing_patriarch(&self) -> Option<&Patriarch> {
        self.patriarch.as_ref()
    }

    #[inline]
    pub fn drawing_patriarch_mut(&mut self) -> Option<&mut Patriarch> {
        self.patriarch.as_mut()
    }
}

/// Workbook holding sheet drawings.
#[derive(Debug)]
pub struct Workbook {
    manager: DrawingManagerHandle,
    sheets: Vec<Sheet>,
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

impl Workbook {
    pub fn new() -> Self {
        Self {
            manager: DrawingManager::new().into_handle(),
            sheets: Vec::new(),
        }
    }

    /// Append an empty sheet.
    pub fn create_sheet(&mut self) -> &mut Sheet {
        self.sheets.push(Sheet::new(self.manager.clone()));
        let index = self.sheets.len() - 1;
        &mut self.sheets[index]
    }

    #[inline]
    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    #[inline]
    pub fn sheet(&self, index: usize) -> Option<&Sheet> {
        self.sheets.get(index)
    }

    #[inline]
    pub fn sheet_mut(&mut self, index: usize) -> Option<&mut Sheet> {
        self.sheets.get_mut(index)
    }

    /// The workbook's drawing manager.
    #[inline]
    pub fn drawing_manager(&self) -> &DrawingManagerHandle {
        &self.manager
    }

    /// Write the workbook stream.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_bof(writer, bof_type::WORKBOOK_GLOBALS)?;
        if self.sheets.iter().any(|sheet| sheet.patriarch.is_some()) {
            let dgg_container = self.manager.lock().to_dgg_container();
            write_record(writer, sid::MSODRAWINGGROUP, &dgg_container)?;
        }
        write_eof(writer)?;

        for sheet in &self.sheets {
            write_bof(writer, bof_type::WORKSHEET)?;
            if let Some(patriarch) = &sheet.patriarch {
                patriarch.aggregate().write(writer)?;
            }
            write_eof(writer)?;
        }
        Ok(())
    }

    /// Serialize the workbook stream into memory.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }

    /// Write the workbook stream to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Read a workbook stream and rebind every sheet drawing.
    pub fn read<R: Read + Seek>(reader: R) -> Result<Self> {
        let records = RecordIter::new(reader)?.collect::<Result<Vec<_>>>()?;
        let substreams = split_substreams(&records)?;
        let (globals, sheets) = substreams
            .split_first()
            .ok_or_else(|| Error::invalid_record(sid::BOF, "stream has no workbook globals"))?;

        let dgg_container = drawing_group_data(globals);
        let manager = if dgg_container.is_empty() {
            DrawingManager::new()
        } else {
            DrawingManager::from_dgg_container(&dgg_container)?
        }
        .into_handle();

        let mut workbook = Self {
            manager,
            sheets: Vec::with_capacity(sheets.len()),
        };
        for records in sheets {
            let mut sheet = Sheet::new(workbook.manager.clone());
            if let Some(aggregate) = DrawingAggregate::from_records(records)? {
                let dg_id = aggregate.dg_id().unwrap_or_default();
                workbook
                    .manager
                    .lock()
                    .register_existing_drawing(dg_id, aggregate.shape_ids());
                sheet.patriarch = Some(Patriarch::bind(aggregate, workbook.manager.clone())?);
            }
            workbook.sheets.push(sheet);
        }

        debug!("read workbook with {} sheets", workbook.sheets.len());
        Ok(workbook)
    }

    /// Read a workbook stream held in memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::read(Cursor::new(bytes))
    }

    /// Read a workbook stream from a file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::read(BufReader::new(File::open(path)?))
    }
}

/// Split a record stream at `BOF`/`EOF` into the globals substream and the
/// sheet substreams. Only worksheet substreams after the globals are kept.
fn split_substreams(records: &[Record]) -> Result<Vec<&[Record]>> {
    let mut substreams = Vec::new();
    let mut start = None;

    for (index, record) in records.iter().enumerate() {
        match record.sid() {
            sid::BOF => {
                let bof = BofRecord::parse(&record.data)?;
                if start.is_some() {
                    return Err(Error::invalid_record(sid::BOF, "nested substream"));
                }
                let is_wanted = if substreams.is_empty() {
                    bof.stream_type == bof_type::WORKBOOK_GLOBALS
                } else {
                    bof.stream_type == bof_type::WORKSHEET
                };
                if is_wanted {
                    start = Some(index + 1);
                } else {
                    warn!("skipping substream of type 0x{:04X}", bof.stream_type);
                    start = Some(usize::MAX);
                }
            },
            sid::EOF => match start.take() {
                Some(usize::MAX) => {},
                Some(first) => substreams.push(&records[first..index]),
                None => return Err(Error::invalid_record(sid::EOF, "EOF outside a substream")),
            },
            _ => {},
        }
    }

    if start.is_some() {
        return Err(Error::invalid_record(sid::EOF, "substream is not terminated"));
    }
    Ok(substreams)
}

/// Body of `MSODRAWINGGROUP` with its `CONTINUE` records appended.
fn drawing_group_data(globals: &[Record]) -> Vec<u8> {
    let mut data = Vec::new();
    let mut in_group = false;
    for record in globals {
        match record.sid() {
            sid::MSODRAWINGGROUP => {
                data.extend_from_slice(&record.data);
                in_group = true;
            },
            sid::CONTINUE if in_group => data.extend_from_slice(&record.data),
            _ => in_group = false,
        }
    }
    data
}
