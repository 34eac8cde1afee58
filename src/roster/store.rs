//! CSV-backed roster storage.
//!
//! The roster file carries no type information, so cell kinds are inferred
//! on load (see [`Cell::parse`]) and every loaded field is written back
//! exactly as it was read. Missing rows are written as a single empty field
//! and come back as a row holding one blank cell.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::cell::Cell;
use super::sheet::{Row, Sheet};
use crate::error::Result;

/// Read the roster for a read-only pass. A missing file is an error.
pub fn open_for_read(path: &Path) -> Result<Sheet> {
    let file = fs::File::open(path)?;
    read_sheet(file)
}

/// Read the roster for a read-write pass. A missing file yields an empty sheet.
pub fn open_for_update(path: &Path) -> Result<Sheet> {
    match fs::File::open(path) {
        Ok(file) => read_sheet(file),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Roster file not found, starting empty");
            Ok(Sheet::new())
        }
        Err(err) => Err(err.into()),
    }
}

/// Write the roster to disk through a temporary sibling file.
pub fn persist(path: &Path, sheet: &Sheet) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp = tmp_path(path);
    {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .has_headers(false)
            .from_path(&tmp)?;
        write_sheet(&mut writer, sheet)?;
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    debug!(path = %path.display(), "Roster persisted");
    Ok(())
}

pub(crate) fn read_sheet<R: io::Read>(source: R) -> Result<Sheet> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(source);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let cells = record.iter().map(Cell::parse).collect();
        rows.push(Some(Row::new(cells)));
    }
    Ok(Sheet::from_rows(rows))
}

pub(crate) fn write_sheet<W: io::Write>(writer: &mut csv::Writer<W>, sheet: &Sheet) -> Result<()> {
    for slot in sheet.slots() {
        match slot {
            Some(row) if !row.is_empty() => {
                writer.write_record(row.cells().iter().map(Cell::to_field))?;
            }
            _ => writer.write_record([""])?,
        }
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
