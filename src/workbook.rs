use std::io::Cursor;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_from_rs, Reader, Xlsx};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{ParseError, Result};
use crate::sheet::Sheet;

/// Sheet used when the caller does not ask for one and the workbook has it.
pub const PREFERRED_SHEET: &str = "VARETELLINGSLISTE";

pub struct LoadedSheet {
    pub name: String,
    pub grid: Sheet,
}

/// Requested sheet if present, else `VARETELLINGSLISTE`, else the first sheet.
pub fn select_sheet<'a>(names: &'a [String], requested: Option<&str>) -> Option<&'a str> {
    let find = |wanted: &str| names.iter().find(|n| n.as_str() == wanted);
    requested
        .and_then(find)
        .or_else(|| find(PREFERRED_SHEET))
        .or_else(|| names.first())
        .map(String::as_str)
}

pub fn load_sheet(bytes: &[u8], requested: Option<&str>) -> std::result::Result<LoadedSheet, ParseError> {
    let mut workbook: Xlsx<Cursor<&[u8]>> = open_workbook_from_rs(Cursor::new(bytes))
        .map_err(|e: calamine::XlsxError| ParseError::Workbook(e.to_string()))?;
    let names = workbook.sheet_names();
    let name = select_sheet(&names, requested)
        .ok_or(ParseError::SheetNotFound)?
        .to_string();
    let grid = workbook
        .worksheet_range(&name)
        .map_err(|e| ParseError::Workbook(e.to_string()))?;
    debug!(sheet = %name, rows = grid.height(), cols = grid.width(), "loaded worksheet");
    Ok(LoadedSheet { name, grid })
}

pub fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

pub fn workbook_path(data_dir: &Path, checksum: &str) -> PathBuf {
    data_dir.join("workbooks").join(format!("{checksum}.xlsx"))
}

/// Keeps a copy of an imported workbook so later exports do not depend on the
/// original file still being where it was. Returns the checksum naming the copy.
pub fn store_workbook(data_dir: &Path, bytes: &[u8]) -> Result<String> {
    let sum = checksum(bytes);
    let path = workbook_path(data_dir, &sum);
    if !path.exists() {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, bytes)?;
    }
    Ok(sum)
}

/// "Varetelling mars.xlsx" -> "Varetelling mars-oppdatert.xlsx".
pub fn export_file_name(original: &str) -> String {
    let split = original.len().saturating_sub(5);
    let base = match (original.get(..split), original.get(split..)) {
        (Some(stem), Some(ext)) if ext.eq_ignore_ascii_case(".xlsx") => stem,
        _ => original,
    };
    let base = if base.is_empty() { "varetelling" } else { base };
    format!("{base}-oppdatert.xlsx")
}
