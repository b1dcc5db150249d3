use std::path::PathBuf;

use crate::cli::open_store;
use crate::error::Result;
use crate::session::load_active;
use crate::workbook::export_file_name;
use crate::writeback::apply_counts;

pub fn run(output: Option<String>) -> Result<()> {
    let (data_dir, conn) = open_store()?;
    let session = load_active(&conn, &data_dir)?;
    let record = &session.record;

    let bytes = apply_counts(&session.workbook, &record.counts, Some(&record.sheet_name))?;

    let path = output
        .map(PathBuf::from)
        .unwrap_or_else(|| data_dir.join("exports").join(export_file_name(&record.file_name)));
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, bytes)?;

    println!("Wrote {} counts to {}", record.counts.len(), path.display());
    Ok(())
}
