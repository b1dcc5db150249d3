use std::path::Path;

use chrono::Local;

use crate::cli::open_store;
use crate::error::Result;
use crate::period::{month_year_from_file_name, parse_month_year};
use crate::session::import_workbook;
use crate::settings::load_settings;

pub fn run(file: &str, sheet: Option<&str>, period: Option<&str>) -> Result<()> {
    let path = Path::new(file);
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file.to_string());

    let month_year = match period {
        Some(p) => parse_month_year(p)?,
        None => month_year_from_file_name(&file_name, Local::now().date_naive()),
    };
    let settings = load_settings();
    let sheet = sheet.or(settings.sheet_name.as_deref());

    let (data_dir, conn) = open_store()?;
    let summary = import_workbook(&conn, &data_dir, &file_name, &bytes, sheet, &month_year)?;

    println!(
        "Imported {file_name} as session {} (sheet {}, period {})",
        summary.session_id, summary.sheet_name, summary.month_year
    );
    println!("{} items in {} categories", summary.items, summary.categories);
    if summary.restored > 0 {
        println!("Restored {} counts from the previous session", summary.restored);
    }
    Ok(())
}
