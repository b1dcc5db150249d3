use std::path::PathBuf;

use chrono::{Local, TimeZone};
use comfy_table::{Cell, Table};

use crate::cli::open_store;
use crate::error::Result;
use crate::session::{active_session, counts_csv_file_name, get_session, list_sessions, write_counts_csv};

fn format_timestamp(millis: i64) -> String {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

pub fn list() -> Result<()> {
    let (_, conn) = open_store()?;
    let active_id = active_session(&conn)?.and_then(|s| s.id);
    let sessions = list_sessions(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Periode", "Fil", "Sist endret", "Telt", ""]);
    for s in sessions {
        let marker = if s.id == active_id { "aktiv" } else { "" };
        table.add_row(vec![
            Cell::new(s.id.unwrap_or_default()),
            Cell::new(&s.month_year),
            Cell::new(&s.file_name),
            Cell::new(format_timestamp(s.timestamp)),
            Cell::new(s.counts.len()),
            Cell::new(marker),
        ]);
    }
    println!("Historikk\n{table}");
    Ok(())
}

pub fn csv(id: i64, output: Option<String>) -> Result<()> {
    let (data_dir, conn) = open_store()?;
    let record = get_session(&conn, id)?;
    let path = output
        .map(PathBuf::from)
        .unwrap_or_else(|| data_dir.join("exports").join(counts_csv_file_name(&record)));
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    write_counts_csv(&record.counts, std::fs::File::create(&path)?)?;
    println!("Wrote {}", path.display());
    Ok(())
}
