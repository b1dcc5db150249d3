use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::open_store;
use crate::error::Result;
use crate::filter::{filter_items, is_high_value, line_value, ItemFilter};
use crate::fmt::{count, kroner};
use crate::session::load_active;
use crate::settings::load_settings;

pub fn run(filter: ItemFilter, threshold: Option<f64>) -> Result<()> {
    let (data_dir, conn) = open_store()?;
    let session = load_active(&conn, &data_dir)?;
    let threshold = threshold.unwrap_or(load_settings().price_threshold);
    let counts = &session.record.counts;
    let shown = filter_items(&session.items, counts, &filter);

    let mut table = Table::new();
    table.set_header(vec!["Rad", "Art.nr.", "Varenavn", "Enhet", "Antall", "Telt", ""]);

    let mut current_category: Option<&str> = None;
    for item in &shown {
        if current_category != Some(item.kategori.as_str()) {
            current_category = Some(item.kategori.as_str());
            let label = if item.kategori.is_empty() { "(uten kategori)" } else { item.kategori.as_str() };
            table.add_row(vec![Cell::new(""), Cell::new(""), Cell::new(label.bold())]);
        }
        let live = counts.get(&item.row_index).copied();
        let unit = match &item.pakningsinfo {
            Some(info) => format!("{} ({info})", item.enhet),
            None => item.enhet.clone(),
        };
        let flag = if is_high_value(live, item.pris_per_forpakning, threshold) {
            let value = line_value(live, item.pris_per_forpakning);
            format!("Høy verdi – dobbeltsjekk ({})", kroner(value)).red().bold().to_string()
        } else {
            String::new()
        };
        table.add_row(vec![
            Cell::new(item.row_index),
            Cell::new(&item.artikkelnummer),
            Cell::new(&item.navn),
            Cell::new(unit),
            Cell::new(item.antall.map(count).unwrap_or_default()),
            Cell::new(live.map(count).unwrap_or_default()),
            Cell::new(flag),
        ]);
    }

    let counted = session.items.iter().filter(|i| counts.contains_key(&i.row_index)).count();
    println!(
        "{} ({})\n{table}",
        session.record.file_name, session.record.month_year
    );
    println!("{counted} of {} items counted, {} shown", session.items.len(), shown.len());
    Ok(())
}
