use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::checklist::{add_item, checklist_for_month, progress, set_checked, set_comment};
use crate::cli::{open_store, resolve_month, ChecklistCommands};
use crate::error::Result;

pub fn run(month: Option<&str>, command: ChecklistCommands) -> Result<()> {
    let (_, conn) = open_store()?;
    let month_year = resolve_month(&conn, month)?;
    // Seeds the defaults so ids are valid before any update.
    checklist_for_month(&conn, &month_year)?;

    match command {
        ChecklistCommands::List => {}
        ChecklistCommands::Check { id } => set_checked(&conn, id, true)?,
        ChecklistCommands::Uncheck { id } => set_checked(&conn, id, false)?,
        ChecklistCommands::Comment { id, text } => set_comment(&conn, id, &text)?,
        ChecklistCommands::Add { text } => {
            add_item(&conn, &month_year, &text)?;
        }
    }

    let items = checklist_for_month(&conn, &month_year)?;
    let mut table = Table::new();
    table.set_header(vec!["ID", "", "Punkt", "Kommentar"]);
    for item in &items {
        let mark = if item.checked { "✓".green().bold() } else { " ".normal() };
        table.add_row(vec![
            Cell::new(item.id),
            Cell::new(mark),
            Cell::new(&item.text),
            Cell::new(item.comment.as_deref().unwrap_or_default()),
        ]);
    }
    let (done, total) = progress(&items);
    println!("Sjekkliste {month_year}\n{table}");
    println!("{done}/{total} fullført");
    Ok(())
}
