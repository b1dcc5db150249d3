use rusqlite::{params, Connection};

use crate::error::{Result, VareError};
use crate::models::ChecklistItem;

/// Seeded the first time a month's checklist is opened.
pub const DEFAULT_ITEMS: [&str; 3] = [
    "Alle varer er telt",
    "Eventuelle avvik er notert",
    "Summert per kategori",
];

fn query_items(conn: &Connection, month_year: &str) -> Result<Vec<ChecklistItem>> {
    let mut stmt = conn.prepare(
        "SELECT id, month_year, text, checked, comment FROM checklist
         WHERE month_year = ?1 ORDER BY id",
    )?;
    let items = stmt
        .query_map([month_year], |row| {
            Ok(ChecklistItem {
                id: row.get(0)?,
                month_year: row.get(1)?,
                text: row.get(2)?,
                checked: row.get(3)?,
                comment: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(items)
}

/// The month's checklist, seeding the defaults when it has none yet.
pub fn checklist_for_month(conn: &Connection, month_year: &str) -> Result<Vec<ChecklistItem>> {
    let items = query_items(conn, month_year)?;
    if !items.is_empty() {
        return Ok(items);
    }
    for text in DEFAULT_ITEMS {
        add_item(conn, month_year, text)?;
    }
    query_items(conn, month_year)
}

pub fn add_item(conn: &Connection, month_year: &str, text: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO checklist (month_year, text, checked) VALUES (?1, ?2, 0)",
        params![month_year, text],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn set_checked(conn: &Connection, id: i64, checked: bool) -> Result<()> {
    let changed = conn.execute("UPDATE checklist SET checked = ?1 WHERE id = ?2", params![checked, id])?;
    if changed == 0 {
        return Err(VareError::UnknownChecklistItem(id));
    }
    Ok(())
}

/// An empty comment removes it.
pub fn set_comment(conn: &Connection, id: i64, comment: &str) -> Result<()> {
    let comment = Some(comment.trim()).filter(|c| !c.is_empty());
    let changed = conn.execute("UPDATE checklist SET comment = ?1 WHERE id = ?2", params![comment, id])?;
    if changed == 0 {
        return Err(VareError::UnknownChecklistItem(id));
    }
    Ok(())
}

/// (completed, total)
pub fn progress(items: &[ChecklistItem]) -> (usize, usize) {
    (items.iter().filter(|i| i.checked).count(), items.len())
}
