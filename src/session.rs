use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::db::{get_metadata, now_millis, set_metadata};
use crate::error::{Result, VareError};
use crate::models::{CountsByRow, Item, SessionRecord};
use crate::sheet::parse_sheet;
use crate::workbook::{load_sheet, store_workbook, workbook_path};

pub const ACTIVE_SESSION_KEY: &str = "active_session";

const SESSION_COLUMNS: &str = "id, month_year, file_name, checksum, sheet_name, counts, timestamp";

type SessionRow = (i64, String, String, String, String, String, i64);

fn read_row(row: &rusqlite::Row) -> rusqlite::Result<SessionRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn into_record(row: SessionRow) -> Result<SessionRecord> {
    let (id, month_year, file_name, checksum, sheet_name, counts, timestamp) = row;
    Ok(SessionRecord {
        id: Some(id),
        month_year,
        file_name,
        checksum,
        sheet_name,
        counts: serde_json::from_str(&counts)?,
        timestamp,
    })
}

/// Inserts or replaces the record for `(month_year, file_name)`. Returns its id.
pub fn upsert_session(conn: &Connection, record: &SessionRecord) -> Result<i64> {
    let counts = serde_json::to_string(&record.counts)?;
    conn.execute(
        "INSERT INTO sessions (month_year, file_name, checksum, sheet_name, counts, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(month_year, file_name) DO UPDATE SET
            checksum = excluded.checksum,
            sheet_name = excluded.sheet_name,
            counts = excluded.counts,
            timestamp = excluded.timestamp",
        params![
            record.month_year,
            record.file_name,
            record.checksum,
            record.sheet_name,
            counts,
            record.timestamp
        ],
    )?;
    let id = conn.query_row(
        "SELECT id FROM sessions WHERE month_year = ?1 AND file_name = ?2",
        params![record.month_year, record.file_name],
        |r| r.get(0),
    )?;
    Ok(id)
}

pub fn find_session(conn: &Connection, month_year: &str, file_name: &str) -> Result<Option<SessionRecord>> {
    let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE month_year = ?1 AND file_name = ?2");
    conn.query_row(&sql, params![month_year, file_name], read_row)
        .optional()?
        .map(into_record)
        .transpose()
}

pub fn get_session(conn: &Connection, id: i64) -> Result<SessionRecord> {
    let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1");
    let row = conn
        .query_row(&sql, [id], read_row)
        .optional()?
        .ok_or(VareError::UnknownSession(id))?;
    into_record(row)
}

/// All sessions, most recently written first.
pub fn list_sessions(conn: &Connection) -> Result<Vec<SessionRecord>> {
    let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions ORDER BY timestamp DESC, id DESC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], read_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    rows.into_iter().map(into_record).collect()
}

pub fn set_active(conn: &Connection, id: i64) -> Result<()> {
    set_metadata(conn, ACTIVE_SESSION_KEY, &id.to_string())
}

pub fn active_session(conn: &Connection) -> Result<Option<SessionRecord>> {
    let id = match get_metadata(conn, ACTIVE_SESSION_KEY)?.and_then(|v| v.parse::<i64>().ok()) {
        Some(id) => id,
        None => return Ok(None),
    };
    match get_session(conn, id) {
        Ok(record) => Ok(Some(record)),
        Err(VareError::UnknownSession(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn require_active(conn: &Connection) -> Result<SessionRecord> {
    active_session(conn)?.ok_or(VareError::NoActiveSession)
}

/// The active session together with its stored workbook and parsed items.
pub struct LoadedSession {
    pub record: SessionRecord,
    pub workbook: Vec<u8>,
    pub items: Vec<Item>,
}

pub fn load_session(data_dir: &Path, record: SessionRecord) -> Result<LoadedSession> {
    let workbook = std::fs::read(workbook_path(data_dir, &record.checksum))?;
    let loaded = load_sheet(&workbook, Some(&record.sheet_name))?;
    let items = parse_sheet(&loaded.grid)?.items;
    Ok(LoadedSession { record, workbook, items })
}

pub fn load_active(conn: &Connection, data_dir: &Path) -> Result<LoadedSession> {
    load_session(data_dir, require_active(conn)?)
}

#[derive(Debug)]
pub struct ImportSummary {
    pub session_id: i64,
    pub month_year: String,
    pub sheet_name: String,
    pub items: usize,
    pub categories: usize,
    pub restored: usize,
}

/// Parses `bytes`, keeps a copy of the workbook and makes the matching session
/// active. Counts already stored for `(month_year, file_name)` are kept.
pub fn import_workbook(
    conn: &Connection,
    data_dir: &Path,
    file_name: &str,
    bytes: &[u8],
    requested_sheet: Option<&str>,
    month_year: &str,
) -> Result<ImportSummary> {
    let loaded = load_sheet(bytes, requested_sheet)?;
    let parsed = parse_sheet(&loaded.grid)?;
    let checksum = store_workbook(data_dir, bytes)?;

    let counts = find_session(conn, month_year, file_name)?
        .map(|existing| existing.counts)
        .unwrap_or_default();
    let restored = counts.len();
    let record = SessionRecord {
        id: None,
        month_year: month_year.to_string(),
        file_name: file_name.to_string(),
        checksum,
        sheet_name: loaded.name.clone(),
        counts,
        timestamp: now_millis(),
    };
    let session_id = upsert_session(conn, &record)?;
    set_active(conn, session_id)?;
    info!(session_id, month_year, restored, "session imported");

    Ok(ImportSummary {
        session_id,
        month_year: record.month_year,
        sheet_name: loaded.name,
        items: parsed.items.len(),
        categories: crate::filter::categories(&parsed.items).len(),
        restored,
    })
}

pub enum CountChange {
    Set(f64),
    Add(f64),
    Clear,
}

/// Applies a count change to an item of the session and persists it. Returns the
/// new count, `None` after a clear.
pub fn change_count(
    conn: &Connection,
    session: &mut LoadedSession,
    row: u32,
    change: CountChange,
) -> Result<Option<f64>> {
    if !session.items.iter().any(|item| item.row_index == row) {
        return Err(VareError::UnknownRow(row));
    }
    let counts = &mut session.record.counts;
    let next = match change {
        CountChange::Set(value) => Some(value),
        CountChange::Add(delta) => Some(counts.get(&row).copied().unwrap_or(0.0) + delta),
        CountChange::Clear => None,
    };
    match next {
        Some(value) if !value.is_finite() => {
            return Err(VareError::Other(format!("Count must be a finite number, got {value}")));
        }
        Some(value) => {
            counts.insert(row, value);
        }
        None => {
            counts.remove(&row);
        }
    }
    session.record.timestamp = now_millis();
    upsert_session(conn, &session.record)?;
    debug!(row, count = ?next, "count updated");
    Ok(next)
}

/// `rowIndex,count` lines for every stored count, in row order.
pub fn write_counts_csv<W: std::io::Write>(counts: &CountsByRow, out: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(["rowIndex", "count"])?;
    for (row, count) in counts {
        wtr.write_record([row.to_string(), count.to_string()])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn counts_csv_file_name(record: &SessionRecord) -> String {
    format!("{}-counts.csv", record.month_year)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::test_db;
    use crate::workbook::tests::count_list_xlsx;
    use crate::workbook::PREFERRED_SHEET;

    fn record(month_year: &str, file_name: &str, timestamp: i64) -> SessionRecord {
        SessionRecord {
            id: None,
            month_year: month_year.to_string(),
            file_name: file_name.to_string(),
            checksum: "abc".to_string(),
            sheet_name: PREFERRED_SHEET.to_string(),
            counts: CountsByRow::new(),
            timestamp,
        }
    }

    #[test]
    fn test_upsert_keeps_one_record_per_period_and_file() {
        let (_dir, conn) = test_db();
        let first = upsert_session(&conn, &record("2025-03", "mars.xlsx", 1)).unwrap();
        let mut updated = record("2025-03", "mars.xlsx", 2);
        updated.counts.insert(7, 12.0);
        let second = upsert_session(&conn, &updated).unwrap();
        assert_eq!(first, second);

        let stored = get_session(&conn, first).unwrap();
        assert_eq!(stored.counts.get(&7), Some(&12.0));
        assert_eq!(stored.timestamp, 2);
        assert_eq!(list_sessions(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_list_sessions_newest_first() {
        let (_dir, conn) = test_db();
        upsert_session(&conn, &record("2025-02", "feb.xlsx", 10)).unwrap();
        upsert_session(&conn, &record("2025-03", "mars.xlsx", 30)).unwrap();
        upsert_session(&conn, &record("2025-01", "jan.xlsx", 20)).unwrap();
        let files: Vec<String> = list_sessions(&conn).unwrap().into_iter().map(|s| s.file_name).collect();
        assert_eq!(files, vec!["mars.xlsx", "jan.xlsx", "feb.xlsx"]);
    }

    #[test]
    fn test_zero_count_survives_storage() {
        let (_dir, conn) = test_db();
        let mut r = record("2025-03", "mars.xlsx", 1);
        r.counts.insert(8, 0.0);
        r.counts.insert(11, 2.5);
        let id = upsert_session(&conn, &r).unwrap();
        let stored = get_session(&conn, id).unwrap();
        assert_eq!(stored.counts, r.counts);
    }

    #[test]
    fn test_unknown_session() {
        let (_dir, conn) = test_db();
        assert!(matches!(get_session(&conn, 42), Err(VareError::UnknownSession(42))));
        assert!(active_session(&conn).unwrap().is_none());
        assert!(matches!(require_active(&conn), Err(VareError::NoActiveSession)));
    }

    #[test]
    fn test_import_creates_active_session() {
        let (dir, conn) = test_db();
        let bytes = count_list_xlsx(PREFERRED_SHEET);
        let summary = import_workbook(&conn, dir.path(), "mars.xlsx", &bytes, None, "2025-03").unwrap();
        assert_eq!(summary.items, 3);
        assert_eq!(summary.categories, 2);
        assert_eq!(summary.restored, 0);
        assert_eq!(summary.sheet_name, PREFERRED_SHEET);

        let active = require_active(&conn).unwrap();
        assert_eq!(active.id, Some(summary.session_id));
        assert!(workbook_path(dir.path(), &active.checksum).exists());
    }

    #[test]
    fn test_reimport_restores_counts() {
        let (dir, conn) = test_db();
        let bytes = count_list_xlsx(PREFERRED_SHEET);
        import_workbook(&conn, dir.path(), "mars.xlsx", &bytes, None, "2025-03").unwrap();
        let mut session = load_active(&conn, dir.path()).unwrap();
        change_count(&conn, &mut session, 7, CountChange::Set(12.0)).unwrap();

        let summary = import_workbook(&conn, dir.path(), "mars.xlsx", &bytes, None, "2025-03").unwrap();
        assert_eq!(summary.restored, 1);
        let other = import_workbook(&conn, dir.path(), "mars.xlsx", &bytes, None, "2025-04").unwrap();
        assert_eq!(other.restored, 0);
    }

    #[test]
    fn test_import_rejects_sheet_without_header() {
        let (dir, conn) = test_db();
        let bytes = count_list_xlsx("Mars");
        let result = import_workbook(&conn, dir.path(), "mars.xlsx", &bytes, None, "2025-03");
        assert!(matches!(result, Err(VareError::Parse(_))));
        assert!(list_sessions(&conn).unwrap().is_empty());
        assert!(!dir.path().join("workbooks").exists());
    }

    #[test]
    fn test_change_count_set_add_clear() {
        let (dir, conn) = test_db();
        let bytes = count_list_xlsx(PREFERRED_SHEET);
        import_workbook(&conn, dir.path(), "mars.xlsx", &bytes, None, "2025-03").unwrap();
        let mut session = load_active(&conn, dir.path()).unwrap();

        assert_eq!(change_count(&conn, &mut session, 8, CountChange::Add(1.0)).unwrap(), Some(1.0));
        assert_eq!(change_count(&conn, &mut session, 8, CountChange::Add(10.0)).unwrap(), Some(11.0));
        assert_eq!(change_count(&conn, &mut session, 7, CountChange::Set(0.0)).unwrap(), Some(0.0));
        assert_eq!(change_count(&conn, &mut session, 8, CountChange::Clear).unwrap(), None);

        let stored = require_active(&conn).unwrap();
        assert_eq!(stored.counts, CountsByRow::from([(7, 0.0)]));
    }

    #[test]
    fn test_change_count_rejects_non_item_rows() {
        let (dir, conn) = test_db();
        let bytes = count_list_xlsx(PREFERRED_SHEET);
        import_workbook(&conn, dir.path(), "mars.xlsx", &bytes, None, "2025-03").unwrap();
        let mut session = load_active(&conn, dir.path()).unwrap();
        // row 6 is the "Kaffe" category row
        let result = change_count(&conn, &mut session, 6, CountChange::Set(1.0));
        assert!(matches!(result, Err(VareError::UnknownRow(6))));
        let result = change_count(&conn, &mut session, 7, CountChange::Set(f64::NAN));
        assert!(matches!(result, Err(VareError::Other(_))));
    }

    #[test]
    fn test_counts_csv() {
        let counts = CountsByRow::from([(11, 3.0), (7, 12.5)]);
        let mut out = Vec::new();
        write_counts_csv(&counts, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "rowIndex,count\n7,12.5\n11,3\n");
    }
}
