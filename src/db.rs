use std::path::Path;

use rusqlite::{Connection, OptionalExtension};

use crate::error::Result;

pub const DB_FILE: &str = "varetelling.db";

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sessions (
    id INTEGER PRIMARY KEY,
    month_year TEXT NOT NULL,
    file_name TEXT NOT NULL,
    checksum TEXT NOT NULL,
    sheet_name TEXT NOT NULL,
    counts TEXT NOT NULL DEFAULT '{}',
    timestamp INTEGER NOT NULL,
    UNIQUE (month_year, file_name)
);

CREATE TABLE IF NOT EXISTS checklist (
    id INTEGER PRIMARY KEY,
    month_year TEXT NOT NULL,
    text TEXT NOT NULL,
    checked INTEGER NOT NULL DEFAULT 0,
    comment TEXT
);

CREATE INDEX IF NOT EXISTS idx_checklist_month ON checklist (month_year);

CREATE TABLE IF NOT EXISTS cash_counts (
    id INTEGER PRIMARY KEY,
    month_year TEXT NOT NULL UNIQUE,
    kasse1 TEXT NOT NULL,
    kasse2 TEXT NOT NULL,
    safe TEXT NOT NULL,
    roll_values TEXT NOT NULL,
    timestamp INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Opens (creating if needed) the store under `data_dir`.
pub fn open(data_dir: &Path) -> Result<Connection> {
    std::fs::create_dir_all(data_dir)?;
    let conn = get_connection(&data_dir.join(DB_FILE))?;
    init_db(&conn)?;
    Ok(conn)
}

pub fn get_metadata(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |r| r.get(0))
        .optional()?;
    Ok(value)
}

pub fn set_metadata(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO metadata (key, value) VALUES (?1, ?2) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        [key, value],
    )?;
    Ok(())
}

/// Unix milliseconds, the unit all record timestamps use.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &["sessions", "checklist", "cash_counts", "metadata"] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
    }

    #[test]
    fn test_open_creates_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("nested").join("data");
        open(&data_dir).unwrap();
        assert!(data_dir.join(DB_FILE).exists());
    }

    #[test]
    fn test_metadata_upsert() {
        let (_dir, conn) = test_db();
        assert_eq!(get_metadata(&conn, "active_session").unwrap(), None);
        set_metadata(&conn, "active_session", "1").unwrap();
        set_metadata(&conn, "active_session", "2").unwrap();
        assert_eq!(get_metadata(&conn, "active_session").unwrap().as_deref(), Some("2"));
    }
}
