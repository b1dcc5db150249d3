use crate::db::{get_connection, DB_FILE};
use crate::error::Result;
use crate::fmt::format_bytes;
use crate::session::active_session;
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let data_dir = std::path::PathBuf::from(&settings.data_dir);
    let db_path = data_dir.join(DB_FILE);

    println!("Data dir:   {}", data_dir.display());
    println!("Database:   {}", db_path.display());

    if !db_path.exists() {
        println!();
        println!("Database not found. Run `varetelling init` to set up.");
        return Ok(());
    }

    let size = std::fs::metadata(&db_path)?.len();
    println!("DB size:    {}", format_bytes(size));

    let conn = get_connection(&db_path)?;
    crate::db::init_db(&conn)?;
    let sessions: i64 = conn.query_row("SELECT count(*) FROM sessions", [], |r| r.get(0))?;
    println!("Sessions:   {sessions}");

    println!();
    match active_session(&conn)? {
        Some(s) => {
            println!("Active:     {} ({})", s.file_name, s.month_year);
            println!("Sheet:      {}", s.sheet_name);
            println!("Counted:    {} rows", s.counts.len());
        }
        None => println!("No active session. Run `varetelling import <file>`."),
    }
    Ok(())
}
