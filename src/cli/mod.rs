pub mod cash;
pub mod checklist;
pub mod count;
pub mod export;
pub mod history;
pub mod import;
pub mod init;
pub mod items;
pub mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::cash::Register;
use crate::error::Result;
use crate::period::{current_month_year, parse_month_year};
use crate::session::active_session;
use crate::settings::get_data_dir;

/// Data directory from settings and an initialized connection to its store.
pub(crate) fn open_store() -> Result<(PathBuf, Connection)> {
    let data_dir = get_data_dir();
    let conn = crate::db::open(&data_dir)?;
    Ok((data_dir, conn))
}

/// `--month` if given, else the active session's period, else the current month.
pub(crate) fn resolve_month(conn: &Connection, month: Option<&str>) -> Result<String> {
    if let Some(m) = month {
        return parse_month_year(m);
    }
    Ok(active_session(conn)?
        .map(|s| s.month_year)
        .unwrap_or_else(current_month_year))
}

#[derive(Parser)]
#[command(name = "varetelling", about = "Monthly stock count: import the count list, count, write it back.")]
pub struct Cli {
    /// Show debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for varetelling data (default: ~/Documents/varetelling)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Import a count list workbook and make it the active session.
    Import {
        /// Path to the .xlsx count list
        file: String,
        /// Sheet to read (default: VARETELLINGSLISTE, then the first sheet)
        #[arg(long)]
        sheet: Option<String>,
        /// Counting period YYYY-MM (default: guessed from the file name)
        #[arg(long)]
        period: Option<String>,
    },
    /// List the items of the active session.
    Items {
        /// Only this category ("Alle" for all)
        #[arg(long)]
        category: Option<String>,
        /// Case-insensitive match on name or article number
        #[arg(long)]
        search: Option<String>,
        /// Only items that have not been counted yet
        #[arg(long)]
        missing: bool,
        /// Flag lines whose counted value exceeds this (default from settings)
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Record counts for the active session.
    Count {
        #[command(subcommand)]
        command: CountCommands,
    },
    /// Write the counts into a copy of the workbook.
    Export {
        /// Output path (default: <data_dir>/exports/<name>-oppdatert.xlsx)
        #[arg(long)]
        output: Option<String>,
    },
    /// Month-end checklist.
    Checklist {
        /// Month YYYY-MM (default: the active session's period)
        #[arg(long, global = true)]
        month: Option<String>,
        #[command(subcommand)]
        command: Option<ChecklistCommands>,
    },
    /// Cash tally for the registers and the safe.
    Cash {
        /// Month YYYY-MM (default: the active session's period)
        #[arg(long, global = true)]
        month: Option<String>,
        #[command(subcommand)]
        command: Option<CashCommands>,
    },
    /// Previous counting sessions.
    History {
        #[command(subcommand)]
        command: Option<HistoryCommands>,
    },
    /// Show data directory, database and the active session.
    Status,
}

#[derive(Subcommand)]
pub enum CountCommands {
    /// Set the count of an item row.
    Set {
        /// Worksheet row of the item (as shown by `items`)
        row: u32,
        value: f64,
    },
    /// Add to the count of an item row (an uncounted item starts at 0).
    Add {
        row: u32,
        #[arg(allow_negative_numbers = true)]
        delta: f64,
    },
    /// Mark an item row as not counted.
    Clear { row: u32 },
}

#[derive(Subcommand)]
pub enum ChecklistCommands {
    /// Show the checklist and progress.
    List,
    /// Mark an item done.
    Check { id: i64 },
    /// Mark an item not done.
    Uncheck { id: i64 },
    /// Set a comment (empty text removes it).
    Comment { id: i64, text: String },
    /// Add an item to the month's checklist.
    Add { text: String },
}

#[derive(Subcommand)]
pub enum CashCommands {
    /// Show the tally with sums.
    Show,
    /// Set the number of pieces (or rolls, for the safe) of a denomination.
    Set {
        #[arg(value_enum)]
        register: Register,
        denomination: u32,
        count: u32,
    },
    /// Set the value of one roll of a denomination.
    Roll { denomination: u32, value: f64 },
}

#[derive(Subcommand)]
pub enum HistoryCommands {
    /// List sessions, newest first.
    List,
    /// Write a session's counts as CSV.
    Csv {
        /// Session ID (from `history list`)
        id: i64,
        /// Output path (default: <data_dir>/exports/<period>-counts.csv)
        #[arg(long)]
        output: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_count_add_accepts_negative_delta() {
        let cli = Cli::try_parse_from(["varetelling", "count", "add", "7", "-10"]).unwrap();
        match cli.command {
            Commands::Count { command: CountCommands::Add { row, delta } } => {
                assert_eq!(row, 7);
                assert_eq!(delta, -10.0);
            }
            _ => panic!("expected count add"),
        }
    }

    #[test]
    fn test_cash_set_parses_register() {
        let cli = Cli::try_parse_from(["varetelling", "cash", "set", "kasse2", "100", "3"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Cash {
                command: Some(CashCommands::Set { register: Register::Kasse2, denomination: 100, count: 3 }),
                ..
            }
        ));
    }

    #[test]
    fn test_resolve_month_prefers_flag_then_active_session() {
        let (_dir, conn) = crate::db::tests::test_db();
        assert_eq!(resolve_month(&conn, Some("2025-03")).unwrap(), "2025-03");
        assert!(resolve_month(&conn, Some("mars")).is_err());
        assert_eq!(resolve_month(&conn, None).unwrap(), current_month_year());
    }
}
