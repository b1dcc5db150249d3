use crate::cli::open_store;
use crate::error::Result;
use crate::fmt::count;
use crate::session::{change_count, load_active, CountChange};

pub fn run(row: u32, change: CountChange) -> Result<()> {
    let (data_dir, conn) = open_store()?;
    let mut session = load_active(&conn, &data_dir)?;
    let updated = change_count(&conn, &mut session, row, change)?;

    let name = session
        .items
        .iter()
        .find(|i| i.row_index == row)
        .map(|i| i.navn.as_str())
        .unwrap_or_default();
    match updated {
        Some(value) => println!("Row {row} {name}: {}", count(value)),
        None => println!("Row {row} {name}: not counted"),
    }
    Ok(())
}
