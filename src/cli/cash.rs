use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cash::{get_cash_count, save_cash_count, CashCount, Register, DENOMINATIONS};
use crate::cli::{open_store, resolve_month, CashCommands};
use crate::error::Result;
use crate::fmt::kroner;

pub fn run(month: Option<&str>, command: CashCommands) -> Result<()> {
    let (_, conn) = open_store()?;
    let month_year = resolve_month(&conn, month)?;
    let mut cash = get_cash_count(&conn, &month_year)?;

    match command {
        CashCommands::Show => {}
        CashCommands::Set { register, denomination, count } => {
            cash.set(register, denomination, count)?;
            save_cash_count(&conn, &cash)?;
        }
        CashCommands::Roll { denomination, value } => {
            cash.set_roll_value(denomination, value)?;
            save_cash_count(&conn, &cash)?;
        }
    }

    print_tally(&cash);
    Ok(())
}

fn print_tally(cash: &CashCount) {
    let mut table = Table::new();
    table.set_header(vec!["Valør", "Kasse 1", "Kasse 2", "Safe (ruller)", "Rullverdi"]);
    for denom in DENOMINATIONS {
        let pieces = |r: Register| cash.register(r).get(&denom).copied().unwrap_or(0);
        table.add_row(vec![
            Cell::new(denom),
            Cell::new(pieces(Register::Kasse1)),
            Cell::new(pieces(Register::Kasse2)),
            Cell::new(pieces(Register::Safe)),
            Cell::new(kroner(cash.roll_value(denom))),
        ]);
    }
    table.add_row(vec![
        Cell::new("Sum".bold()),
        Cell::new(kroner(cash.sum(Register::Kasse1))),
        Cell::new(kroner(cash.sum(Register::Kasse2))),
        Cell::new(kroner(cash.sum(Register::Safe))),
        Cell::new(""),
    ]);
    println!("Kontanttelling {}\n{table}", cash.month_year);
    println!("Totalt: {}", kroner(cash.total()).bold());
}
