mod address;
mod cash;
mod checklist;
mod cli;
mod db;
mod error;
mod filter;
mod fmt;
mod models;
mod period;
mod session;
mod settings;
mod sheet;
mod workbook;
mod writeback;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{ChecklistCommands, CashCommands, Cli, Commands, CountCommands, HistoryCommands};
use filter::ItemFilter;
use session::CountChange;

fn init_tracing(verbose: bool) {
    let default = if verbose { "varetelling=debug" } else { "varetelling=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Import { file, sheet, period } => {
            cli::import::run(&file, sheet.as_deref(), period.as_deref())
        }
        Commands::Items {
            category,
            search,
            missing,
            threshold,
        } => cli::items::run(
            ItemFilter {
                category,
                search,
                missing_only: missing,
            },
            threshold,
        ),
        Commands::Count { command } => match command {
            CountCommands::Set { row, value } => cli::count::run(row, CountChange::Set(value)),
            CountCommands::Add { row, delta } => cli::count::run(row, CountChange::Add(delta)),
            CountCommands::Clear { row } => cli::count::run(row, CountChange::Clear),
        },
        Commands::Export { output } => cli::export::run(output),
        Commands::Checklist { month, command } => {
            cli::checklist::run(month.as_deref(), command.unwrap_or(ChecklistCommands::List))
        }
        Commands::Cash { month, command } => {
            cli::cash::run(month.as_deref(), command.unwrap_or(CashCommands::Show))
        }
        Commands::History { command } => match command.unwrap_or(HistoryCommands::List) {
            HistoryCommands::List => cli::history::list(),
            HistoryCommands::Csv { id, output } => cli::history::csv(id, output),
        },
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
