//! miraictl - manage the Mirai auto-fix state file

use clap::Parser;
use mirai_common::{paths, HistoryLog, StateStore};
use miraictl::cli::{Cli, Commands};
use miraictl::commands;
use miraictl::errors::EXIT_GENERAL_ERROR;

fn main() {
    let cli = Cli::parse();

    let store = StateStore::new(cli.state.clone().unwrap_or_else(paths::state_file));
    let history = HistoryLog::new(cli.history.clone().unwrap_or_else(paths::history_file));

    let result = match cli.command {
        Commands::Init { force } => commands::init(&store, force),
        Commands::Show { json } => commands::show(&store, json),
        Commands::Reset { confirm } => commands::reset(&store, confirm),
        Commands::Stats { format } => commands::stats(&store, &history, format),
        Commands::Validate { patterns } => commands::validate(&store, patterns.as_deref()),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(EXIT_GENERAL_ERROR);
        }
    }
}
