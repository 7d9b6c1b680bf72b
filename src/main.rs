mod cli;
mod commands;
mod model;
mod state;
mod storage;
mod sync;
mod ui;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> Result<()> {
    // Logs go to stderr; the TUI runs on the alternate screen.
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = cli::Cli::parse();
    let command = args.command.unwrap_or(cli::Command::Tui);
    match command {
        cli::Command::Init => commands::init(),
        cli::Command::List { list } => commands::list(list),
        cli::Command::Add { text, due, list } => commands::add(text, due, list),
        cli::Command::Edit {
            id,
            text,
            due,
            clear_due,
            list,
        } => commands::edit(id, text, due, clear_due, list),
        cli::Command::Toggle { id, list } => commands::toggle(id, list),
        cli::Command::Rm { id, list } => commands::rm(id, list),
        cli::Command::Lists { action } => commands::lists(action),
        cli::Command::Sync { action } => commands::sync(action),
        cli::Command::Tui => commands::tui(),
    }
}
