//! SmartNotes CLI - offline-first notes from the terminal
//!
//! Every command works against the local replica; changes made while the
//! server is unreachable are queued and replayed by `sync` or `watch`.

mod cli;
mod commands;
mod error;
#[cfg(test)]
mod tests;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::auth::run_auth;
use crate::commands::common::GlobalOptions;
use crate::commands::config::run_config;
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::list::run_list;
use crate::commands::show::run_show;
use crate::commands::status::run_status;
use crate::commands::summarize::run_summarize;
use crate::commands::sync::run_sync;
use crate::commands::watch::run_watch;
use crate::error::CliError;

const DEFAULT_LOG_FILTER: &str = "smartnotes=info,smartnotes_core=info";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let options = GlobalOptions {
        db_path: cli.db_path,
        config_path: cli.config,
        offline: cli.offline,
    };

    match cli.command {
        Commands::Add { title, content } => run_add(&title, &content, &options).await?,
        Commands::List { limit, json } => run_list(limit, json, &options).await?,
        Commands::Show { id, json } => run_show(&id, json, &options).await?,
        Commands::Edit { id, title, content } => {
            run_edit(&id, title.as_deref(), content.as_deref(), &options).await?;
        }
        Commands::Delete { id } => run_delete(&id, &options).await?,
        Commands::Summarize { id, text } => {
            run_summarize(id.as_deref(), text.as_deref(), &options).await?;
        }
        Commands::Sync { json } => run_sync(json, &options).await?,
        Commands::Status { json } => run_status(json, &options).await?,
        Commands::Watch => run_watch(&options).await?,
        Commands::Config { command } => run_config(command, &options)?,
        Commands::Auth { command } => run_auth(command)?,
    }

    Ok(())
}
