use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "smartnotes")]
#[command(about = "Offline-first notes with AI summaries")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to the config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Work from the local replica without probing the server
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new note
    #[command(alias = "new")]
    Add {
        /// Note title
        title: String,
        /// Note content (read from stdin when omitted)
        content: Vec<String>,
    },
    /// List notes, newest first
    List {
        /// Number of notes to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a single note
    Show {
        /// Note ID or unique ID prefix
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit an existing note
    Edit {
        /// Note ID or unique ID prefix
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New content
        #[arg(long)]
        content: Option<String>,
    },
    /// Delete an existing note
    Delete {
        /// Note ID or unique ID prefix
        id: String,
    },
    /// Summarize a note (and save the summary) or arbitrary text
    Summarize {
        /// Note ID or unique ID prefix
        #[arg(conflicts_with = "text", required_unless_present = "text")]
        id: Option<String>,
        /// Summarize this text instead of a stored note
        #[arg(long, value_name = "TEXT")]
        text: Option<String>,
    },
    /// Replay pending offline changes against the server
    Sync {
        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show connectivity, sign-in state and pending changes
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Keep probing the server and sync whenever it becomes reachable
    Watch,
    /// Manage client configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Manage the bearer token used against the API
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Create or update the config file
    Init {
        /// API base URL (e.g. <https://notes.example.com/api>)
        #[arg(long, value_name = "URL")]
        api_url: Option<String>,
        /// Per-request timeout in seconds
        #[arg(long, value_name = "SECS")]
        timeout_secs: Option<u64>,
        /// Seconds between reachability probes in `watch`
        #[arg(long, value_name = "SECS")]
        probe_interval_secs: Option<u64>,
    },
    /// Print the effective configuration
    Show,
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Store a bearer token for API calls
    Login {
        /// Bearer token issued by the server
        #[arg(long, value_name = "TOKEN")]
        token: String,
    },
    /// Show whether a token is configured
    Status,
    /// Forget the stored token
    Logout,
}
