use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] smartnotes_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No note content provided")]
    EmptyContent,
    #[error("Note ID cannot be empty")]
    EmptyNoteId,
    #[error("Nothing to change: pass --title and/or --content")]
    NothingToEdit,
    #[error("{0}")]
    AmbiguousNoteId(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Not signed in. Run `smartnotes auth login --token <TOKEN>` or set SMARTNOTES_TOKEN.")]
    NotSignedIn,
    #[error("{0} change(s) could not be synced yet")]
    SyncIncomplete(usize),
}
