//! smartnotes-core - offline-first note sync
//!
//! Models, on-device storage (notes and the pending-change queue), the
//! connectivity monitor, the REST client and the sync engine tying them
//! together. Shared by the CLI and by the API server's end-to-end tests.

pub mod config;
pub mod connectivity;
pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{Note, NoteDraft, NoteId, NotePatch};
pub use sync::{DrainReport, SyncEngine};
