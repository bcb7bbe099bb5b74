//! On-device persistence: the local note store and the sync queue

mod connection;
mod migrations;
mod note_store;
mod sync_queue;

pub use connection::Database;
pub use note_store::{LocalNoteStore, SqliteNoteStore};
pub use sync_queue::{SqliteSyncQueue, SyncQueue};
