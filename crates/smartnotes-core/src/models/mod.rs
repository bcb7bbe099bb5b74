//! Data models for SmartNotes

mod note;
mod sync_entry;

pub use note::{
    IdKind, Note, NoteDraft, NoteFields, NoteId, NotePatch, RemoteNote, TEMPORARY_ID_PREFIX,
};
pub use sync_entry::{SyncAction, SyncEntry, SyncOp};
