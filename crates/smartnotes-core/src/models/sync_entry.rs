//! Sync queue entry model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::note::{Note, NoteId};
use crate::error::Error;

/// Kind of a pending mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Create,
    Update,
    Delete,
}

impl SyncAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(Error::InvalidInput(format!("unknown sync action '{other}'"))),
        }
    }
}

/// A mutation awaiting replay against the server.
///
/// Create and update carry the full note snapshot taken when the mutation
/// was applied locally; delete only needs the identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "note", rename_all = "lowercase")]
pub enum SyncOp {
    Create(Note),
    Update(Note),
    Delete(NoteId),
}

impl SyncOp {
    pub const fn action(&self) -> SyncAction {
        match self {
            Self::Create(_) => SyncAction::Create,
            Self::Update(_) => SyncAction::Update,
            Self::Delete(_) => SyncAction::Delete,
        }
    }

    pub const fn note_id(&self) -> &NoteId {
        match self {
            Self::Create(note) | Self::Update(note) => &note.id,
            Self::Delete(id) => id,
        }
    }

    /// Point the entry at a new identifier, payload included.
    pub fn retarget(&mut self, to: &NoteId) {
        match self {
            Self::Create(note) | Self::Update(note) => note.id = to.clone(),
            Self::Delete(id) => *id = to.clone(),
        }
    }
}

/// One row of the sync queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncEntry {
    /// Monotonically increasing queue position
    pub seq: i64,
    pub op: SyncOp,
    /// Enqueue timestamp (Unix ms)
    pub enqueued_at: i64,
}

impl SyncEntry {
    pub const fn action(&self) -> SyncAction {
        self.op.action()
    }

    pub const fn note_id(&self) -> &NoteId {
        self.op.note_id()
    }
}
