//! In-memory note storage, partitioned per user

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wire representation of a stored note
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiNote {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /notes`
#[derive(Debug, Clone, Deserialize)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Body of `PATCH /notes/{id}`; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoteChanges {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotePage {
    pub items: Vec<ApiNote>,
    pub total: usize,
}

/// Outcome of a create
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Created {
    New(ApiNote),
    /// Same idempotency key seen before; the original note is returned
    Replayed(ApiNote),
}

#[derive(Default)]
struct UserNotes {
    notes: HashMap<String, (u64, ApiNote)>,
    idempotency: HashMap<String, String>,
}

#[derive(Default)]
struct StoreState {
    users: HashMap<String, UserNotes>,
    next_seq: u64,
}

#[derive(Default)]
pub struct NoteStore {
    state: Mutex<StoreState>,
}

impl NoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// One page of the user's notes, newest first; `page` starts at 1.
    pub fn list(&self, user: &str, page: usize, limit: usize) -> NotePage {
        let state = self.state.lock();
        let Some(user_notes) = state.users.get(user) else {
            return NotePage {
                items: Vec::new(),
                total: 0,
            };
        };

        let mut notes = user_notes.notes.values().collect::<Vec<_>>();
        notes.sort_by(|(a, _), (b, _)| b.cmp(a));
        let items = notes
            .into_iter()
            .skip(page.saturating_sub(1).saturating_mul(limit))
            .take(limit)
            .map(|(_, note)| note.clone())
            .collect();

        NotePage {
            items,
            total: user_notes.notes.len(),
        }
    }

    pub fn get(&self, user: &str, id: &str) -> Option<ApiNote> {
        self.state
            .lock()
            .users
            .get(user)
            .and_then(|user_notes| user_notes.notes.get(id))
            .map(|(_, note)| note.clone())
    }

    /// Insert a note. A repeated `idempotency_key` whose note still exists
    /// returns that note instead of creating a second one.
    pub fn create(&self, user: &str, note: NewNote, idempotency_key: Option<&str>) -> Created {
        let mut state = self.state.lock();
        state.next_seq += 1;
        let seq = state.next_seq;
        let user_notes = state.users.entry(user.to_string()).or_default();

        if let Some(key) = idempotency_key {
            if let Some((_, existing)) = user_notes
                .idempotency
                .get(key)
                .and_then(|id| user_notes.notes.get(id))
            {
                return Created::Replayed(existing.clone());
            }
        }

        let now = Utc::now();
        let stored = ApiNote {
            id: new_object_id(),
            title: note.title,
            content: note.content,
            summary: note.summary.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        if let Some(key) = idempotency_key {
            user_notes
                .idempotency
                .insert(key.to_string(), stored.id.clone());
        }
        user_notes
            .notes
            .insert(stored.id.clone(), (seq, stored.clone()));
        Created::New(stored)
    }

    pub fn update(&self, user: &str, id: &str, changes: NoteChanges) -> Option<ApiNote> {
        let mut state = self.state.lock();
        let (_, note) = state.users.get_mut(user)?.notes.get_mut(id)?;

        if let Some(title) = changes.title {
            note.title = title;
        }
        if let Some(content) = changes.content {
            note.content = content;
        }
        if let Some(summary) = changes.summary {
            note.summary = summary;
        }
        note.updated_at = Utc::now();
        Some(note.clone())
    }

    /// Returns whether a note was removed
    pub fn delete(&self, user: &str, id: &str) -> bool {
        self.state
            .lock()
            .users
            .get_mut(user)
            .is_some_and(|user_notes| user_notes.notes.remove(id).is_some())
    }
}

/// 24 lowercase hex characters
fn new_object_id() -> String {
    Uuid::new_v4().simple().to_string()[..24].to_string()
}
