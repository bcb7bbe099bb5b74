//! In-memory `NoteRemote` with failure injection, for engine tests

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::{NoteRemote, RemoteError, RemoteResult};
use crate::models::{NoteFields, RemoteNote};

pub const TEST_TOKEN: &str = "test-token";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    List,
    Get,
    Create,
    Update,
    Delete,
    Summarize,
}

#[derive(Default)]
struct FakeState {
    notes: BTreeMap<String, RemoteNote>,
    next_id: u64,
    idempotency: HashMap<String, String>,
    failures: HashMap<Call, VecDeque<RemoteError>>,
    /// Applied on the server, then the reply fails with this error
    lost_replies: HashMap<Call, VecDeque<RemoteError>>,
    always_fail: Option<RemoteError>,
    calls: Vec<(Call, String)>,
}

impl FakeState {
    fn record(&mut self, call: Call, token: &str, detail: &str) -> RemoteResult<()> {
        self.calls.push((call, detail.to_string()));
        if let Some(error) = &self.always_fail {
            return Err(error.clone());
        }
        if let Some(error) = self.failures.get_mut(&call).and_then(VecDeque::pop_front) {
            return Err(error);
        }
        if token != TEST_TOKEN {
            return Err(RemoteError::Auth("invalid token".to_string()));
        }
        Ok(())
    }

    fn lost_reply(&mut self, call: Call) -> RemoteResult<()> {
        match self.lost_replies.get_mut(&call).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn insert(&mut self, fields: &NoteFields) -> RemoteNote {
        self.next_id += 1;
        let at = DateTime::from_timestamp_millis(1_700_000_000_000 + i64::try_from(self.next_id).unwrap_or(0) * 1000);
        let note = RemoteNote {
            id: format!("{:024x}", self.next_id),
            title: fields.title.clone(),
            content: fields.content.clone(),
            summary: fields.summary.clone(),
            created_at: at,
            updated_at: at,
        };
        self.notes.insert(note.id.clone(), note.clone());
        note
    }
}

/// Parks the next create until released
#[derive(Clone, Default)]
pub struct CreateHold {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl CreateHold {
    /// Wait until a create call is parked
    pub async fn reached(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<FakeState>,
    create_hold: Mutex<Option<CreateHold>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a note on the server directly, bypassing the client
    pub fn seed(&self, title: &str, content: &str) -> RemoteNote {
        self.state.lock().insert(&NoteFields {
            title: title.to_string(),
            content: content.to_string(),
            summary: None,
        })
    }

    pub fn fail_next(&self, call: Call, error: RemoteError) {
        self.state
            .lock()
            .failures
            .entry(call)
            .or_default()
            .push_back(error);
    }

    /// Apply the next `call` but answer it with `error`
    pub fn lose_next_reply(&self, call: Call, error: RemoteError) {
        self.state
            .lock()
            .lost_replies
            .entry(call)
            .or_default()
            .push_back(error);
    }

    pub fn hold_next_create(&self) -> CreateHold {
        let hold = CreateHold::default();
        *self.create_hold.lock() = Some(hold.clone());
        hold
    }

    pub fn fail_all(&self, error: RemoteError) {
        self.state.lock().always_fail = Some(error);
    }

    pub fn recover(&self) {
        self.state.lock().always_fail = None;
    }

    pub fn remove(&self, id: &str) {
        self.state.lock().notes.remove(id);
    }

    pub fn notes(&self) -> Vec<RemoteNote> {
        self.state.lock().notes.values().cloned().collect()
    }

    pub fn note(&self, id: &str) -> Option<RemoteNote> {
        self.state.lock().notes.get(id).cloned()
    }

    pub fn calls(&self) -> Vec<(Call, String)> {
        self.state.lock().calls.clone()
    }

    pub fn count(&self, call: Call) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|(recorded, _)| *recorded == call)
            .count()
    }
}

#[async_trait]
impl NoteRemote for FakeRemote {
    async fn list(&self, token: &str) -> RemoteResult<Vec<RemoteNote>> {
        let mut state = self.state.lock();
        state.record(Call::List, token, "")?;
        Ok(state.notes.values().rev().cloned().collect())
    }

    async fn get_by_id(&self, token: &str, id: &str) -> RemoteResult<RemoteNote> {
        let mut state = self.state.lock();
        state.record(Call::Get, token, id)?;
        state
            .notes
            .get(id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound("Note not found".to_string()))
    }

    async fn create(
        &self,
        token: &str,
        fields: &NoteFields,
        idempotency_key: Option<&str>,
    ) -> RemoteResult<RemoteNote> {
        let hold = self.create_hold.lock().take();
        if let Some(hold) = hold {
            hold.entered.notify_one();
            hold.release.notified().await;
        }

        let mut state = self.state.lock();
        state.record(Call::Create, token, &fields.title)?;
        if let Some(existing) = idempotency_key
            .and_then(|key| state.idempotency.get(key))
            .and_then(|id| state.notes.get(id))
        {
            return Ok(existing.clone());
        }
        let note = state.insert(fields);
        if let Some(key) = idempotency_key {
            state.idempotency.insert(key.to_string(), note.id.clone());
        }
        state.lost_reply(Call::Create)?;
        Ok(note)
    }

    async fn update(&self, token: &str, id: &str, fields: &NoteFields) -> RemoteResult<RemoteNote> {
        let mut state = self.state.lock();
        state.record(Call::Update, token, id)?;
        let note = state
            .notes
            .get_mut(id)
            .ok_or_else(|| RemoteError::NotFound("Note not found".to_string()))?;
        note.title.clone_from(&fields.title);
        note.content.clone_from(&fields.content);
        if fields.summary.is_some() {
            note.summary.clone_from(&fields.summary);
        }
        let note = note.clone();
        state.lost_reply(Call::Update)?;
        Ok(note)
    }

    async fn delete(&self, token: &str, id: &str) -> RemoteResult<()> {
        let mut state = self.state.lock();
        state.record(Call::Delete, token, id)?;
        state
            .notes
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RemoteError::NotFound("Note not found".to_string()))
    }

    async fn summarize(&self, token: &str, text: &str) -> RemoteResult<String> {
        let mut state = self.state.lock();
        state.record(Call::Summarize, token, text)?;
        let words: Vec<&str> = text.split_whitespace().take(3).collect();
        Ok(format!("{}...", words.join(" ")))
    }
}
