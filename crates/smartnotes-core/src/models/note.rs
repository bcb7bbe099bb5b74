//! Note model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::util::now_millis;

/// Prefix of client-minted identifiers for notes created offline.
pub const TEMPORARY_ID_PREFIX: &str = "local-";

/// Identity of a note.
///
/// A note created offline carries a `Temporary` id until the server confirms
/// the create; from then on only the server-assigned `Remote` id is used.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum NoteId {
    /// Client-generated placeholder, valid until the queued create is confirmed
    Temporary(String),
    /// Server-assigned identifier
    Remote(String),
}

/// Storage tag for a [`NoteId`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Temporary,
    Remote,
}

impl IdKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Temporary => "temporary",
            Self::Remote => "remote",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "temporary" => Some(Self::Temporary),
            "remote" => Some(Self::Remote),
            _ => None,
        }
    }
}

impl NoteId {
    /// Mint a new temporary identifier (time-sortable UUID v7).
    #[must_use]
    pub fn temporary() -> Self {
        Self::Temporary(format!("{TEMPORARY_ID_PREFIX}{}", Uuid::now_v7()))
    }

    /// Wrap a server-assigned identifier.
    pub fn remote(id: impl Into<String>) -> Self {
        Self::Remote(id.into())
    }

    /// Rebuild an identifier from its stored `(kind, value)` pair.
    pub fn from_parts(kind: IdKind, value: impl Into<String>) -> Self {
        match kind {
            IdKind::Temporary => Self::Temporary(value.into()),
            IdKind::Remote => Self::Remote(value.into()),
        }
    }

    /// Raw identifier string, as used in URLs and storage.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Temporary(value) | Self::Remote(value) => value,
        }
    }

    pub const fn kind(&self) -> IdKind {
        match self {
            Self::Temporary(_) => IdKind::Temporary,
            Self::Remote(_) => IdKind::Remote,
        }
    }

    pub const fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary(_))
    }

    /// Server identifier, if the server has assigned one.
    pub fn remote_id(&self) -> Option<&str> {
        match self {
            Self::Remote(value) => Some(value),
            Self::Temporary(_) => None,
        }
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoteId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidInput("note id cannot be empty".into()));
        }
        if s.starts_with(TEMPORARY_ID_PREFIX) {
            Ok(Self::Temporary(s.to_string()))
        } else {
            Ok(Self::Remote(s.to_string()))
        }
    }
}

/// A note as held by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Temporary or server-assigned identifier
    pub id: NoteId,
    pub title: String,
    pub content: String,
    /// AI summary, empty until computed
    #[serde(default)]
    pub summary: String,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
    /// True until the server has confirmed the current state
    pub is_local: bool,
    /// True only when local state equals the last-known server state
    pub is_synced: bool,
    /// Tombstone for a delete awaiting confirmation
    #[serde(default)]
    pub is_deleted: bool,
}

impl Note {
    /// Build a speculative note for an offline create.
    #[must_use]
    pub fn pending(draft: NoteDraft) -> Self {
        let now = now_millis();
        Self {
            id: NoteId::temporary(),
            title: draft.title,
            content: draft.content,
            summary: String::new(),
            created_at: now,
            updated_at: now,
            is_local: true,
            is_synced: false,
            is_deleted: false,
        }
    }

    /// Build the confirmed local mirror of a server note.
    #[must_use]
    pub fn from_remote(remote: RemoteNote) -> Self {
        let now = now_millis();
        let created_at = remote.created_at.map_or(now, |at| at.timestamp_millis());
        let updated_at = remote.updated_at.map_or(created_at, |at| at.timestamp_millis());
        Self {
            id: NoteId::Remote(remote.id),
            title: remote.title,
            content: remote.content,
            summary: remote.summary.unwrap_or_default(),
            created_at,
            updated_at,
            is_local: false,
            is_synced: true,
            is_deleted: false,
        }
    }

    /// Apply a validated patch and bump `updated_at`.
    pub fn apply(&mut self, patch: &NotePatch) {
        if let Some(title) = &patch.title {
            self.title.clone_from(title);
        }
        if let Some(content) = &patch.content {
            self.content.clone_from(content);
        }
        if let Some(summary) = &patch.summary {
            self.summary.clone_from(summary);
        }
        self.updated_at = now_millis().max(self.updated_at);
    }

    /// Flag the note as carrying unconfirmed local changes.
    pub fn mark_pending(&mut self) {
        self.is_local = true;
        self.is_synced = false;
    }

    /// Wire body for create/update calls.
    ///
    /// The summary is always sent so clearing it locally clears it remotely.
    pub fn fields(&self) -> NoteFields {
        NoteFields {
            title: self.title.clone(),
            content: self.content.clone(),
            summary: Some(self.summary.clone()),
        }
    }

    /// Get the title truncated to `max_len` characters
    #[must_use]
    pub fn title_preview(&self, max_len: usize) -> String {
        self.title.chars().take(max_len).collect()
    }
}

/// Input of a create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    /// Trim fields and reject empties.
    pub fn validated(self) -> Result<Self> {
        Ok(Self {
            title: required_field(self.title, "title")?,
            content: required_field(self.content, "content")?,
        })
    }
}

/// Partial change of an existing note.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub summary: Option<String>,
}

impl NotePatch {
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.summary.is_none()
    }

    /// Trim title/content, reject empties and patches that change nothing.
    pub fn validated(self) -> Result<Self> {
        if self.is_empty() {
            return Err(Error::InvalidInput(
                "update must change at least one field".into(),
            ));
        }
        Ok(Self {
            title: self
                .title
                .map(|title| required_field(title, "title"))
                .transpose()?,
            content: self
                .content
                .map(|content| required_field(content, "content"))
                .transpose()?,
            summary: self.summary.map(|summary| summary.trim().to_string()),
        })
    }
}

fn required_field(value: String, name: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(Error::InvalidInput(format!("{name} cannot be empty")))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Request body of `POST /notes` and `PATCH /notes/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteFields {
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl NoteFields {
    /// Whether the server copy already carries these fields
    pub fn matches(&self, remote: &RemoteNote) -> bool {
        self.title == remote.title
            && self.content == remote.content
            && self.summary.as_deref().unwrap_or_default()
                == remote.summary.as_deref().unwrap_or_default()
    }
}

/// Server representation of a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteNote {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}
