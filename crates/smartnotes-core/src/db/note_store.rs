//! Local note store

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::Database;
use crate::error::{Error, Result};
use crate::models::{IdKind, Note, NoteId};
use crate::util::now_millis;

/// Durable, identifier-keyed storage of the user's notes.
///
/// Knows nothing about sync: callers merge fields before `put`, which
/// overwrites the whole record.
#[async_trait]
pub trait LocalNoteStore: Send + Sync {
    /// All stored notes, most recently modified first (ties broken by id).
    ///
    /// Never fails: unreadable storage is logged and reported as empty, and
    /// unreadable rows are skipped.
    async fn get_all(&self) -> Vec<Note>;

    /// Get a note by ID
    async fn get(&self, id: &NoteId) -> Result<Option<Note>>;

    /// Insert or fully replace the note with the same identifier
    async fn put(&self, note: &Note) -> Result<()>;

    /// Delete a note; removing a missing id is a no-op
    async fn remove(&self, id: &NoteId) -> Result<()>;

    /// Move a note from `from` to `to` and remember the alias
    async fn remap(&self, from: &NoteId, to: &NoteId) -> Result<()>;

    /// Follow a recorded temporary -> remote alias, if any
    async fn resolve(&self, id: &NoteId) -> Result<NoteId>;
}

/// `SQLite` implementation of `LocalNoteStore`
#[derive(Clone)]
pub struct SqliteNoteStore {
    db: Arc<Database>,
}

impl SqliteNoteStore {
    pub const fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

const NOTE_COLUMNS: &str = "id, id_kind, title, content, summary, created_at, updated_at, is_local, is_synced, is_deleted";

/// Raw column values, validated separately so one bad row can be skipped.
struct NoteRow {
    id: String,
    id_kind: String,
    title: String,
    content: String,
    summary: String,
    created_at: i64,
    updated_at: i64,
    is_local: bool,
    is_synced: bool,
    is_deleted: bool,
}

impl NoteRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            id_kind: row.get(1)?,
            title: row.get(2)?,
            content: row.get(3)?,
            summary: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
            is_local: row.get(7)?,
            is_synced: row.get(8)?,
            is_deleted: row.get(9)?,
        })
    }
}

impl TryFrom<NoteRow> for Note {
    type Error = Error;

    fn try_from(row: NoteRow) -> Result<Self> {
        let kind = IdKind::parse(&row.id_kind).ok_or_else(|| {
            Error::Database(format!(
                "note {} has unknown id kind '{}'",
                row.id, row.id_kind
            ))
        })?;
        Ok(Self {
            id: NoteId::from_parts(kind, row.id),
            title: row.title,
            content: row.content,
            summary: row.summary,
            created_at: row.created_at,
            updated_at: row.updated_at,
            is_local: row.is_local,
            is_synced: row.is_synced,
            is_deleted: row.is_deleted,
        })
    }
}

fn select_all(conn: &Connection) -> Result<Vec<Note>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {NOTE_COLUMNS} FROM notes ORDER BY updated_at DESC, id ASC"
    ))?;
    let rows = stmt.query_map([], NoteRow::read)?;

    let mut notes = Vec::new();
    for row in rows {
        match row.map_err(Error::from).and_then(Note::try_from) {
            Ok(note) => notes.push(note),
            Err(error) => tracing::warn!("Skipping unreadable local note row: {error}"),
        }
    }
    Ok(notes)
}

fn select_one(conn: &Connection, id: &NoteId) -> Result<Option<Note>> {
    conn.query_row(
        &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ? AND id_kind = ?"),
        params![id.as_str(), id.kind().as_str()],
        NoteRow::read,
    )
    .optional()?
    .map(Note::try_from)
    .transpose()
}

fn upsert(conn: &Connection, note: &Note) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO notes ({NOTE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ),
        params![
            note.id.as_str(),
            note.id.kind().as_str(),
            note.title,
            note.content,
            note.summary,
            note.created_at,
            note.updated_at,
            note.is_local,
            note.is_synced,
            note.is_deleted,
        ],
    )?;
    Ok(())
}

fn delete(conn: &Connection, id: &NoteId) -> Result<()> {
    conn.execute(
        "DELETE FROM notes WHERE id = ? AND id_kind = ?",
        params![id.as_str(), id.kind().as_str()],
    )?;
    Ok(())
}

fn remap_note(conn: &mut Connection, from: &NoteId, to: &NoteId) -> Result<()> {
    let tx = conn.transaction()?;

    if let Some(mut note) = select_one(&tx, from)? {
        delete(&tx, from)?;
        note.id = to.clone();
        upsert(&tx, &note)?;
    } else {
        tracing::debug!("No local note stored under {from}; recording alias only");
    }

    if from.is_temporary() {
        tx.execute(
            "INSERT OR REPLACE INTO note_aliases (temporary_id, remote_id, created_at) VALUES (?, ?, ?)",
            params![from.as_str(), to.as_str(), now_millis()],
        )?;
    }

    tx.commit()?;
    Ok(())
}

fn lookup_alias(conn: &Connection, id: &NoteId) -> Result<NoteId> {
    if !id.is_temporary() {
        return Ok(id.clone());
    }
    let remote: Option<String> = conn
        .query_row(
            "SELECT remote_id FROM note_aliases WHERE temporary_id = ?",
            params![id.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(remote.map_or_else(|| id.clone(), NoteId::Remote))
}

#[async_trait]
impl LocalNoteStore for SqliteNoteStore {
    async fn get_all(&self) -> Vec<Note> {
        let conn = self.db.lock().await;
        select_all(&conn).unwrap_or_else(|error| {
            tracing::warn!("Local note storage unreadable, treating as empty: {error}");
            Vec::new()
        })
    }

    async fn get(&self, id: &NoteId) -> Result<Option<Note>> {
        let conn = self.db.lock().await;
        select_one(&conn, id)
    }

    async fn put(&self, note: &Note) -> Result<()> {
        let conn = self.db.lock().await;
        upsert(&conn, note)
    }

    async fn remove(&self, id: &NoteId) -> Result<()> {
        let conn = self.db.lock().await;
        delete(&conn, id)
    }

    async fn remap(&self, from: &NoteId, to: &NoteId) -> Result<()> {
        let mut conn = self.db.lock().await;
        remap_note(&mut conn, from, to)
    }

    async fn resolve(&self, id: &NoteId) -> Result<NoteId> {
        let conn = self.db.lock().await;
        lookup_alias(&conn, id)
    }
}
