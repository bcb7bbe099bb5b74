//! Durable FIFO log of mutations not yet confirmed by the server

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::Database;
use crate::error::{Error, Result};
use crate::models::{NoteId, SyncAction, SyncEntry, SyncOp};
use crate::util::now_millis;

/// Ordered, durable queue of pending mutations.
///
/// Entries are appended by the sync engine and removed one by one as their
/// replay is confirmed, so a crash mid-drain loses nothing and replays at
/// most the entry that was in flight.
#[async_trait]
pub trait SyncQueue: Send + Sync {
    /// Append an entry; committed before returning
    async fn enqueue(&self, op: SyncOp) -> Result<SyncEntry>;

    /// All entries, oldest first. Unreadable rows are logged and skipped.
    async fn peek_all(&self) -> Result<Vec<SyncEntry>>;

    /// Current state of a single entry, `None` once it has been removed
    async fn entry(&self, seq: i64) -> Result<Option<SyncEntry>>;

    /// Drop a confirmed (or abandoned) entry
    async fn remove(&self, seq: i64) -> Result<()>;

    /// Swap the operation of an entry in place, keeping its position.
    /// Returns whether the entry still existed.
    async fn replace(&self, seq: i64, op: SyncOp) -> Result<bool>;

    /// Drop every entry
    async fn clear(&self) -> Result<()>;

    /// Point every entry referencing `from` at `to`, payloads included
    async fn remap(&self, from: &NoteId, to: &NoteId) -> Result<usize>;

    /// Number of entries referencing `id`
    async fn pending_for(&self, id: &NoteId) -> Result<usize>;

    /// Abandon every entry referencing `id`
    async fn discard_for(&self, id: &NoteId) -> Result<usize>;

    /// Total number of entries
    async fn len(&self) -> Result<usize>;

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

/// `SQLite` implementation of `SyncQueue`
#[derive(Clone)]
pub struct SqliteSyncQueue {
    db: Arc<Database>,
}

impl SqliteSyncQueue {
    pub const fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

fn read_entry(row: &Row<'_>) -> rusqlite::Result<(i64, String, String, i64)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn decode_entry((seq, action, payload, enqueued_at): (i64, String, String, i64)) -> Result<SyncEntry> {
    let op: SyncOp = serde_json::from_str(&payload)?;
    let action: SyncAction = action.parse()?;
    if op.action() != action {
        return Err(Error::Database(format!(
            "sync entry {seq} is tagged '{action}' but carries a '{}' payload",
            op.action()
        )));
    }
    Ok(SyncEntry {
        seq,
        op,
        enqueued_at,
    })
}

fn insert(conn: &Connection, op: SyncOp) -> Result<SyncEntry> {
    let enqueued_at = now_millis();
    let payload = serde_json::to_string(&op)?;
    let id = op.note_id();
    conn.execute(
        "INSERT INTO sync_queue (action, note_id, id_kind, payload, enqueued_at) VALUES (?, ?, ?, ?, ?)",
        params![
            op.action().as_str(),
            id.as_str(),
            id.kind().as_str(),
            payload,
            enqueued_at
        ],
    )?;
    Ok(SyncEntry {
        seq: conn.last_insert_rowid(),
        op,
        enqueued_at,
    })
}

fn select_all(conn: &Connection) -> Result<Vec<SyncEntry>> {
    let mut stmt = conn
        .prepare("SELECT seq, action, payload, enqueued_at FROM sync_queue ORDER BY seq ASC")?;
    let rows = stmt.query_map([], read_entry)?;

    let mut entries = Vec::new();
    for row in rows {
        match row.map_err(Error::from).and_then(decode_entry) {
            Ok(entry) => entries.push(entry),
            Err(error) => tracing::warn!("Skipping unreadable sync queue row: {error}"),
        }
    }
    Ok(entries)
}

fn select_one(conn: &Connection, seq: i64) -> Result<Option<SyncEntry>> {
    conn.query_row(
        "SELECT seq, action, payload, enqueued_at FROM sync_queue WHERE seq = ?",
        params![seq],
        read_entry,
    )
    .optional()?
    .map(decode_entry)
    .transpose()
}

fn remap_entries(conn: &mut Connection, from: &NoteId, to: &NoteId) -> Result<usize> {
    let tx = conn.transaction()?;

    let affected = {
        let mut stmt = tx.prepare(
            "SELECT seq, action, payload, enqueued_at FROM sync_queue WHERE note_id = ? AND id_kind = ? ORDER BY seq ASC",
        )?;
        let rows = stmt
            .query_map(params![from.as_str(), from.kind().as_str()], read_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter()
            .map(decode_entry)
            .collect::<Result<Vec<_>>>()?
    };

    for mut entry in affected.iter().cloned() {
        entry.op.retarget(to);
        tx.execute(
            "UPDATE sync_queue SET note_id = ?, id_kind = ?, payload = ? WHERE seq = ?",
            params![
                to.as_str(),
                to.kind().as_str(),
                serde_json::to_string(&entry.op)?,
                entry.seq
            ],
        )?;
    }

    tx.commit()?;
    Ok(affected.len())
}

fn count_for(conn: &Connection, id: &NoteId) -> Result<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sync_queue WHERE note_id = ? AND id_kind = ?",
        params![id.as_str(), id.kind().as_str()],
        |row| row.get(0),
    )?;
    Ok(usize::try_from(count).unwrap_or_default())
}

#[async_trait]
impl SyncQueue for SqliteSyncQueue {
    async fn enqueue(&self, op: SyncOp) -> Result<SyncEntry> {
        let conn = self.db.lock().await;
        let entry = insert(&conn, op)?;
        tracing::debug!(
            seq = entry.seq,
            action = %entry.action(),
            note = %entry.note_id(),
            "Queued mutation"
        );
        Ok(entry)
    }

    async fn peek_all(&self) -> Result<Vec<SyncEntry>> {
        let conn = self.db.lock().await;
        select_all(&conn)
    }

    async fn entry(&self, seq: i64) -> Result<Option<SyncEntry>> {
        let conn = self.db.lock().await;
        select_one(&conn, seq)
    }

    async fn remove(&self, seq: i64) -> Result<()> {
        let conn = self.db.lock().await;
        conn.execute("DELETE FROM sync_queue WHERE seq = ?", params![seq])?;
        Ok(())
    }

    async fn replace(&self, seq: i64, op: SyncOp) -> Result<bool> {
        let conn = self.db.lock().await;
        let id = op.note_id();
        let changed = conn.execute(
            "UPDATE sync_queue SET action = ?, note_id = ?, id_kind = ?, payload = ? WHERE seq = ?",
            params![
                op.action().as_str(),
                id.as_str(),
                id.kind().as_str(),
                serde_json::to_string(&op)?,
                seq
            ],
        )?;
        Ok(changed > 0)
    }

    async fn clear(&self) -> Result<()> {
        let conn = self.db.lock().await;
        conn.execute("DELETE FROM sync_queue", [])?;
        Ok(())
    }

    async fn remap(&self, from: &NoteId, to: &NoteId) -> Result<usize> {
        let mut conn = self.db.lock().await;
        remap_entries(&mut conn, from, to)
    }

    async fn pending_for(&self, id: &NoteId) -> Result<usize> {
        let conn = self.db.lock().await;
        count_for(&conn, id)
    }

    async fn discard_for(&self, id: &NoteId) -> Result<usize> {
        let conn = self.db.lock().await;
        let removed = conn.execute(
            "DELETE FROM sync_queue WHERE note_id = ? AND id_kind = ?",
            params![id.as_str(), id.kind().as_str()],
        )?;
        Ok(removed)
    }

    async fn len(&self) -> Result<usize> {
        let conn = self.db.lock().await;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sync_queue", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}
