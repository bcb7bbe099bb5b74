//! Offline-first orchestration of note reads, writes and queue replay

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;

use super::report::{DrainReport, SkipReason};
use crate::connectivity::{Connectivity, ReconnectSubscription};
use crate::db::{LocalNoteStore, SyncQueue};
use crate::error::{Error, Result};
use crate::models::{Note, NoteDraft, NoteId, NotePatch, RemoteNote, SyncEntry, SyncOp};
use crate::remote::{NoteRemote, RemoteError};
use crate::util::{non_blank, now_millis};

/// What replaying one queue entry amounted to
enum Replay {
    Confirmed,
    /// Transient failure; the entry stays queued
    Retry(RemoteError),
    /// Rejected for good; the entry was dropped
    Abandoned(RemoteError),
}

/// Single entry point for every note operation.
///
/// Mutations and each replayed queue entry run under one lock, so a user
/// edit never interleaves with the remap of an in-flight create: it lands
/// either before the replay starts or after its local bookkeeping is done.
pub struct SyncEngine {
    store: Arc<dyn LocalNoteStore>,
    queue: Arc<dyn SyncQueue>,
    remote: Arc<dyn NoteRemote>,
    connectivity: Arc<dyn Connectivity>,
    token: RwLock<Option<String>>,
    write_lock: Mutex<()>,
    drain_lock: Mutex<()>,
    drain_wanted: Arc<Notify>,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn LocalNoteStore>,
        queue: Arc<dyn SyncQueue>,
        remote: Arc<dyn NoteRemote>,
        connectivity: Arc<dyn Connectivity>,
    ) -> Self {
        Self {
            store,
            queue,
            remote,
            connectivity,
            token: RwLock::new(None),
            write_lock: Mutex::new(()),
            drain_lock: Mutex::new(()),
            drain_wanted: Arc::new(Notify::new()),
        }
    }

    /// Replace the bearer token used for remote calls; blank clears it
    pub fn set_token(&self, token: Option<String>) {
        *self.token.write() = non_blank(token);
    }

    pub fn has_token(&self) -> bool {
        self.token.read().is_some()
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    /// Token to use for a live call, `None` when offline.
    fn live_token(&self) -> Result<Option<String>> {
        if !self.connectivity.is_online() {
            return Ok(None);
        }
        self.token
            .read()
            .clone()
            .map(Some)
            .ok_or_else(|| Error::Auth("not signed in".to_string()))
    }

    fn request_drain(&self) {
        if self.connectivity.is_online() {
            self.drain_wanted.notify_one();
        }
    }

    // Write path

    pub async fn create_note(&self, draft: NoteDraft) -> Result<Note> {
        let draft = draft.validated()?;
        let token = self.live_token()?;
        let _guard = self.write_lock.lock().await;

        let pending = Note::pending(draft);

        if let Some(token) = token {
            // Same key as a later replay, so a lost response cannot duplicate the note
            match self
                .remote
                .create(&token, &pending.fields(), Some(pending.id.as_str()))
                .await
            {
                Ok(remote) => {
                    let note = Note::from_remote(remote);
                    self.store.put(&note).await?;
                    tracing::debug!(note = %note.id, "Created note on server");
                    return Ok(note);
                }
                Err(error) if error.is_retryable_write() => {
                    tracing::warn!("Remote create failed, keeping it offline: {error}");
                }
                Err(error) => return Err(error.into()),
            }
        }

        self.store.put(&pending).await?;
        self.queue.enqueue(SyncOp::Create(pending.clone())).await?;
        self.request_drain();
        tracing::debug!(note = %pending.id, "Queued note creation");
        Ok(pending)
    }

    pub async fn update_note(&self, id: &NoteId, patch: NotePatch) -> Result<Note> {
        let patch = patch.validated()?;
        let token = self.live_token()?;
        let _guard = self.write_lock.lock().await;

        let id = self.store.resolve(id).await?;
        let mut note = self
            .store
            .get(&id)
            .await?
            .filter(|note| !note.is_deleted)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        note.apply(&patch);

        if let (Some(token), Some(remote_id)) = (token, id.remote_id()) {
            if self.queue.pending_for(&id).await? == 0 {
                match self.remote.update(&token, remote_id, &note.fields()).await {
                    Ok(remote) => {
                        let synced = Note::from_remote(remote);
                        self.store.put(&synced).await?;
                        tracing::debug!(note = %synced.id, "Updated note on server");
                        return Ok(synced);
                    }
                    Err(error) if error.is_retryable_write() => {
                        tracing::warn!("Remote update failed, keeping it offline: {error}");
                    }
                    Err(error) => return Err(error.into()),
                }
            }
        }

        note.mark_pending();
        self.store.put(&note).await?;
        self.queue.enqueue(SyncOp::Update(note.clone())).await?;
        self.request_drain();
        tracing::debug!(note = %note.id, "Queued note update");
        Ok(note)
    }

    pub async fn delete_note(&self, id: &NoteId) -> Result<()> {
        let token = self.live_token()?;
        let _guard = self.write_lock.lock().await;

        let id = self.store.resolve(id).await?;

        if id.is_temporary() {
            // Never reached the server: forget it entirely
            let discarded = self.queue.discard_for(&id).await?;
            self.store.remove(&id).await?;
            tracing::debug!(note = %id, discarded, "Dropped unsynced note");
            return Ok(());
        }

        if let (Some(token), Some(remote_id)) = (token, id.remote_id()) {
            if self.queue.pending_for(&id).await? == 0 {
                match self.remote.delete(&token, remote_id).await {
                    Ok(()) | Err(RemoteError::NotFound(_)) => {
                        self.store.remove(&id).await?;
                        tracing::debug!(note = %id, "Deleted note on server");
                        return Ok(());
                    }
                    Err(error) if error.is_retryable_write() => {
                        tracing::warn!("Remote delete failed, keeping it offline: {error}");
                    }
                    Err(error) => return Err(error.into()),
                }
            }
        }

        if let Some(mut note) = self.store.get(&id).await? {
            note.is_deleted = true;
            note.mark_pending();
            note.updated_at = now_millis().max(note.updated_at);
            self.store.put(&note).await?;
        }
        self.queue.enqueue(SyncOp::Delete(id.clone())).await?;
        self.request_drain();
        tracing::debug!(note = %id, "Queued note deletion");
        Ok(())
    }

    // Read path

    /// Visible notes, most recently modified first.
    ///
    /// Online, the server listing is mirrored locally first; notes with
    /// unconfirmed local changes keep their local state. Any fetch failure
    /// other than an auth rejection falls back to the local copy.
    pub async fn get_notes(&self) -> Result<Vec<Note>> {
        let _guard = self.write_lock.lock().await;

        let token = self.token.read().clone();
        match token {
            Some(token) if self.connectivity.is_online() => {
                match self.remote.list(&token).await {
                    Ok(remote) => self.reconcile(remote).await?,
                    Err(error) if error.is_auth() => return Err(error.into()),
                    Err(error) => {
                        tracing::warn!("Fetching notes failed, showing local copy: {error}");
                    }
                }
            }
            Some(_) => tracing::debug!("Offline, showing local notes"),
            None => tracing::debug!("Not signed in, showing local notes"),
        }

        Ok(self
            .store
            .get_all()
            .await
            .into_iter()
            .filter(|note| !note.is_deleted)
            .collect())
    }

    async fn reconcile(&self, remote: Vec<RemoteNote>) -> Result<()> {
        let pending: HashSet<NoteId> = self
            .queue
            .peek_all()
            .await?
            .iter()
            .map(|entry| entry.note_id().clone())
            .collect();

        let mut listed = HashSet::with_capacity(remote.len());
        for remote_note in remote {
            let note = Note::from_remote(remote_note);
            listed.insert(note.id.clone());
            if !pending.contains(&note.id) {
                self.store.put(&note).await?;
            }
        }

        let mut dropped = 0usize;
        for local in self.store.get_all().await {
            let gone = !local.id.is_temporary()
                && !listed.contains(&local.id)
                && !pending.contains(&local.id);
            if gone {
                self.store.remove(&local.id).await?;
                dropped += 1;
            }
        }

        tracing::debug!(
            listed = listed.len(),
            pending = pending.len(),
            dropped,
            "Reconciled local notes with server"
        );
        Ok(())
    }

    /// One note, refreshed from the server when it has no pending changes
    pub async fn get_note(&self, id: &NoteId) -> Result<Note> {
        let _guard = self.write_lock.lock().await;
        let id = self.store.resolve(id).await?;

        let token = self.token.read().clone();
        if let (Some(token), Some(remote_id)) = (token, id.remote_id()) {
            if self.connectivity.is_online() && self.queue.pending_for(&id).await? == 0 {
                match self.remote.get_by_id(&token, remote_id).await {
                    Ok(remote) => {
                        let note = Note::from_remote(remote);
                        self.store.put(&note).await?;
                        return Ok(note);
                    }
                    Err(RemoteError::NotFound(message)) => {
                        self.store.remove(&id).await?;
                        return Err(Error::NotFound(message));
                    }
                    Err(error) if error.is_auth() => return Err(error.into()),
                    Err(error) => {
                        tracing::warn!("Fetching note failed, showing local copy: {error}");
                    }
                }
            }
        }

        self.store
            .get(&id)
            .await?
            .filter(|note| !note.is_deleted)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    // Summaries

    /// Summarize arbitrary text; there is no offline fallback
    pub async fn summarize_text(&self, text: &str) -> Result<String> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::InvalidInput("text to summarize cannot be empty".into()));
        }
        let token = self
            .live_token()?
            .ok_or_else(|| Error::Offline("summarizing requires a connection".to_string()))?;
        Ok(self.remote.summarize(&token, text).await?)
    }

    /// Summarize a note's content and save the summary on the note
    pub async fn summarize_note(&self, id: &NoteId) -> Result<Note> {
        let note = {
            let _guard = self.write_lock.lock().await;
            let id = self.store.resolve(id).await?;
            self.store
                .get(&id)
                .await?
                .filter(|note| !note.is_deleted)
                .ok_or_else(|| Error::NotFound(id.to_string()))?
        };

        let summary = self.summarize_text(&note.content).await?;
        self.update_note(&note.id, NotePatch::default().summary(summary))
            .await
    }

    // Queue inspection

    pub async fn pending_count(&self) -> Result<usize> {
        self.queue.len().await
    }

    pub async fn pending_entries(&self) -> Result<Vec<SyncEntry>> {
        self.queue.peek_all().await
    }

    // Drain path

    /// Replay the queue against the server, oldest entry first.
    ///
    /// Safe to call redundantly: overlapping calls collapse into the one
    /// already running. Transient failures leave their entry queued and
    /// hold back later entries for the same note; an auth rejection stops
    /// the pass and is returned as [`Error::Auth`].
    pub async fn drain(&self) -> Result<DrainReport> {
        let Ok(_running) = self.drain_lock.try_lock() else {
            tracing::debug!("Drain already in progress");
            return Ok(DrainReport::skipped(
                SkipReason::AlreadyRunning,
                self.queue.len().await?,
            ));
        };

        if !self.connectivity.is_online() {
            return Ok(DrainReport::skipped(
                SkipReason::Offline,
                self.queue.len().await?,
            ));
        }
        let token = self.token.read().clone();
        let Some(token) = token else {
            return Ok(DrainReport::skipped(
                SkipReason::NoToken,
                self.queue.len().await?,
            ));
        };

        let snapshot = self.queue.peek_all().await?;
        if snapshot.is_empty() {
            return Ok(DrainReport::default());
        }
        tracing::info!(entries = snapshot.len(), "Draining sync queue");

        let mut report = DrainReport::default();
        let mut blocked: HashSet<NoteId> = HashSet::new();

        for queued in snapshot {
            let _guard = self.write_lock.lock().await;

            // Earlier replays may have remapped or discarded it
            let Some(entry) = self.queue.entry(queued.seq).await? else {
                continue;
            };
            let Some(entry) = self.adopt_confirmed_remap(entry).await? else {
                continue;
            };

            if blocked.contains(entry.note_id()) || !self.connectivity.is_online() {
                report.deferred += 1;
                continue;
            }

            report.attempted += 1;
            match self.replay(&token, &entry).await? {
                Replay::Confirmed => report.confirmed += 1,
                Replay::Retry(error) => {
                    tracing::warn!(
                        seq = entry.seq,
                        action = %entry.action(),
                        note = %entry.note_id(),
                        "Replay failed, will retry: {error}"
                    );
                    report.failed += 1;
                    // A create may have been confirmed under a new id before failing
                    blocked.insert(self.store.resolve(entry.note_id()).await?);
                    blocked.insert(entry.note_id().clone());
                }
                Replay::Abandoned(error) => {
                    tracing::warn!(
                        seq = entry.seq,
                        action = %entry.action(),
                        note = %entry.note_id(),
                        "Server rejected queued change, dropping it: {error}"
                    );
                    report.abandoned += 1;
                }
            }
        }

        report.remaining = self.queue.len().await?;
        tracing::info!(
            confirmed = report.confirmed,
            failed = report.failed,
            deferred = report.deferred,
            abandoned = report.abandoned,
            remaining = report.remaining,
            "Drain finished"
        );
        Ok(report)
    }

    /// Finish a remap interrupted between the store and the queue.
    ///
    /// Returns the up-to-date entry, or `None` when nothing is left to send.
    async fn adopt_confirmed_remap(&self, mut entry: SyncEntry) -> Result<Option<SyncEntry>> {
        let id = entry.note_id().clone();
        if id.is_temporary() {
            let resolved = self.store.resolve(&id).await?;
            if resolved != id {
                self.queue.remap(&id, &resolved).await?;
                match self.queue.entry(entry.seq).await? {
                    Some(current) => entry = current,
                    None => return Ok(None),
                }
            }
        }

        if let SyncOp::Create(note) = &entry.op {
            if !note.id.is_temporary() {
                // A create carrying a server id was already confirmed
                tracing::debug!(seq = entry.seq, note = %note.id, "Dropping already confirmed create");
                self.queue.remove(entry.seq).await?;
                self.mark_synced_if_idle(&note.id).await?;
                return Ok(None);
            }
        }
        Ok(Some(entry))
    }

    async fn mark_synced_if_idle(&self, id: &NoteId) -> Result<()> {
        if self.queue.pending_for(id).await? > 0 {
            return Ok(());
        }
        if let Some(mut local) = self.store.get(id).await? {
            local.is_local = false;
            local.is_synced = true;
            self.store.put(&local).await?;
        }
        Ok(())
    }

    async fn replay(&self, token: &str, entry: &SyncEntry) -> Result<Replay> {
        match &entry.op {
            SyncOp::Create(note) => self.replay_create(token, entry.seq, note).await,
            SyncOp::Update(note) if note.id.is_temporary() => {
                // Its create is gone; the update alone must bring the note into existence
                self.replay_create(token, entry.seq, note).await
            }
            SyncOp::Update(note) => self.replay_update(token, entry.seq, note).await,
            SyncOp::Delete(id) => self.replay_delete(token, entry.seq, id).await,
        }
    }

    async fn replay_create(&self, token: &str, seq: i64, note: &Note) -> Result<Replay> {
        let temporary = note.id.clone();
        match self
            .remote
            .create(token, &note.fields(), Some(temporary.as_str()))
            .await
        {
            Ok(remote) => {
                let remote_id = NoteId::remote(remote.id.clone());
                self.store.remap(&temporary, &remote_id).await?;
                self.queue.remap(&temporary, &remote_id).await?;
                tracing::info!(from = %temporary, to = %remote_id, "Queued note created on server");

                if !note.fields().matches(&remote) {
                    // The key was used by an earlier create whose reply got lost;
                    // the server holds that older state, so push this entry over it
                    let mut current = note.clone();
                    current.id = remote_id;
                    self.queue
                        .replace(seq, SyncOp::Update(current.clone()))
                        .await?;
                    return self.replay_update(token, seq, &current).await;
                }

                self.queue.remove(seq).await?;
                self.settle(&remote_id, Some(remote)).await?;
                Ok(Replay::Confirmed)
            }
            Err(error) if error.is_auth() => Err(error.into()),
            Err(error) if error.is_retryable_write() => Ok(Replay::Retry(error)),
            Err(error) => {
                // Later edits cannot apply to a note the server refused
                self.queue.discard_for(&temporary).await?;
                Ok(Replay::Abandoned(error))
            }
        }
    }

    async fn replay_update(&self, token: &str, seq: i64, note: &Note) -> Result<Replay> {
        let Some(remote_id) = note.id.remote_id() else {
            return Err(Error::InvalidInput(format!(
                "update for {} has no server id",
                note.id
            )));
        };
        match self.remote.update(token, remote_id, &note.fields()).await {
            Ok(remote) => {
                self.queue.remove(seq).await?;
                self.settle(&note.id, Some(remote)).await?;
                Ok(Replay::Confirmed)
            }
            Err(error) if error.is_auth() => Err(error.into()),
            Err(error) if error.is_retryable_write() => Ok(Replay::Retry(error)),
            Err(error @ RemoteError::NotFound(_)) => {
                // Deleted elsewhere: the local copy is stale
                self.queue.discard_for(&note.id).await?;
                self.store.remove(&note.id).await?;
                Ok(Replay::Abandoned(error))
            }
            Err(error) => {
                self.queue.remove(seq).await?;
                self.settle(&note.id, None).await?;
                Ok(Replay::Abandoned(error))
            }
        }
    }

    async fn replay_delete(&self, token: &str, seq: i64, id: &NoteId) -> Result<Replay> {
        let Some(remote_id) = id.remote_id() else {
            // Created and deleted offline: nothing exists server-side
            self.queue.discard_for(id).await?;
            self.store.remove(id).await?;
            return Ok(Replay::Confirmed);
        };
        match self.remote.delete(token, remote_id).await {
            Ok(()) | Err(RemoteError::NotFound(_)) => {
                self.queue.remove(seq).await?;
                self.store.remove(id).await?;
                Ok(Replay::Confirmed)
            }
            Err(error) if error.is_auth() => Err(error.into()),
            Err(error) if error.is_retryable_write() => Ok(Replay::Retry(error)),
            Err(error) => {
                self.queue.remove(seq).await?;
                self.settle(id, None).await?;
                Ok(Replay::Abandoned(error))
            }
        }
    }

    /// Update local flags after an entry for `id` left the queue.
    ///
    /// With nothing else pending the server copy (when known) becomes the
    /// local state; otherwise the local note stays marked unsynced.
    async fn settle(&self, id: &NoteId, server: Option<RemoteNote>) -> Result<()> {
        let pending = self.queue.pending_for(id).await?;
        let Some(mut local) = self.store.get(id).await? else {
            return Ok(());
        };

        if pending > 0 {
            local.mark_pending();
        } else if let Some(server) = server {
            local = Note::from_remote(server);
        } else if local.is_deleted {
            // Delete was rejected; show the note again
            local.is_deleted = false;
        }
        self.store.put(&local).await
    }

    // Background draining

    /// Drain on every reconnect (and once right away) in a background task.
    ///
    /// Bursts of triggers coalesce into one drain. Dropping the returned
    /// handle unsubscribes and stops the task.
    pub fn spawn_auto_drain(self: &Arc<Self>) -> AutoDrain {
        let wanted = self.drain_wanted.clone();
        let trigger = wanted.clone();
        let subscription = self
            .connectivity
            .on_reconnect(Arc::new(move || trigger.notify_one()));

        let engine = Arc::clone(self);
        wanted.notify_one();
        let task = tokio::spawn(async move {
            loop {
                wanted.notified().await;
                match engine.drain().await {
                    Ok(report) => tracing::debug!("Background drain: {report}"),
                    Err(error) => tracing::warn!("Background drain failed: {error}"),
                }
            }
        });

        AutoDrain {
            _subscription: subscription,
            task,
        }
    }
}

/// Handle on the background drain task
pub struct AutoDrain {
    _subscription: ReconnectSubscription,
    task: JoinHandle<()>,
}

impl AutoDrain {
    /// Same as dropping the handle
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for AutoDrain {
    fn drop(&mut self) {
        self.task.abort();
    }
}
