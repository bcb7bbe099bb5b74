use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use smartnotes_core::config::{
    ClientConfig, Session, CONFIG_FILE_NAME, DATABASE_FILE_NAME, SESSION_FILE_NAME,
};
use smartnotes_core::connectivity::{ConnectivityMonitor, HttpProbe, ReachabilityProbe};
use smartnotes_core::db::{Database, LocalNoteStore, SqliteNoteStore, SqliteSyncQueue};
use smartnotes_core::models::SyncEntry;
use smartnotes_core::remote::HttpNoteClient;
use smartnotes_core::{Note, NoteId, SyncEngine};

use crate::error::CliError;

const APP_DIR_NAME: &str = "smartnotes";

/// Upper bound on the startup reachability check
const STARTUP_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Flags shared by every subcommand
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub db_path: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
    pub offline: bool,
}

/// Everything a note command needs, wired from config and session.
pub struct AppContext {
    pub engine: Arc<SyncEngine>,
    pub store: Arc<SqliteNoteStore>,
    pub monitor: ConnectivityMonitor,
    pub config: ClientConfig,
}

#[derive(Debug, Serialize)]
pub struct NoteListItem {
    pub id: String,
    pub title: String,
    pub preview: String,
    pub summary: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub relative_time: String,
    pub synced: bool,
}

#[derive(Debug, Serialize)]
pub struct PendingItem {
    pub seq: i64,
    pub action: String,
    pub note_id: String,
    pub enqueued_at: i64,
}

pub async fn open_context(options: &GlobalOptions) -> Result<AppContext, CliError> {
    let config = load_config(options)?;
    let db_path = resolve_db_path(options.db_path.clone(), &config)?;
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db = Arc::new(Database::open(&db_path)?);
    let store = Arc::new(SqliteNoteStore::new(db.clone()));
    let queue = Arc::new(SqliteSyncQueue::new(db));
    let remote = Arc::new(HttpNoteClient::new(
        config.api_base_url.clone(),
        config.request_timeout(),
    )?);

    let online = if options.offline {
        false
    } else {
        let probe = HttpProbe::new(
            &config.api_base_url,
            config.request_timeout().min(STARTUP_PROBE_TIMEOUT),
        )?;
        probe.is_reachable().await
    };
    tracing::debug!(online, db = %db_path.display(), "Opened local replica");

    let monitor = ConnectivityMonitor::new(online);
    let engine = Arc::new(SyncEngine::new(
        store.clone(),
        queue,
        remote,
        Arc::new(monitor.clone()),
    ));
    engine.set_token(load_session()?.resolve_token(|name| env::var(name).ok()));

    Ok(AppContext {
        engine,
        store,
        monitor,
        config,
    })
}

pub fn load_config(options: &GlobalOptions) -> Result<ClientConfig, CliError> {
    let path = resolve_config_path(options.config_path.clone())?;
    let mut config = ClientConfig::load_from_path(&path)?;
    config.apply_env()?;
    Ok(config)
}

pub fn load_session() -> Result<Session, CliError> {
    Ok(Session::load_from_path(&session_path()?)?)
}

pub fn app_config_dir() -> Result<PathBuf, CliError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or_else(|| CliError::Config("failed to resolve config directory".to_string()))
}

pub fn resolve_config_path(cli_config_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    match cli_config_path {
        Some(path) => Ok(path),
        None => Ok(app_config_dir()?.join(CONFIG_FILE_NAME)),
    }
}

pub fn session_path() -> Result<PathBuf, CliError> {
    Ok(app_config_dir()?.join(SESSION_FILE_NAME))
}

/// `--db-path`, then config/env, then the platform data directory.
pub fn resolve_db_path(
    cli_db_path: Option<PathBuf>,
    config: &ClientConfig,
) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_db_path.or_else(|| config.database_path.clone()) {
        return Ok(path);
    }
    default_db_path()
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(DATABASE_FILE_NAME))
        .ok_or_else(|| CliError::Config("failed to resolve data directory".to_string()))
}

/// Resolve a full id, a replaced temporary id, or a unique prefix of a
/// stored note. Unknown ids are passed through for a server lookup.
pub async fn resolve_note_id(
    note_query: &str,
    store: &dyn LocalNoteStore,
) -> Result<NoteId, CliError> {
    let normalized = normalize_note_identifier(note_query)?;
    let exact = store.resolve(&normalized.parse::<NoteId>()?).await?;
    if store
        .get(&exact)
        .await?
        .is_some_and(|note| !note.is_deleted)
    {
        return Ok(exact);
    }

    let matches = store
        .get_all()
        .await
        .into_iter()
        .filter(|note| !note.is_deleted && note.id.as_str().starts_with(&normalized))
        .map(|note| note.id)
        .collect::<Vec<_>>();
    match_prefix(&normalized, matches).map(|found| found.unwrap_or(exact))
}

fn match_prefix(note_query: &str, mut matches: Vec<NoteId>) -> Result<Option<NoteId>, CliError> {
    match matches.len() {
        0 => Ok(None),
        1 => Ok(matches.pop()),
        _ => {
            let options = matches
                .iter()
                .take(3)
                .map(short_id)
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousNoteId(format!(
                "ID prefix '{note_query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn format_note_lines(notes: &[Note]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    notes
        .iter()
        .map(|note| {
            let id = short_id(&note.id);
            let marker = if note.is_synced { ' ' } else { '*' };
            let title = note_preview(&note.title, 30);
            let relative_time = format_relative_time(note.updated_at, now_ms);
            format!("{id:<14} {marker} {title:<30}  {relative_time}")
        })
        .collect()
}

pub fn format_note_detail(note: &Note) -> Vec<String> {
    let mut lines = vec![
        format!("id:       {}", note.id),
        format!("title:    {}", note.title),
        format!("updated:  {}", format_timestamp(note.updated_at)),
        format!("state:    {}", sync_state_label(note)),
    ];
    if !note.summary.is_empty() {
        lines.push(format!("summary:  {}", note.summary));
    }
    lines.push(String::new());
    lines.push(note.content.clone());
    lines
}

pub fn format_pending_lines(entries: &[SyncEntry]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    entries
        .iter()
        .map(|entry| {
            format!(
                "#{:<5} {:<6}  {:<14}  {}",
                entry.seq,
                entry.action().as_str(),
                short_id(entry.note_id()),
                format_relative_time(entry.enqueued_at, now_ms)
            )
        })
        .collect()
}

pub fn note_to_list_item(note: &Note) -> NoteListItem {
    let now_ms = Utc::now().timestamp_millis();
    NoteListItem {
        id: note.id.to_string(),
        title: note.title.clone(),
        preview: note_preview(&note.content, 80),
        summary: note.summary.clone(),
        created_at: note.created_at,
        updated_at: note.updated_at,
        relative_time: format_relative_time(note.updated_at, now_ms),
        synced: note.is_synced,
    }
}

pub fn entry_to_pending_item(entry: &SyncEntry) -> PendingItem {
    PendingItem {
        seq: entry.seq,
        action: entry.action().to_string(),
        note_id: entry.note_id().to_string(),
        enqueued_at: entry.enqueued_at,
    }
}

pub const fn sync_state_label(note: &Note) -> &'static str {
    if note.is_synced {
        "synced"
    } else if note.id.is_temporary() {
        "pending (not yet on server)"
    } else {
        "pending"
    }
}

/// First 8 characters of the id, after the temporary prefix if any.
pub fn short_id(id: &NoteId) -> String {
    let raw = id.as_str();
    match raw.strip_prefix(smartnotes_core::models::TEMPORARY_ID_PREFIX) {
        Some(rest) => format!(
            "{}{}",
            smartnotes_core::models::TEMPORARY_ID_PREFIX,
            rest.chars().take(8).collect::<String>()
        ),
        None => raw.chars().take(8).collect(),
    }
}

pub fn note_preview(text: &str, max_chars: usize) -> String {
    let first_line = text.lines().next().unwrap_or("").trim();
    let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < year {
        format!("{}w ago", diff / week)
    } else {
        format!("{}y ago", diff / year)
    }
}

/// Content from the arguments, falling back to piped stdin.
pub fn resolve_note_content(content_parts: &[String]) -> Result<String, CliError> {
    if let Some(content) = normalize_content(&content_parts.join(" ")) {
        return Ok(content);
    }

    if let Some(content) = read_piped_stdin()? {
        return Ok(content);
    }

    Err(CliError::EmptyContent)
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn normalize_note_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyNoteId)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}
