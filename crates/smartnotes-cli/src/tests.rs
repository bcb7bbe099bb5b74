use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use pretty_assertions::assert_eq;
use smartnotes_core::config::ClientConfig;
use smartnotes_core::db::{Database, LocalNoteStore, SqliteNoteStore};
use smartnotes_core::{Note, NoteDraft, NoteId};

use crate::cli::{Cli, Commands};
use crate::commands::common::{
    format_note_lines, format_relative_time, normalize_content, normalize_note_identifier,
    note_preview, resolve_db_path, resolve_note_id, short_id, sync_state_label, GlobalOptions,
};
use crate::commands::config::{merge_config, run_config_init};
use crate::commands::edit::build_patch;
use crate::error::CliError;

fn remote_note(id: &str, title: &str) -> Note {
    let mut note = Note::pending(NoteDraft::new(title, "body"));
    note.id = NoteId::remote(id);
    note.is_local = false;
    note.is_synced = true;
    note
}

fn memory_store() -> SqliteNoteStore {
    SqliteNoteStore::new(Arc::new(Database::open_in_memory().unwrap()))
}

#[test]
fn normalize_content_trims_and_rejects_empty() {
    assert_eq!(normalize_content("  hello  "), Some("hello".to_string()));
    assert_eq!(normalize_content(" \n\t "), None);
}

#[test]
fn normalize_note_identifier_rejects_blank() {
    assert!(matches!(
        normalize_note_identifier("   "),
        Err(CliError::EmptyNoteId)
    ));
    assert_eq!(normalize_note_identifier(" abc ").unwrap(), "abc");
}

#[test]
fn format_relative_time_units() {
    let now = 10_000_000_000;
    assert_eq!(format_relative_time(now - 30_000, now), "just now");
    assert_eq!(format_relative_time(now - 120_000, now), "2m ago");
    assert_eq!(format_relative_time(now - 2 * 60 * 60_000, now), "2h ago");
    assert_eq!(format_relative_time(now - 3 * 24 * 60 * 60_000, now), "3d ago");
}

#[test]
fn note_preview_truncates_first_line() {
    assert_eq!(note_preview("short\nsecond line", 40), "short");
    assert_eq!(note_preview("a   b    c", 40), "a b c");
    assert_eq!(note_preview("abcdefghijkl", 8), "abcde...");
}

#[test]
fn short_id_keeps_temporary_prefix() {
    let temporary = NoteId::Temporary("local-0192f0aa-bbbb-7ccc".to_string());
    assert_eq!(short_id(&temporary), "local-0192f0aa");
    assert_eq!(short_id(&NoteId::remote("65f1c2d3e4f5a6b7c8d9e0f1")), "65f1c2d3");
}

#[test]
fn list_lines_mark_unsynced_notes() {
    let synced = remote_note("aaaaaaaaaaaa", "Groceries");
    let pending = Note::pending(NoteDraft::new("Draft", "body"));

    let lines = format_note_lines(&[synced, pending]);
    assert!(lines[0].starts_with("aaaaaaaa         Groceries"));
    assert!(lines[1].contains(" * Draft"));
}

#[test]
fn sync_state_label_distinguishes_unconfirmed_creates() {
    let pending = Note::pending(NoteDraft::new("t", "c"));
    assert_eq!(sync_state_label(&pending), "pending (not yet on server)");

    let mut edited = remote_note("abc", "t");
    assert_eq!(sync_state_label(&edited), "synced");
    edited.mark_pending();
    assert_eq!(sync_state_label(&edited), "pending");
}

#[test]
fn build_patch_requires_a_field() {
    assert!(matches!(build_patch(None, None), Err(CliError::NothingToEdit)));
    assert!(matches!(
        build_patch(None, Some("   ")),
        Err(CliError::EmptyContent)
    ));

    let patch = build_patch(Some(" New title "), None).unwrap();
    assert_eq!(patch.title.as_deref(), Some("New title"));
    assert_eq!(patch.content, None);
}

#[test]
fn merge_config_overlays_explicit_flags() {
    let options = GlobalOptions {
        db_path: Some(PathBuf::from("/tmp/notes.db")),
        ..GlobalOptions::default()
    };
    let merged = merge_config(
        ClientConfig::default(),
        Some("https://notes.example.com/api".to_string()),
        None,
        Some(60),
        &options,
    );

    assert_eq!(merged.api_base_url, "https://notes.example.com/api");
    assert_eq!(
        merged.request_timeout_secs,
        ClientConfig::default().request_timeout_secs
    );
    assert_eq!(merged.probe_interval_secs, 60);
    assert_eq!(merged.database_path, Some(PathBuf::from("/tmp/notes.db")));
}

#[test]
fn config_init_writes_a_file_later_runs_build_on() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("nested").join("config.json");
    let options = GlobalOptions {
        config_path: Some(config_path.clone()),
        db_path: Some(dir.path().join("notes.db")),
        ..GlobalOptions::default()
    };

    run_config_init(
        Some("https://notes.example.com/api/".to_string()),
        Some(5),
        None,
        &options,
    )
    .unwrap();
    let saved = ClientConfig::load_from_path(&config_path).unwrap();
    assert_eq!(saved.api_base_url, "https://notes.example.com/api");
    assert_eq!(saved.request_timeout_secs, 5);
    assert_eq!(saved.database_path, Some(dir.path().join("notes.db")));

    run_config_init(None, None, Some(90), &options).unwrap();
    let updated = ClientConfig::load_from_path(&config_path).unwrap();
    assert_eq!(updated.api_base_url, "https://notes.example.com/api");
    assert_eq!(updated.request_timeout_secs, 5);
    assert_eq!(updated.probe_interval_secs, 90);
}

#[test]
fn config_init_rejects_invalid_url_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.json");
    let options = GlobalOptions {
        config_path: Some(config_path.clone()),
        ..GlobalOptions::default()
    };

    let result = run_config_init(Some("notes.example.com".to_string()), None, None, &options);
    assert!(result.is_err());
    assert!(!config_path.exists());
}

#[test]
fn resolve_db_path_prefers_flag_over_config() {
    let config = ClientConfig {
        database_path: Some(PathBuf::from("/from/config.db")),
        ..ClientConfig::default()
    };

    assert_eq!(
        resolve_db_path(Some(PathBuf::from("/from/flag.db")), &config).unwrap(),
        PathBuf::from("/from/flag.db")
    );
    assert_eq!(
        resolve_db_path(None, &config).unwrap(),
        PathBuf::from("/from/config.db")
    );
}

#[test]
fn summarize_requires_note_or_text() {
    assert!(Cli::try_parse_from(["smartnotes", "summarize"]).is_err());
    assert!(Cli::try_parse_from(["smartnotes", "summarize", "abc", "--text", "hi"]).is_err());

    let cli = Cli::try_parse_from(["smartnotes", "summarize", "--text", "hello"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Summarize { id: None, text: Some(_) }
    ));
}

#[test]
fn global_flags_parse_after_subcommand() {
    let cli = Cli::try_parse_from(["smartnotes", "list", "--offline", "--db-path", "/tmp/x.db"])
        .unwrap();
    assert!(cli.offline);
    assert_eq!(cli.db_path, Some(PathBuf::from("/tmp/x.db")));
}

#[tokio::test]
async fn resolve_note_id_matches_unique_prefix() {
    let store = memory_store();
    store.put(&remote_note("65f1aaaa0000", "one")).await.unwrap();
    store.put(&remote_note("77b2bbbb0000", "two")).await.unwrap();

    let resolved = resolve_note_id("65f1", &store).await.unwrap();
    assert_eq!(resolved, NoteId::remote("65f1aaaa0000"));
}

#[tokio::test]
async fn resolve_note_id_reports_ambiguous_prefix() {
    let store = memory_store();
    store.put(&remote_note("65f1aaaa0000", "one")).await.unwrap();
    store.put(&remote_note("65f1bbbb0000", "two")).await.unwrap();

    let error = resolve_note_id("65f1", &store).await.unwrap_err();
    assert!(matches!(error, CliError::AmbiguousNoteId(_)));
}

#[tokio::test]
async fn resolve_note_id_follows_replaced_temporary_id() {
    let store = memory_store();
    let pending = Note::pending(NoteDraft::new("t", "c"));
    let temporary = pending.id.clone();
    store.put(&pending).await.unwrap();
    store
        .remap(&temporary, &NoteId::remote("99aa00bb11cc"))
        .await
        .unwrap();

    let resolved = resolve_note_id(temporary.as_str(), &store).await.unwrap();
    assert_eq!(resolved, NoteId::remote("99aa00bb11cc"));
}

#[tokio::test]
async fn resolve_note_id_passes_unknown_ids_through() {
    let store = memory_store();
    let resolved = resolve_note_id("ffffffffffff", &store).await.unwrap();
    assert_eq!(resolved, NoteId::remote("ffffffffffff"));
}
