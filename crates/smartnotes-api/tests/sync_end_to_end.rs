//! Drives the real client stack against the real router on an ephemeral port.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::{Json, Router};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use smartnotes_api::{app_router, AppConfig, AppState};
use smartnotes_core::connectivity::{ConnectivityMonitor, HttpProbe, ReachabilityProbe};
use smartnotes_core::db::{Database, SqliteNoteStore, SqliteSyncQueue};
use smartnotes_core::remote::{HttpNoteClient, NoteRemote};
use smartnotes_core::{Error, NoteDraft, NoteId, NotePatch, SyncEngine};

const TOKEN: &str = "token-alice";

async fn spawn_server() -> SocketAddr {
    let config = AppConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        tokens: HashMap::from([
            (TOKEN.to_string(), "alice".to_string()),
            ("token-bob".to_string(), "bob".to_string()),
        ]),
        summary_word_limit: 5,
        default_page_size: 20,
        max_page_size: 100,
    };
    serve(app_router(AppState::from_config(Arc::new(config)))).await
}

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, router).await.expect("serve app") });
    addr
}

fn api_base(addr: SocketAddr) -> String {
    format!("http://{addr}/api")
}

fn client_engine(addr: SocketAddr, online: bool) -> (Arc<SyncEngine>, ConnectivityMonitor) {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let monitor = ConnectivityMonitor::new(online);
    let remote = HttpNoteClient::new(api_base(addr), Duration::from_secs(5)).unwrap();
    let engine = Arc::new(SyncEngine::new(
        Arc::new(SqliteNoteStore::new(db.clone())),
        Arc::new(SqliteSyncQueue::new(db)),
        Arc::new(remote),
        Arc::new(monitor.clone()),
    ));
    engine.set_token(Some(TOKEN.to_string()));
    (engine, monitor)
}

async fn server_notes(addr: SocketAddr, token: &str) -> Value {
    reqwest::Client::new()
        .get(format!("{}/notes", api_base(addr)))
        .bearer_auth(token)
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap()
}

#[tokio::test]
async fn offline_create_is_replayed_after_reconnect() {
    let addr = spawn_server().await;
    let (engine, monitor) = client_engine(addr, false);

    let note = engine
        .create_note(NoteDraft::new("Trip", "pack the tent"))
        .await
        .unwrap();
    assert!(note.id.is_temporary());
    assert_eq!(engine.pending_count().await.unwrap(), 1);
    assert_eq!(server_notes(addr, TOKEN).await["pagination"]["total"], 0);

    monitor.set_online(true);
    let report = engine.drain().await.unwrap();
    assert_eq!(report.confirmed, 1);
    assert!(report.is_complete());

    let notes = engine.get_notes().await.unwrap();
    assert_eq!(notes.len(), 1);
    assert!(matches!(notes[0].id, NoteId::Remote(_)));
    assert!(notes[0].is_synced);

    let listed = server_notes(addr, TOKEN).await;
    assert_eq!(listed["pagination"]["total"], 1);
    assert_eq!(listed["data"][0]["_id"], notes[0].id.as_str());
    assert_eq!(listed["data"][0]["title"], "Trip");

    // The old temporary id still reaches the note
    let by_old_id = engine.get_note(&note.id).await.unwrap();
    assert_eq!(by_old_id.id, notes[0].id);
}

#[tokio::test]
async fn online_lifecycle_with_summary() {
    let addr = spawn_server().await;
    let (engine, _monitor) = client_engine(addr, true);

    let note = engine
        .create_note(NoteDraft::new("Standup", "first second third fourth fifth sixth seventh"))
        .await
        .unwrap();
    assert!(matches!(note.id, NoteId::Remote(_)));
    assert_eq!(engine.pending_count().await.unwrap(), 0);

    let renamed = engine
        .update_note(&note.id, NotePatch::default().title("Daily standup"))
        .await
        .unwrap();
    assert_eq!(renamed.title, "Daily standup");
    assert!(renamed.is_synced);

    let summarized = engine.summarize_note(&note.id).await.unwrap();
    assert_eq!(summarized.summary, "first second third fourth fifth...");

    let listed = server_notes(addr, TOKEN).await;
    assert_eq!(listed["data"][0]["title"], "Daily standup");
    assert_eq!(listed["data"][0]["summary"], "first second third fourth fifth...");

    engine.delete_note(&note.id).await.unwrap();
    assert!(engine.get_notes().await.unwrap().is_empty());
    assert_eq!(server_notes(addr, TOKEN).await["pagination"]["total"], 0);
}

#[tokio::test]
async fn offline_edits_to_a_server_note_replay_in_order() {
    let addr = spawn_server().await;
    let (engine, monitor) = client_engine(addr, true);

    let keep = engine
        .create_note(NoteDraft::new("Keep", "v1"))
        .await
        .unwrap();
    let discard = engine
        .create_note(NoteDraft::new("Drop", "bye"))
        .await
        .unwrap();

    monitor.set_online(false);
    engine
        .update_note(&keep.id, NotePatch::default().content("v2"))
        .await
        .unwrap();
    engine
        .update_note(&keep.id, NotePatch::default().content("v3"))
        .await
        .unwrap();
    engine.delete_note(&discard.id).await.unwrap();
    assert_eq!(engine.pending_count().await.unwrap(), 3);

    monitor.set_online(true);
    let report = engine.drain().await.unwrap();
    assert_eq!(report.confirmed, 3);

    let listed = server_notes(addr, TOKEN).await;
    assert_eq!(listed["pagination"]["total"], 1);
    assert_eq!(listed["data"][0]["content"], "v3");
}

#[tokio::test]
async fn rejected_token_surfaces_auth_error() {
    let addr = spawn_server().await;
    let (engine, _monitor) = client_engine(addr, true);
    engine.set_token(Some("not-a-real-token".to_string()));

    let error = engine
        .create_note(NoteDraft::new("t", "c"))
        .await
        .unwrap_err();
    assert!(matches!(error, Error::Auth(_)));
    assert_eq!(engine.pending_count().await.unwrap(), 0);
}

#[tokio::test]
async fn notes_are_isolated_between_users() {
    let addr = spawn_server().await;
    let (engine, _monitor) = client_engine(addr, true);
    engine
        .create_note(NoteDraft::new("Alice only", "secret"))
        .await
        .unwrap();

    assert_eq!(server_notes(addr, "token-bob").await["pagination"]["total"], 0);
}

#[tokio::test]
async fn http_surface_status_codes() {
    let addr = spawn_server().await;
    let client = reqwest::Client::new();
    let base = api_base(addr);

    let health = client
        .get(format!("http://{addr}/healthz"))
        .send()
        .await
        .unwrap();
    assert_eq!(health.status(), 200);

    let unauthenticated = client.get(format!("{base}/notes")).send().await.unwrap();
    assert_eq!(unauthenticated.status(), 401);
    let body = unauthenticated.json::<Value>().await.unwrap();
    assert_eq!(body["message"], "Missing Authorization header");

    let missing = client
        .get(format!("{base}/notes/000000000000000000000000"))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);
    assert_eq!(
        missing.json::<Value>().await.unwrap()["message"],
        "Note not found"
    );

    let invalid = client
        .post(format!("{base}/notes"))
        .bearer_auth(TOKEN)
        .json(&serde_json::json!({ "title": "  ", "content": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(invalid.status(), 400);

    let no_text = client
        .post(format!("{base}/summarize"))
        .bearer_auth(TOKEN)
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(no_text.status(), 400);
    assert_eq!(
        no_text.json::<Value>().await.unwrap()["message"],
        "Text is required"
    );
}

#[tokio::test]
async fn idempotency_key_prevents_duplicate_creates() {
    let addr = spawn_server().await;
    let client = reqwest::Client::new();
    let url = format!("{}/notes", api_base(addr));
    let body = serde_json::json!({ "title": "Once", "content": "only once" });

    let first = client
        .post(&url)
        .bearer_auth(TOKEN)
        .header("Idempotency-Key", "local-abc")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 201);
    let first = first.json::<Value>().await.unwrap();

    let second = client
        .post(&url)
        .bearer_auth(TOKEN)
        .header("Idempotency-Key", "local-abc")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), 200);
    assert_eq!(second.json::<Value>().await.unwrap()["_id"], first["_id"]);

    assert_eq!(server_notes(addr, TOKEN).await["pagination"]["total"], 1);
}

#[tokio::test]
async fn health_probe_sees_running_server() {
    let addr = spawn_server().await;
    let probe = HttpProbe::new(&api_base(addr), Duration::from_secs(2)).unwrap();
    assert!(probe.is_reachable().await);
}

#[tokio::test]
async fn listing_stops_when_server_repeats_a_page() {
    async fn same_page() -> Json<Value> {
        Json(json!({
            "data": [{ "_id": "aaaaaaaaaaaaaaaaaaaaaaaa", "title": "t", "content": "c" }],
            "pagination": { "page": 1, "limit": 100, "total": 3, "totalPages": 3 }
        }))
    }
    let addr = serve(Router::new().route("/api/notes", get(same_page))).await;

    let client = HttpNoteClient::new(api_base(addr), Duration::from_secs(5)).unwrap();
    let notes = client.list(TOKEN).await.unwrap();
    assert_eq!(notes.len(), 3);
}

#[tokio::test]
async fn cleared_summary_is_cleared_on_server() {
    let addr = spawn_server().await;
    let (engine, _monitor) = client_engine(addr, true);
    let note = engine
        .create_note(NoteDraft::new("Brief", "one two three four five six"))
        .await
        .unwrap();
    engine.summarize_note(&note.id).await.unwrap();
    assert_eq!(
        server_notes(addr, TOKEN).await["data"][0]["summary"],
        "one two three four five..."
    );

    engine
        .update_note(&note.id, NotePatch::default().summary(""))
        .await
        .unwrap();
    assert_eq!(server_notes(addr, TOKEN).await["data"][0]["summary"], "");
}
