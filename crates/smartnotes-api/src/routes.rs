use std::any::Any;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{extract_bearer_token, AuthenticatedUser, StaticTokenVerifier};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::store::{ApiNote, Created, NewNote, NoteChanges, NoteStore};
use crate::summarize::summarize;

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    verifier: Arc<StaticTokenVerifier>,
    notes: Arc<NoteStore>,
}

impl AppState {
    pub fn from_config(config: Arc<AppConfig>) -> Self {
        Self {
            verifier: Arc::new(StaticTokenVerifier::new(config.tokens.clone())),
            notes: Arc::new(NoteStore::new()),
            config,
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/notes", get(list_notes).post(create_note))
        .route(
            "/notes/{id}",
            get(get_note).patch(update_note).delete(delete_note),
        )
        .route("/summarize", post(summarize_text))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/api", protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(
            CorsLayer::new()
                .allow_origin(AnyOrigin)
                .allow_headers(AnyOrigin)
                .allow_methods(AnyOrigin),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
    })
}

async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers())?;
    let user = state.verifier.verify(token)?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn panic_response(_panic: Box<dyn Any + Send + 'static>) -> Response {
    AppError::Internal("Something went wrong!".to_string()).into_response()
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    page: Option<usize>,
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ListResponse {
    data: Vec<ApiNote>,
    pagination: Pagination,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Pagination {
    page: usize,
    limit: usize,
    total: usize,
    total_pages: usize,
}

async fn list_notes(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<ListResponse>, AppError> {
    let Query(query) = query.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(state.config.default_page_size)
        .clamp(1, state.config.max_page_size);

    let result = state.notes.list(&user.user_id, page, limit);
    tracing::debug!(
        user = user_fingerprint(&user.user_id),
        page,
        returned = result.items.len(),
        "Listed notes"
    );
    Ok(Json(ListResponse {
        data: result.items,
        pagination: Pagination {
            page,
            limit,
            total: result.total,
            total_pages: result.total.div_ceil(limit),
        },
    }))
}

async fn create_note(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    headers: HeaderMap,
    body: Result<Json<NewNote>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiNote>), AppError> {
    let Json(mut note) = body.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    note.title = required_text(&note.title, "Title")?;
    note.content = required_text(&note.content, "Content")?;
    let idempotency_key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    match state.notes.create(&user.user_id, note, idempotency_key) {
        Created::New(note) => {
            tracing::info!(
                user = user_fingerprint(&user.user_id),
                note = %note.id,
                "Created note"
            );
            Ok((StatusCode::CREATED, Json(note)))
        }
        Created::Replayed(note) => {
            tracing::info!(
                user = user_fingerprint(&user.user_id),
                note = %note.id,
                "Replayed idempotent create"
            );
            Ok((StatusCode::OK, Json(note)))
        }
    }
}

async fn get_note(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiNote>, AppError> {
    state
        .notes
        .get(&user.user_id, &id)
        .map(Json)
        .ok_or_else(AppError::note_not_found)
}

async fn update_note(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    body: Result<Json<NoteChanges>, JsonRejection>,
) -> Result<Json<ApiNote>, AppError> {
    let Json(mut changes) =
        body.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    changes.title = changes
        .title
        .map(|title| required_text(&title, "Title"))
        .transpose()?;
    changes.content = changes
        .content
        .map(|content| required_text(&content, "Content"))
        .transpose()?;

    let note = state
        .notes
        .update(&user.user_id, &id, changes)
        .ok_or_else(AppError::note_not_found)?;
    tracing::info!(
        user = user_fingerprint(&user.user_id),
        note = %note.id,
        "Updated note"
    );
    Ok(Json(note))
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: &'static str,
}

async fn delete_note(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    if !state.notes.delete(&user.user_id, &id) {
        return Err(AppError::note_not_found());
    }
    tracing::info!(
        user = user_fingerprint(&user.user_id),
        note = %id,
        "Deleted note"
    );
    Ok(Json(MessageResponse {
        message: "Note deleted successfully",
    }))
}

#[derive(Debug, Deserialize)]
struct SummarizeRequest {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct SummarizeResponse {
    summary: String,
}

async fn summarize_text(
    State(state): State<AppState>,
    body: Result<Json<SummarizeRequest>, JsonRejection>,
) -> Result<Json<SummarizeResponse>, AppError> {
    let Json(request) = body.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let text = request
        .text
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("Text is required"))?;

    Ok(Json(SummarizeResponse {
        summary: summarize(&text, state.config.summary_word_limit),
    }))
}

fn required_text(value: &str, field: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(AppError::bad_request(format!("{field} is required")))
    } else {
        Ok(trimmed.to_string())
    }
}

fn user_fingerprint(user_id: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    user_id.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_trims_and_rejects_blank() {
        assert_eq!(required_text("  hi ", "Title").unwrap(), "hi");
        let error = required_text("   ", "Title").unwrap_err();
        assert_eq!(error.to_string(), "Title is required");
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn pagination_serializes_camel_case() {
        let body = serde_json::to_value(Pagination {
            page: 1,
            limit: 20,
            total: 41,
            total_pages: 41_usize.div_ceil(20),
        })
        .unwrap();
        assert_eq!(body["totalPages"], 3);
    }

    #[test]
    fn user_fingerprint_is_stable() {
        assert_eq!(user_fingerprint("alice"), user_fingerprint("alice"));
        assert_ne!(user_fingerprint("alice"), user_fingerprint("bob"));
    }
}
