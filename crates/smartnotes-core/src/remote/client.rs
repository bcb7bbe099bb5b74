//! reqwest implementation of `NoteRemote`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{NoteRemote, RemoteError, RemoteResult};
use crate::error::{Error, Result};
use crate::models::{NoteFields, RemoteNote};
use crate::util::{compact_text, has_http_scheme, non_blank};

/// Notes requested per page when listing
pub const LIST_PAGE_SIZE: u32 = 100;

pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

#[derive(Clone)]
pub struct HttpNoteClient {
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpNoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpNoteClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpNoteClient {
    /// Build a client for `base_url` (e.g. `http://127.0.0.1:3000/api`).
    ///
    /// Every request is bounded by `timeout`; hitting it surfaces as
    /// [`RemoteError::Network`].
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| Error::InvalidInput(format!("HTTP client setup failed: {error}")))?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(token)
            .header("Accept", "application/json")
    }

    async fn list_page(&self, token: &str, page: u32) -> RemoteResult<ListResponse> {
        let request = self
            .request(Method::GET, "/notes", token)
            .query(&[("page", page), ("limit", LIST_PAGE_SIZE)]);
        decode(send(request).await?).await
    }
}

#[async_trait]
impl NoteRemote for HttpNoteClient {
    async fn list(&self, token: &str) -> RemoteResult<Vec<RemoteNote>> {
        let mut notes = Vec::new();
        let mut page = 1;

        loop {
            match self.list_page(token, page).await? {
                ListResponse::Bare(batch) => {
                    notes.extend(batch);
                    break;
                }
                ListResponse::Paged { data, pagination } => {
                    let fetched = data.len();
                    notes.extend(data);
                    // Advance locally; the echoed page number is not trusted
                    page += 1;
                    match pagination {
                        Some(pagination) if fetched > 0 && page <= pagination.total_pages => {}
                        _ => break,
                    }
                }
            }
        }

        tracing::debug!(count = notes.len(), "Fetched remote notes");
        Ok(notes)
    }

    async fn get_by_id(&self, token: &str, id: &str) -> RemoteResult<RemoteNote> {
        let request = self.request(Method::GET, &format!("/notes/{id}"), token);
        decode(send(request).await?).await
    }

    async fn create(
        &self,
        token: &str,
        fields: &NoteFields,
        idempotency_key: Option<&str>,
    ) -> RemoteResult<RemoteNote> {
        let mut request = self.request(Method::POST, "/notes", token).json(fields);
        if let Some(key) = idempotency_key {
            request = request.header(IDEMPOTENCY_KEY_HEADER, key);
        }
        decode(send(request).await?).await
    }

    async fn update(&self, token: &str, id: &str, fields: &NoteFields) -> RemoteResult<RemoteNote> {
        let request = self
            .request(Method::PATCH, &format!("/notes/{id}"), token)
            .json(fields);
        decode(send(request).await?).await
    }

    async fn delete(&self, token: &str, id: &str) -> RemoteResult<()> {
        let request = self.request(Method::DELETE, &format!("/notes/{id}"), token);
        send(request).await?;
        Ok(())
    }

    async fn summarize(&self, token: &str, text: &str) -> RemoteResult<String> {
        let request = self
            .request(Method::POST, "/summarize", token)
            .json(&SummarizeRequest { text });
        let payload: SummarizeResponse = decode(send(request).await?).await?;
        Ok(payload.summary)
    }
}

#[derive(Serialize)]
struct SummarizeRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct SummarizeResponse {
    summary: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListResponse {
    Paged {
        data: Vec<RemoteNote>,
        #[serde(default)]
        pagination: Option<Pagination>,
    },
    Bare(Vec<RemoteNote>),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pagination {
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    error: Option<String>,
    details: Option<String>,
}

async fn send(request: RequestBuilder) -> RemoteResult<Response> {
    let response = request.send().await.map_err(transport_error)?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, &body))
}

async fn decode<T: DeserializeOwned>(response: Response) -> RemoteResult<T> {
    let body = response.text().await.map_err(transport_error)?;
    serde_json::from_str(&body).map_err(|error| RemoteError::InvalidResponse(error.to_string()))
}

fn transport_error(error: reqwest::Error) -> RemoteError {
    if error.is_timeout() {
        RemoteError::Network("request timed out".to_string())
    } else if error.is_decode() {
        RemoteError::InvalidResponse(error.to_string())
    } else {
        RemoteError::Network(error.to_string())
    }
}

fn status_error(status: StatusCode, body: &str) -> RemoteError {
    let message = parse_api_error(status, body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::Auth(message),
        StatusCode::NOT_FOUND => RemoteError::NotFound(message),
        _ => RemoteError::Server {
            status: status.as_u16(),
            message,
        },
    }
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error).or(payload.details) {
            return message.trim().to_string();
        }
    }

    let compacted = compact_text(body);
    if compacted.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        compacted
    }
}

fn normalize_base_url(raw: String) -> Result<String> {
    let base_url = non_blank(Some(raw))
        .ok_or_else(|| Error::InvalidInput("API URL must not be empty".to_string()))?;
    if has_http_scheme(&base_url) {
        Ok(base_url.trim_end_matches('/').to_string())
    } else {
        Err(Error::InvalidInput(
            "API URL must include http:// or https://".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let client =
            HttpNoteClient::new(" http://127.0.0.1:3000/api/ ", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:3000/api");

        assert!(HttpNoteClient::new("", Duration::from_secs(5)).is_err());
        assert!(HttpNoteClient::new("127.0.0.1:3000", Duration::from_secs(5)).is_err());
    }

    #[test]
    fn status_errors_are_classified() {
        assert_eq!(
            status_error(StatusCode::UNAUTHORIZED, r#"{"message":"Token expired"}"#),
            RemoteError::Auth("Token expired".to_string())
        );
        assert_eq!(
            status_error(StatusCode::NOT_FOUND, r#"{"message":"Note not found"}"#),
            RemoteError::NotFound("Note not found".to_string())
        );
        assert_eq!(
            status_error(StatusCode::BAD_GATEWAY, ""),
            RemoteError::Server {
                status: 502,
                message: "HTTP 502".to_string()
            }
        );
        assert_eq!(
            status_error(StatusCode::BAD_REQUEST, r#"{"error":"title is required"}"#),
            RemoteError::Server {
                status: 400,
                message: "title is required".to_string()
            }
        );
    }

    #[test]
    fn plain_text_error_bodies_are_kept() {
        assert_eq!(
            parse_api_error(StatusCode::INTERNAL_SERVER_ERROR, " upstream down \n"),
            "upstream down"
        );
    }

    #[test]
    fn list_accepts_paged_and_bare_shapes() {
        let paged: ListResponse = serde_json::from_str(
            r#"{"data":[{"_id":"a","title":"t","content":"c"}],
                "pagination":{"page":1,"limit":100,"total":1,"totalPages":1}}"#,
        )
        .unwrap();
        assert!(matches!(
            paged,
            ListResponse::Paged { ref data, pagination: Some(Pagination { total_pages: 1 }) }
                if data.len() == 1
        ));

        let bare: ListResponse =
            serde_json::from_str(r#"[{"id":"b","title":"t","content":"c"}]"#).unwrap();
        assert!(matches!(bare, ListResponse::Bare(ref data) if data[0].id == "b"));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        // Port 9 (discard) on localhost is closed in test environments
        let client =
            HttpNoteClient::new("http://127.0.0.1:9/api", Duration::from_secs(2)).unwrap();
        let error = client.list("token").await.unwrap_err();
        assert!(matches!(error, RemoteError::Network(_)), "{error:?}");
        assert!(error.is_transient());
    }
}
