//! Small helpers shared by config, the REST client and the sync engine

/// Trimmed text, or `None` when absent or blank.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
        .map(str::to_string)
}

pub fn has_http_scheme(url: &str) -> bool {
    ["http://", "https://"]
        .iter()
        .any(|scheme| url.starts_with(scheme))
}

/// Response bodies quoted in errors are cut to this many characters
const ERROR_BODY_CHARS: usize = 180;

pub fn compact_text(body: &str) -> String {
    body.trim().chars().take(ERROR_BODY_CHARS).collect()
}

/// Wall clock in Unix milliseconds, the unit of every stored timestamp
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
