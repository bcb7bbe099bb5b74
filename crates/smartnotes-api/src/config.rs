use std::collections::HashMap;
use std::env;
use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    /// Bearer token -> user id
    pub tokens: HashMap<String, String>,
    pub summary_word_limit: usize,
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut users = self.tokens.values().collect::<Vec<_>>();
        users.sort();
        users.dedup();
        formatter
            .debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("tokens", &format!("[REDACTED; {} token(s)]", self.tokens.len()))
            .field("users", &users)
            .field("summary_word_limit", &self.summary_word_limit)
            .field("default_page_size", &self.default_page_size)
            .field("max_page_size", &self.max_page_size)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "SMARTNOTES_API_BIND_ADDR", "127.0.0.1:3000");

        let tokens = parse_token_list(&required_trimmed(&lookup, "SMARTNOTES_API_TOKENS")?)?;

        let summary_word_limit = value_or_default(&lookup, "SMARTNOTES_SUMMARY_WORDS", "15")
            .parse::<usize>()
            .map_err(|_| {
                ConfigError::Invalid(
                    "SMARTNOTES_SUMMARY_WORDS must be an integer in [1, 200]".to_string(),
                )
            })?;
        if !(1..=200).contains(&summary_word_limit) {
            return Err(ConfigError::Invalid(
                "SMARTNOTES_SUMMARY_WORDS must be in [1, 200]".to_string(),
            ));
        }

        let max_page_size = value_or_default(&lookup, "SMARTNOTES_API_MAX_PAGE_SIZE", "100")
            .parse::<usize>()
            .map_err(|_| {
                ConfigError::Invalid(
                    "SMARTNOTES_API_MAX_PAGE_SIZE must be an integer in [1, 1000]".to_string(),
                )
            })?;
        if !(1..=1_000).contains(&max_page_size) {
            return Err(ConfigError::Invalid(
                "SMARTNOTES_API_MAX_PAGE_SIZE must be in [1, 1000]".to_string(),
            ));
        }

        Ok(Self {
            bind_addr,
            tokens,
            summary_word_limit,
            default_page_size: max_page_size.min(20),
            max_page_size,
        })
    }
}

/// Parse `token=user,token=user`; a token may appear only once.
pub fn parse_token_list(raw: &str) -> Result<HashMap<String, String>, ConfigError> {
    let mut tokens = HashMap::new();
    for pair in raw.split(',').map(str::trim).filter(|pair| !pair.is_empty()) {
        let (token, user) = pair.split_once('=').ok_or_else(|| {
            ConfigError::Invalid("SMARTNOTES_API_TOKENS entries must be `token=user`".to_string())
        })?;
        let (token, user) = (token.trim(), user.trim());
        if token.is_empty() || user.is_empty() {
            return Err(ConfigError::Invalid(
                "SMARTNOTES_API_TOKENS entries need both a token and a user".to_string(),
            ));
        }
        if tokens.insert(token.to_string(), user.to_string()).is_some() {
            return Err(ConfigError::Invalid(
                "SMARTNOTES_API_TOKENS lists the same token twice".to_string(),
            ));
        }
    }

    if tokens.is_empty() {
        return Err(ConfigError::MissingVar("SMARTNOTES_API_TOKENS"));
    }
    Ok(tokens)
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn required_trimmed(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    optional_trimmed(lookup, name).ok_or(ConfigError::MissingVar(name))
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
