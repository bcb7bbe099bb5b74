use std::collections::HashMap;

use axum::http::HeaderMap;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

/// Maps opaque bearer tokens to users. Issuing tokens happens elsewhere.
#[derive(Clone)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, String>,
}

impl StaticTokenVerifier {
    pub const fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }

    pub fn verify(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        self.tokens
            .get(token)
            .map(|user_id| AuthenticatedUser {
                user_id: user_id.clone(),
            })
            .ok_or_else(|| AppError::unauthorized("Invalid or expired token"))
    }
}

pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get("authorization")
        .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?
        .to_str()
        .map_err(|_| AppError::unauthorized("Authorization header is not valid UTF-8"))?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or_else(|| AppError::unauthorized("Authorization header must be `Bearer <token>`"))?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AppError::unauthorized(
            "Authorization scheme must be `Bearer`",
        ));
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::unauthorized("Bearer token is empty"));
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers_with(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn bearer_token_is_extracted_case_insensitively() {
        assert_eq!(
            extract_bearer_token(&headers_with("bearer abc123")).unwrap(),
            "abc123"
        );
        assert_eq!(
            extract_bearer_token(&headers_with("Bearer  abc123 ")).unwrap(),
            "abc123"
        );
    }

    #[test]
    fn malformed_authorization_headers_are_rejected() {
        assert!(extract_bearer_token(&HeaderMap::new()).is_err());
        assert!(extract_bearer_token(&headers_with("Basic abc")).is_err());
        assert!(extract_bearer_token(&headers_with("Bearer")).is_err());
        assert!(extract_bearer_token(&headers_with("Bearer   ")).is_err());
    }

    #[test]
    fn verifier_maps_known_tokens_to_users() {
        let verifier = StaticTokenVerifier::new(HashMap::from([(
            "t-1".to_string(),
            "alice".to_string(),
        )]));

        assert_eq!(verifier.verify("t-1").unwrap().user_id, "alice");
        assert!(matches!(
            verifier.verify("t-2"),
            Err(AppError::Unauthorized(_))
        ));
    }
}
