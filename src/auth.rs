use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::errors::AppError;
use crate::handlers::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Requires the shared secret in the `X-API-Key` header.
///
/// Missing header → 401, wrong key → 403.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    validate_api_key(&state.config.api_key, req.headers())?;
    Ok(next.run(req).await)
}

fn validate_api_key(expected: &str, headers: &HeaderMap) -> Result<(), AppError> {
    let provided = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("API key required".to_string()))?;

    if !constant_time_compare(provided, expected) {
        return Err(AppError::Forbidden("Invalid API key".to_string()));
    }

    Ok(())
}

/// Constant-time string comparison
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes()
        .iter()
        .zip(b.as_bytes().iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("secret", "secret"));
        assert!(!constant_time_compare("secret", "secreT"));
        assert!(!constant_time_compare("secret", "secret2"));
        assert!(!constant_time_compare("", "secret"));
    }

    #[test]
    fn test_missing_header_is_unauthorized() {
        let err = validate_api_key("secret", &HeaderMap::new()).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_wrong_key_is_forbidden() {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_static("nope"));
        let err = validate_api_key("secret", &headers).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_matching_key_passes() {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_static("secret"));
        assert!(validate_api_key("secret", &headers).is_ok());
    }
}
