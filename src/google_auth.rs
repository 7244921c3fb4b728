//! Google service-account authentication.
//!
//! Exchanges a self-signed RS256 assertion for an OAuth access token and
//! caches the token for slightly less than its lifetime.

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::Config;
use crate::delivery::ensure_success;
use crate::errors::{AppError, ResultExt};

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Google tokens live one hour; refresh ten minutes early.
const TOKEN_CACHE_TTL: Duration = Duration::from_secs(50 * 60);

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Clone)]
pub struct ServiceAccountAuth {
    client: reqwest::Client,
    client_email: String,
    private_key: String,
    token_url: String,
    tokens: Cache<String, String>,
}

impl ServiceAccountAuth {
    pub fn new(config: &Config, client: reqwest::Client) -> Self {
        Self {
            client,
            client_email: config.google_service_email.clone(),
            private_key: config.google_private_key.clone(),
            token_url: config.google_token_url.clone(),
            tokens: Cache::builder()
                .time_to_live(TOKEN_CACHE_TTL)
                .max_capacity(1)
                .build(),
        }
    }

    /// Returns a cached access token, fetching a fresh one when needed.
    ///
    /// Concurrent callers share a single in-flight exchange.
    pub async fn access_token(&self) -> Result<String, AppError> {
        self.tokens
            .try_get_with(self.client_email.clone(), self.fetch_token())
            .await
            .map_err(|e| (*e).clone())
    }

    /// Signs the assertion sent to the token endpoint.
    pub fn signed_assertion(&self) -> Result<String, AppError> {
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes()).map_err(|e| {
            AppError::InternalError(format!("Invalid Google service account key: {}", e))
        })?;

        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: SHEETS_SCOPE,
            aud: &self.token_url,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key).map_err(|e| {
            AppError::InternalError(format!("Failed to sign Google assertion: {}", e))
        })
    }

    async fn fetch_token(&self) -> Result<String, AppError> {
        let assertion = self.signed_assertion()?;

        tracing::debug!("Requesting Google access token for {}", self.client_email);

        let response = self
            .client
            .post(&self.token_url)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .context("Google token request failed")?;

        let response = ensure_success(response, "Google token endpoint").await?;

        let token: TokenResponse = response
            .json()
            .await
            .context("Failed to parse Google token response")?;

        Ok(token.access_token)
    }
}
