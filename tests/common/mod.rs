#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use lead_relay::config::Config;
use serde_json::Value;
use url::Url;

pub const TEST_API_KEY: &str = "test-api-key";
pub const TEST_DATABASE_ID: &str = "db-123";
pub const TEST_SPREADSHEET_ID: &str = "sheet-123";
pub const TEST_RANGE: &str = "Leads!A:G";
pub const APPEND_PATH: &str = "/v4/spreadsheets/sheet-123/values/Leads!A:G:append";

pub const TEST_PRIVATE_KEY: &str = include_str!("../fixtures/test_service_account_key.pem");

/// Helper function to create test config with every destination pointed at `base_url`.
pub fn create_test_config(base_url: &str, webhook: bool) -> Config {
    Config {
        port: 8080,
        api_key: TEST_API_KEY.to_string(),
        allowed_origins: vec!["https://example.com".to_string()],
        notion_token: "secret_notion_test".to_string(),
        notion_database_id: TEST_DATABASE_ID.to_string(),
        notion_api_url: base_url.to_string(),
        google_service_email: "relay@test-project.iam.gserviceaccount.com".to_string(),
        google_private_key: TEST_PRIVATE_KEY.to_string(),
        google_spreadsheet_id: TEST_SPREADSHEET_ID.to_string(),
        google_sheets_range: TEST_RANGE.to_string(),
        google_sheets_api_url: base_url.to_string(),
        google_token_url: format!("{}/token", base_url),
        webhook_url: webhook.then(|| Url::parse(&format!("{}/hook", base_url)).unwrap()),
        http_timeout_secs: 5,
    }
}

pub fn post_lead(body: &Value, api_key: Option<&str>) -> Request<Body> {
    let body = body.to_string();
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/leads")
        .header("content-type", "application/json")
        .header("content-length", body.len());
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::from(body)).unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&bytes).expect("response body should be valid JSON")
}
