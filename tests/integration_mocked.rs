/// Integration tests with mocked destinations
/// Exercises each adapter and the dispatcher against wiremock without hitting Notion, Google or Zapier
mod common;

use chrono::Utc;
use common::*;
use lead_relay::delivery::LeadDestination;
use lead_relay::dispatcher::Dispatcher;
use lead_relay::integrations::notion_client::NotionClient;
use lead_relay::integrations::sheets_client::SheetsClient;
use lead_relay::integrations::webhook_client::WebhookClient;
use lead_relay::models::Lead;
use lead_relay::validation::validate_lead;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ann_lee() -> Lead {
    validate_lead(
        &json!({"first_name": "Ann", "last_name": "Lee", "email": "ann@x.com"}),
        Utc::now(),
    )
    .unwrap()
}

async fn mount_notion_ok(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/pages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "page-1"})))
        .mount(server)
        .await;
}

async fn mount_google_ok(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.test-token",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(APPEND_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"updates": {"updatedRows": 1}})))
        .mount(server)
        .await;
}

async fn mount_webhook_ok(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .mount(server)
        .await;
}

async fn requests_to(server: &MockServer, request_path: &str) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == request_path)
        .collect()
}

#[tokio::test]
async fn test_notion_creates_page_with_status_new() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/pages"))
        .and(header("authorization", "Bearer secret_notion_test"))
        .and(header("notion-version", "2022-06-28"))
        .and(body_partial_json(json!({
            "parent": {"database_id": TEST_DATABASE_ID},
            "properties": {
                "Email": {"email": "ann@x.com"},
                "Source": {"select": {"name": "website"}},
                "Status": {"select": {"name": "New"}}
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "page-1"})))
        .expect(2)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), false);
    let notion = NotionClient::new(&config).unwrap();

    let page_id = notion.create_page(&ann_lee()).await.unwrap();
    assert_eq!(page_id, "page-1");

    let outcome = notion.deliver(&ann_lee()).await;
    assert!(outcome.success);
    assert_eq!(outcome.destination, "notion");
}

#[tokio::test]
async fn test_notion_api_error_becomes_failed_outcome() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/pages"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "object": "error",
            "code": "unauthorized"
        })))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), false);
    let notion = NotionClient::new(&config).unwrap();

    let outcome = notion.deliver(&ann_lee()).await;
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("401"));
}

#[tokio::test]
async fn test_notion_response_without_id_is_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/pages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"object": "page"})))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), false);
    let notion = NotionClient::new(&config).unwrap();

    assert!(notion.create_page(&ann_lee()).await.is_err());
}

#[tokio::test]
async fn test_sheets_appends_single_row_in_column_order() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains(
            "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.test-token",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(APPEND_PATH))
        .and(query_param("valueInputOption", "RAW"))
        .and(header("authorization", "Bearer ya29.test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), false);
    let sheets = SheetsClient::new(&config).unwrap();
    let lead = ann_lee();

    let outcome = sheets.deliver(&lead).await;
    assert!(outcome.success, "unexpected failure: {:?}", outcome.error);

    let appends = requests_to(&mock_server, APPEND_PATH).await;
    assert_eq!(appends.len(), 1);
    let body: Value = appends[0].body_json().unwrap();
    assert_eq!(
        body,
        json!({
            "values": [[
                lead.received_at_iso(),
                "Ann Lee",
                "ann@x.com",
                "",
                "",
                "",
                "website"
            ]]
        })
    );
}

#[tokio::test]
async fn test_sheets_reuses_cached_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.cached",
            "expires_in": 3599
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(APPEND_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(3)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), false);
    let sheets = SheetsClient::new(&config).unwrap();

    for _ in 0..3 {
        assert!(sheets.deliver(&ann_lee()).await.success);
    }
}

#[tokio::test]
async fn test_sheets_token_failure_becomes_failed_outcome() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(APPEND_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), false);
    let sheets = SheetsClient::new(&config).unwrap();

    let outcome = sheets.deliver(&ann_lee()).await;
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("Google authentication failed"));
}

#[tokio::test]
async fn test_sheets_invalid_private_key_becomes_failed_outcome() {
    let mock_server = MockServer::start().await;

    let mut config = create_test_config(&mock_server.uri(), false);
    config.google_private_key = "not a pem key".to_string();
    let sheets = SheetsClient::new(&config).unwrap();

    let outcome = sheets.deliver(&ann_lee()).await;
    assert!(!outcome.success);
    assert!(requests_to(&mock_server, "/token").await.is_empty());
}

#[tokio::test]
async fn test_webhook_forwards_normalized_lead() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_partial_json(json!({
            "first_name": "Ann",
            "last_name": "Lee",
            "email": "ann@x.com",
            "source": "website"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), true);
    let webhook = WebhookClient::new(&config).unwrap();
    assert!(webhook.is_configured());

    assert!(webhook.deliver(&ann_lee()).await.success);
}

#[tokio::test]
async fn test_webhook_unconfigured_is_noop_success() {
    let mock_server = MockServer::start().await;

    let config = create_test_config(&mock_server.uri(), false);
    let webhook = WebhookClient::new(&config).unwrap();
    assert!(!webhook.is_configured());

    let outcome = webhook.deliver(&ann_lee()).await;
    assert!(outcome.success);
    assert!(outcome.error.is_none());
    assert!(mock_server
        .received_requests()
        .await
        .unwrap_or_default()
        .is_empty());
}

#[tokio::test]
async fn test_webhook_server_error_becomes_failed_outcome() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), true);
    let webhook = WebhookClient::new(&config).unwrap();

    let outcome = webhook.deliver(&ann_lee()).await;
    assert!(!outcome.success);
    assert_eq!(outcome.destination, "webhook");
}

#[tokio::test]
async fn test_dispatcher_from_config_delivers_everywhere() {
    let mock_server = MockServer::start().await;
    mount_notion_ok(&mock_server).await;
    mount_google_ok(&mock_server).await;
    mount_webhook_ok(&mock_server).await;

    let config = create_test_config(&mock_server.uri(), true);
    let dispatcher = Dispatcher::from_config(&config).unwrap();
    assert_eq!(
        dispatcher.destination_ids(),
        vec!["notion", "google_sheets", "webhook"]
    );

    let results = dispatcher.dispatch(ann_lee()).await;
    assert!(results.all_succeeded());
    assert_eq!(requests_to(&mock_server, "/v1/pages").await.len(), 1);
    assert_eq!(requests_to(&mock_server, APPEND_PATH).await.len(), 1);
    assert_eq!(requests_to(&mock_server, "/hook").await.len(), 1);
}

#[tokio::test]
async fn test_dispatcher_isolates_unreachable_destination() {
    let mock_server = MockServer::start().await;
    mount_notion_ok(&mock_server).await;
    mount_webhook_ok(&mock_server).await;

    // Sheets points at a closed port.
    let mut config = create_test_config(&mock_server.uri(), true);
    config.google_token_url = "http://127.0.0.1:9/token".to_string();

    let results = Dispatcher::from_config(&config)
        .unwrap()
        .dispatch(ann_lee())
        .await;

    assert_eq!(results.get("notion"), Some(true));
    assert_eq!(results.get("google_sheets"), Some(false));
    assert_eq!(results.get("webhook"), Some(true));
}

#[tokio::test]
async fn test_dispatcher_unconfigured_webhook_succeeds_when_others_fail() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), false);
    let results = Dispatcher::from_config(&config)
        .unwrap()
        .dispatch(ann_lee())
        .await;

    assert_eq!(results.get("notion"), Some(false));
    assert_eq!(results.get("google_sheets"), Some(false));
    assert_eq!(results.get("webhook"), Some(true));
}

#[tokio::test]
async fn test_concurrent_dispatches() {
    let mock_server = MockServer::start().await;
    mount_notion_ok(&mock_server).await;
    mount_google_ok(&mock_server).await;
    mount_webhook_ok(&mock_server).await;

    let config = create_test_config(&mock_server.uri(), true);
    let dispatcher = Dispatcher::from_config(&config).unwrap();

    // Fire 10 concurrent submissions
    let mut handles = vec![];
    for _ in 0..10 {
        let dispatcher = dispatcher.clone();
        handles.push(tokio::spawn(
            async move { dispatcher.dispatch(ann_lee()).await },
        ));
    }

    for handle in handles {
        let results = handle.await.unwrap();
        assert!(results.all_succeeded());
    }
    assert_eq!(requests_to(&mock_server, "/hook").await.len(), 10);
}
