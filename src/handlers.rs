use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::errors::AppError;
use crate::models::{AggregateResult, LeadResponse};
use crate::validation::validate_lead;

/// Shared application state injected into handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Registered lead destinations.
    pub dispatcher: Dispatcher,
    /// Process start, for uptime reporting.
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config, dispatcher: Dispatcher) -> Self {
        Self {
            config,
            dispatcher,
            started_at: Instant::now(),
        }
    }
}

/// POST /api/leads (also POST /webhook/lead)
///
/// Validates the submission and fans it out to every destination.
///
/// Responds 400 with every field violation when validation fails, in which
/// case nothing is delivered. Once dispatched the response is always 200,
/// with one success flag per destination, even if all of them failed.
pub async fn submit_lead(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<LeadResponse>), AppError> {
    let received_at = Utc::now();

    let Json(payload) = payload.map_err(|e| {
        tracing::warn!("Rejected lead body: {}", e);
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge
        } else {
            AppError::BadRequest("Invalid JSON body".to_string())
        }
    })?;

    let lead = validate_lead(&payload, received_at)?;
    tracing::info!(
        "Lead accepted: email={}, source={}",
        lead.email,
        lead.source
    );

    let results = state.dispatcher.dispatch(lead).await;
    Ok(lead_response(results))
}

/// Builds the success response for a completed dispatch.
///
/// Partial and total delivery failure are still reported as success; the
/// per-destination flags tell the caller which destinations missed the lead.
pub fn lead_response(results: AggregateResult) -> (StatusCode, Json<LeadResponse>) {
    (
        StatusCode::OK,
        Json(LeadResponse {
            success: true,
            message: "Lead received".to_string(),
            results,
        }),
    )
}

/// GET /
pub async fn root() -> Json<Value> {
    Json(json!({ "status": "Lead relay is running" }))
}

/// Health check endpoint.
///
/// Returns the service status, version, and uptime.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "uptime_secs": state.started_at.elapsed().as_secs(),
            "timestamp": Utc::now().to_rfc3339(),
        })),
    )
}

/// GET /health/live
pub async fn liveness() -> Json<Value> {
    Json(json!({
        "alive": true,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// GET /health/ready
///
/// Ready when the required destinations have their credentials. The
/// optional webhook is reported but never blocks readiness.
pub async fn readiness(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let config = &state.config;
    let notion = !config.notion_token.is_empty() && !config.notion_database_id.is_empty();
    let google_sheets = !config.google_service_email.is_empty()
        && !config.google_private_key.is_empty()
        && !config.google_spreadsheet_id.is_empty();
    let ready = notion && google_sheets;

    let status = if ready {
        StatusCode::OK
    } else {
        tracing::warn!(
            "Readiness check failed: notion={}, google_sheets={}",
            notion,
            google_sheets
        );
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "ready": ready,
            "checks": {
                "notion": notion,
                "google_sheets": google_sheets,
                "webhook": config.webhook_configured(),
                "timestamp": Utc::now().to_rfc3339(),
            }
        })),
    )
}

/// Fallback for unknown routes.
pub async fn not_found() -> AppError {
    AppError::NotFound("Not found".to_string())
}
