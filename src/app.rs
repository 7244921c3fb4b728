//! Router assembly and middleware stack.

use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, Method, Response, StatusCode},
    middleware,
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::any::Any;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::auth::{self, API_KEY_HEADER};
use crate::handlers::{self, AppState};

/// Lead bodies are small form submissions.
pub const MAX_BODY_BYTES: usize = 10 * 1024;

/// One request replenished every 9s with a burst of 100: about 100 requests
/// per 15 minutes per client IP.
const RATE_LIMIT_REPLENISH_SECS: u64 = 9;
const RATE_LIMIT_BURST: u32 = 100;

/// Builds the application without rate limiting.
pub fn build_router(state: Arc<AppState>) -> Router {
    assemble(state.clone(), intake_routes(state))
}

/// Builds the application with per-IP rate limiting on the intake routes.
///
/// Needs a server started with connect info so the client IP can be
/// resolved when no forwarding header is present.
pub fn build_rate_limited_router(state: Arc<AppState>) -> anyhow::Result<Router> {
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(RATE_LIMIT_REPLENISH_SECS)
            .burst_size(RATE_LIMIT_BURST)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    let intake = intake_routes(state.clone()).layer(GovernorLayer {
        config: governor_conf,
    });

    Ok(assemble(state, intake))
}

fn intake_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/leads", post(handlers::submit_lead))
        .route("/webhook/lead", post(handlers::submit_lead))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn_with_state(
                    state,
                    auth::require_api_key,
                ))
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)),
        )
}

fn assemble(state: Arc<AppState>, intake: Router<Arc<AppState>>) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/health/live", get(handlers::liveness))
        .route("/health/ready", get(handlers::readiness))
        .merge(intake)
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::STRICT_TRANSPORT_SECURITY,
                    HeaderValue::from_static("max-age=31536000; includeSubDomains; preload"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::REFERRER_POLICY,
                    HeaderValue::from_static("no-referrer"),
                ))
                .layer(CatchPanicLayer::custom(handle_panic)),
        )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter(|origin| {
            if origin.as_str() == "*" {
                tracing::warn!("Ignoring wildcard CORS origin: credentials are allowed");
                return false;
            }
            true
        })
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(API_KEY_HEADER)])
        .allow_credentials(true)
}

/// Last-resort boundary: a panic anywhere in the pipeline becomes a generic 500.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!("Request handler panicked: {}", detail);

    let body = json!({
        "success": false,
        "error": "Internal server error",
    });

    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}
