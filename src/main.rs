use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lead_relay::api::app::build_rate_limited_router;
use lead_relay::api::handlers::AppState;
use lead_relay::config::Config;
use lead_relay::core::dispatcher::Dispatcher;

/// Main entry point for the application.
///
/// Initializes tracing, loads configuration, builds the delivery
/// destinations once, and starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lead_relay=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    let dispatcher = Dispatcher::from_config(&config)?;
    tracing::info!(
        "Lead destinations registered: {:?}",
        dispatcher.destination_ids()
    );
    if !config.webhook_configured() {
        tracing::warn!("ZAPIER_WEBHOOK_URL not set: webhook forwarding disabled");
    }

    let port = config.port;
    let app_state = Arc::new(AppState::new(config, dispatcher));

    let app = build_rate_limited_router(app_state)?;

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
