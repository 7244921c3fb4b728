use async_trait::async_trait;
use std::time::Duration;

use crate::errors::AppError;
use crate::models::{DeliveryOutcome, Lead};

/// A destination that accepts validated leads.
///
/// Implementors only provide [`send`](LeadDestination::send); the provided
/// [`deliver`](LeadDestination::deliver) turns every `Err` into a failed
/// outcome, so a destination outage never escapes its adapter.
#[async_trait]
pub trait LeadDestination: Send + Sync {
    /// Stable identifier used as the key in the aggregate response.
    fn id(&self) -> &'static str;

    /// Performs the destination call for one lead.
    async fn send(&self, lead: &Lead) -> Result<(), AppError>;

    async fn deliver(&self, lead: &Lead) -> DeliveryOutcome {
        match self.send(lead).await {
            Ok(()) => DeliveryOutcome::delivered(self.id()),
            Err(e) => {
                tracing::error!(
                    "Failed to deliver lead to {} (email={}): {}",
                    self.id(),
                    lead.email,
                    e
                );
                DeliveryOutcome::failed(self.id(), e.to_string())
            }
        }
    }
}

/// Builds the HTTP client each adapter owns. The timeout bounds every call.
pub fn build_http_client(timeout_secs: u64) -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AppError::InternalError(format!("Failed to create HTTP client: {}", e)))
}

/// Turns a non-2xx response into an error carrying the status and body.
pub async fn ensure_success(
    response: reqwest::Response,
    destination: &str,
) -> Result<reqwest::Response, AppError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(AppError::ExternalApiError(format!(
        "{} returned {}: {}",
        destination, status, error_text
    )))
}
