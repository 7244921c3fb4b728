use async_trait::async_trait;
use url::Url;

use crate::config::Config;
use crate::delivery::{build_http_client, ensure_success, LeadDestination};
use crate::errors::{AppError, ResultExt};
use crate::models::Lead;

/// Generic webhook destination (e.g. a Zapier catch hook).
///
/// Optional: without a URL every delivery is a no-op success.
#[derive(Clone)]
pub struct WebhookClient {
    client: reqwest::Client,
    url: Option<Url>,
}

impl WebhookClient {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        Ok(Self {
            client: build_http_client(config.http_timeout_secs)?,
            url: config.webhook_url.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }
}

#[async_trait]
impl LeadDestination for WebhookClient {
    fn id(&self) -> &'static str {
        "webhook"
    }

    async fn send(&self, lead: &Lead) -> Result<(), AppError> {
        let Some(url) = &self.url else {
            tracing::debug!("Webhook URL not configured, skipping forward");
            return Ok(());
        };

        let response = self
            .client
            .post(url.clone())
            .json(lead)
            .send()
            .await
            .context("Webhook request failed")?;

        ensure_success(response, "Webhook").await?;
        tracing::info!("Lead sent to webhook: email={}", lead.email);
        Ok(())
    }
}
