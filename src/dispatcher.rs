//! Fan-out of one validated lead to every registered destination.

use futures::future::join_all;
use std::sync::Arc;

use crate::config::Config;
use crate::delivery::LeadDestination;
use crate::errors::AppError;
use crate::models::{AggregateResult, DeliveryOutcome, Lead};
use crate::notion_client::NotionClient;
use crate::sheets_client::SheetsClient;
use crate::webhook_client::WebhookClient;

/// Delivers leads to all registered destinations concurrently.
///
/// Every destination runs in its own task and is awaited to completion; a
/// slow or failing destination never blocks or hides the others. Dispatch
/// itself cannot fail, it only reports which destinations did.
#[derive(Clone, Default)]
pub struct Dispatcher {
    destinations: Vec<Arc<dyn LeadDestination>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the Notion, Google Sheets and generic webhook destinations,
    /// in that order.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Ok(Self::new()
            .register(Arc::new(NotionClient::new(config)?))
            .register(Arc::new(SheetsClient::new(config)?))
            .register(Arc::new(WebhookClient::new(config)?)))
    }

    /// Adds a destination. Results are reported in registration order.
    pub fn register(mut self, destination: Arc<dyn LeadDestination>) -> Self {
        self.destinations.push(destination);
        self
    }

    pub fn destination_ids(&self) -> Vec<&'static str> {
        self.destinations.iter().map(|d| d.id()).collect()
    }

    /// Sends `lead` to every destination and waits for all of them to settle.
    ///
    /// Tasks are detached from the caller: dropping the returned future does
    /// not cancel deliveries already in flight. A panic inside a destination
    /// is re-raised here.
    pub async fn dispatch(&self, lead: Lead) -> AggregateResult {
        let lead = Arc::new(lead);

        let handles = self.destinations.iter().map(|destination| {
            let destination = Arc::clone(destination);
            let lead = Arc::clone(&lead);
            tokio::spawn(async move { destination.deliver(&lead).await })
        });

        let settled = join_all(handles).await;

        let outcomes: Vec<DeliveryOutcome> = self
            .destinations
            .iter()
            .zip(settled)
            .map(|(destination, joined)| match joined {
                Ok(outcome) => outcome,
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(e) => DeliveryOutcome::failed(
                    destination.id(),
                    format!("delivery task cancelled: {}", e),
                ),
            })
            .collect();

        let results = AggregateResult::new(outcomes);
        log_summary(&lead, &results);
        results
    }
}

fn log_summary(lead: &Lead, results: &AggregateResult) {
    if results.all_succeeded() {
        tracing::info!(
            "Lead delivered to all {} destination(s): email={}",
            results.len(),
            lead.email
        );
    } else if results.all_failed() {
        tracing::error!(
            "Lead delivery failed for every destination: email={}",
            lead.email
        );
    } else {
        tracing::warn!(
            "Partial lead delivery: email={}, failed={:?}",
            lead.email,
            results.failed_destinations()
        );
    }
}
