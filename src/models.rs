use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Source tag applied when the caller does not send one.
pub const DEFAULT_SOURCE: &str = "website";

/// Status given to every lead created in the structured store.
pub const NEW_LEAD_STATUS: &str = "New";

/// A validated, normalized lead.
///
/// Serializes to the same shape the caller submitted (with `source`
/// defaulted), which is what the generic webhook receives.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lead {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub source: String,
    /// When the relay accepted the submission. Not forwarded.
    #[serde(skip)]
    pub received_at: DateTime<Utc>,
}

impl Lead {
    /// "first last", used as the display name by every destination.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn phone_or_empty(&self) -> &str {
        self.phone.as_deref().unwrap_or("")
    }

    pub fn company_or_empty(&self) -> &str {
        self.company.as_deref().unwrap_or("")
    }

    pub fn message_or_empty(&self) -> &str {
        self.message.as_deref().unwrap_or("")
    }

    /// Receipt time as ISO-8601 UTC with millisecond precision.
    pub fn received_at_iso(&self) -> String {
        self.received_at
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// Result of delivering one lead to one destination.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryOutcome {
    pub destination: &'static str,
    pub success: bool,
    pub error: Option<String>,
}

impl DeliveryOutcome {
    pub fn delivered(destination: &'static str) -> Self {
        Self {
            destination,
            success: true,
            error: None,
        }
    }

    pub fn failed(destination: &'static str, error: impl Into<String>) -> Self {
        Self {
            destination,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Per-destination success flags for one submission, in registration order.
///
/// Holds exactly one entry per registered destination. Serializes as a JSON
/// object keyed by destination id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateResult {
    outcomes: Vec<DeliveryOutcome>,
}

impl AggregateResult {
    pub fn new(outcomes: Vec<DeliveryOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn outcomes(&self) -> &[DeliveryOutcome] {
        &self.outcomes
    }

    /// Success flag for `destination`, or `None` if it was not registered.
    pub fn get(&self, destination: &str) -> Option<bool> {
        self.outcomes
            .iter()
            .find(|o| o.destination == destination)
            .map(|o| o.success)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.success).count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed_count() == 0
    }

    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.failed_count() == self.outcomes.len()
    }

    /// Ids of the destinations that did not accept the lead.
    pub fn failed_destinations(&self) -> Vec<&'static str> {
        self.outcomes
            .iter()
            .filter(|o| !o.success)
            .map(|o| o.destination)
            .collect()
    }
}

impl Serialize for AggregateResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.outcomes.len()))?;
        for outcome in &self.outcomes {
            map.serialize_entry(outcome.destination, &outcome.success)?;
        }
        map.end()
    }
}

/// Body returned once a lead has been dispatched.
#[derive(Debug, Serialize)]
pub struct LeadResponse {
    pub success: bool,
    pub message: String,
    pub results: AggregateResult,
}
