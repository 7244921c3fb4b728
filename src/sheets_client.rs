use async_trait::async_trait;
use url::Url;
use serde_json::json;

use crate::config::Config;
use crate::delivery::{build_http_client, ensure_success, LeadDestination};
use crate::errors::{AppError, ResultExt};
use crate::google_auth::ServiceAccountAuth;
use crate::models::Lead;

/// Spreadsheet destination: appends one row per lead to a fixed range.
#[derive(Clone)]
pub struct SheetsClient {
    client: reqwest::Client,
    auth: ServiceAccountAuth,
    base_url: String,
    spreadsheet_id: String,
    range: String,
}

impl SheetsClient {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = build_http_client(config.http_timeout_secs)?;
        Ok(Self {
            auth: ServiceAccountAuth::new(config, client.clone()),
            client,
            base_url: config.google_sheets_api_url.clone(),
            spreadsheet_id: config.google_spreadsheet_id.clone(),
            range: config.google_sheets_range.clone(),
        })
    }

    /// `{base}/v4/spreadsheets/{id}/values/{range}:append`, with the id and
    /// range percent-encoded as path segments.
    fn append_url(&self) -> Result<Url, AppError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| AppError::InternalError(format!("Invalid Sheets API URL: {}", e)))?;

        let append = format!("{}:append", self.range);
        url.path_segments_mut()
            .map_err(|_| AppError::InternalError("Sheets API URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend([
                "v4",
                "spreadsheets",
                self.spreadsheet_id.as_str(),
                "values",
                append.as_str(),
            ]);

        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");

        Ok(url)
    }

    /// Appends `row` below the last row of the configured range.
    pub async fn append_row(&self, row: Vec<String>) -> Result<(), AppError> {
        let token = self
            .auth
            .access_token()
            .await
            .context("Google authentication failed")?;
        let url = self.append_url()?;

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&json!({ "values": [row] }))
            .send()
            .await
            .with_context(|| format!("Google Sheets append to {} failed", self.range))?;

        ensure_success(response, "Google Sheets").await?;
        Ok(())
    }
}

/// Row layout: receipt timestamp, full name, email, phone, company,
/// message, source. Missing optional values become empty cells.
pub fn sheet_row(lead: &Lead) -> Vec<String> {
    vec![
        lead.received_at_iso(),
        lead.full_name(),
        lead.email.clone(),
        lead.phone_or_empty().to_string(),
        lead.company_or_empty().to_string(),
        lead.message_or_empty().to_string(),
        lead.source.clone(),
    ]
}

#[async_trait]
impl LeadDestination for SheetsClient {
    fn id(&self) -> &'static str {
        "google_sheets"
    }

    async fn send(&self, lead: &Lead) -> Result<(), AppError> {
        self.append_row(sheet_row(lead)).await?;
        tracing::info!("Lead appended to Google Sheets: email={}", lead.email);
        Ok(())
    }
}
