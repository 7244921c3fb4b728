use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::Config;
use crate::delivery::{build_http_client, ensure_success, LeadDestination};
use crate::errors::{AppError, ResultExt};
use crate::models::{Lead, NEW_LEAD_STATUS};

const NOTION_VERSION: &str = "2022-06-28";

/// Structured-store destination: creates one Notion database page per lead.
#[derive(Clone)]
pub struct NotionClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
    database_id: String,
}

impl NotionClient {
    /// Creates a new `NotionClient` from the startup configuration.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        Ok(Self {
            client: build_http_client(config.http_timeout_secs)?,
            base_url: config.notion_api_url.clone(),
            token: config.notion_token.clone(),
            database_id: config.notion_database_id.clone(),
        })
    }

    /// Creates a page for `lead` in the configured database.
    ///
    /// # Returns
    ///
    /// * `Result<String, AppError>` - The id of the created page.
    pub async fn create_page(&self, lead: &Lead) -> Result<String, AppError> {
        let url = format!("{}/v1/pages", self.base_url);

        let body = json!({
            "parent": { "database_id": self.database_id },
            "properties": page_properties(lead),
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Notion request failed for database {}", self.database_id))?;

        let response = ensure_success(response, "Notion").await?;

        let page: Value = response
            .json()
            .await
            .context("Failed to parse Notion response")?;

        page.get("id")
            .and_then(|id| id.as_str())
            .map(String::from)
            .ok_or_else(|| {
                AppError::ExternalApiError("Notion response missing 'id' field".to_string())
            })
    }
}

/// Maps a lead onto the leads database properties.
///
/// `Status` is always `New`; an empty phone is sent as `null` because
/// Notion rejects empty phone numbers.
pub fn page_properties(lead: &Lead) -> Value {
    let phone = lead.phone.as_deref().filter(|p| !p.is_empty());

    json!({
        "Name": { "title": [{ "text": { "content": lead.full_name() } }] },
        "Email": { "email": lead.email },
        "Phone": { "phone_number": phone },
        "Company": { "rich_text": [{ "text": { "content": lead.company_or_empty() } }] },
        "Source": { "select": { "name": lead.source } },
        "Status": { "select": { "name": NEW_LEAD_STATUS } },
    })
}

#[async_trait]
impl LeadDestination for NotionClient {
    fn id(&self) -> &'static str {
        "notion"
    }

    async fn send(&self, lead: &Lead) -> Result<(), AppError> {
        let page_id = self.create_page(lead).await?;
        tracing::info!("Lead created in Notion: page_id={}", page_id);
        Ok(())
    }
}
