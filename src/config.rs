use std::fmt;
use url::Url;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_NOTION_API_URL: &str = "https://api.notion.com";
const DEFAULT_SHEETS_RANGE: &str = "Leads!A:G";
const DEFAULT_SHEETS_API_URL: &str = "https://sheets.googleapis.com";
const DEFAULT_GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Optional variables reported in the startup warning when unset.
const OPTIONAL_VARS: [&str; 2] = ["ZAPIER_WEBHOOK_URL", "ALLOWED_ORIGINS"];

/// Process-wide configuration, built once at startup and shared read-only.
#[derive(Clone)]
pub struct Config {
    pub port: u16,
    /// Shared secret expected in the `X-API-Key` header.
    pub api_key: String,
    pub allowed_origins: Vec<String>,
    pub notion_token: String,
    pub notion_database_id: String,
    pub notion_api_url: String,
    pub google_service_email: String,
    /// PEM-encoded RSA key, with literal `\n` sequences already unescaped.
    pub google_private_key: String,
    pub google_spreadsheet_id: String,
    pub google_sheets_range: String,
    pub google_sheets_api_url: String,
    pub google_token_url: String,
    /// Generic webhook destination. `None` disables that channel without failing requests.
    pub webhook_url: Option<Url>,
    pub http_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let mut missing = Vec::new();

        let api_key = required(&["API_KEY"], &mut missing);
        let notion_token = required(&["NOTION_TOKEN"], &mut missing);
        let notion_database_id =
            required(&["NOTION_DATABASE_ID", "NOTION_LEADS_DB"], &mut missing);
        let google_service_email = required(
            &["GOOGLE_SERVICE_ACCOUNT_EMAIL", "GOOGLE_SERVICE_EMAIL"],
            &mut missing,
        );
        let google_private_key = required(&["GOOGLE_PRIVATE_KEY"], &mut missing);
        let google_spreadsheet_id =
            required(&["GOOGLE_SPREADSHEET_ID", "GOOGLE_SHEETS_ID"], &mut missing);

        if !missing.is_empty() {
            anyhow::bail!(
                "Missing required environment variables: {}",
                missing.join(", ")
            );
        }

        let unset: Vec<&str> = OPTIONAL_VARS
            .iter()
            .copied()
            .filter(|name| optional(name).is_none())
            .collect();
        if !unset.is_empty() {
            tracing::warn!(
                "Optional environment variables not set: {} (some features may be disabled)",
                unset.join(", ")
            );
        }

        let google_private_key = unescape_private_key(&google_private_key);
        if !google_private_key.contains("BEGIN PRIVATE KEY") {
            tracing::warn!("GOOGLE_PRIVATE_KEY may be incorrectly formatted");
        }

        let config = Self {
            port: optional("PORT")
                .map(|port| port.parse::<u16>())
                .transpose()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?
                .unwrap_or(DEFAULT_PORT),
            api_key,
            allowed_origins: optional("ALLOWED_ORIGINS")
                .map(|origins| parse_origins(&origins))
                .unwrap_or_else(|| vec![DEFAULT_ALLOWED_ORIGIN.to_string()]),
            notion_token,
            notion_database_id,
            notion_api_url: http_url(
                "NOTION_API_URL",
                optional("NOTION_API_URL").unwrap_or_else(|| DEFAULT_NOTION_API_URL.into()),
            )?,
            google_service_email,
            google_private_key,
            google_spreadsheet_id,
            google_sheets_range: optional("GOOGLE_SHEETS_RANGE")
                .unwrap_or_else(|| DEFAULT_SHEETS_RANGE.to_string()),
            google_sheets_api_url: http_url(
                "GOOGLE_SHEETS_API_URL",
                optional("GOOGLE_SHEETS_API_URL").unwrap_or_else(|| DEFAULT_SHEETS_API_URL.into()),
            )?,
            google_token_url: http_url(
                "GOOGLE_TOKEN_URL",
                optional("GOOGLE_TOKEN_URL").unwrap_or_else(|| DEFAULT_GOOGLE_TOKEN_URL.into()),
            )?,
            webhook_url: optional("ZAPIER_WEBHOOK_URL")
                .map(|url| parse_webhook_url(&url))
                .transpose()?,
            http_timeout_secs: optional("HTTP_TIMEOUT_SECS")
                .map(|secs| secs.parse::<u64>())
                .transpose()
                .map_err(|_| anyhow::anyhow!("HTTP_TIMEOUT_SECS must be a positive integer"))?
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Server Port: {}", config.port);
        tracing::debug!("Allowed origins: {:?}", config.allowed_origins);
        tracing::debug!("Notion API URL: {}", config.notion_api_url);
        tracing::debug!("Google Sheets range: {}", config.google_sheets_range);
        if config.webhook_url.is_some() {
            tracing::info!("Generic webhook destination configured");
        }

        Ok(config)
    }

    /// Whether the optional generic webhook channel is active.
    pub fn webhook_configured(&self) -> bool {
        self.webhook_url.is_some()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("api_key", &"[REDACTED]")
            .field("allowed_origins", &self.allowed_origins)
            .field("notion_token", &"[REDACTED]")
            .field("notion_database_id", &self.notion_database_id)
            .field("notion_api_url", &self.notion_api_url)
            .field("google_service_email", &self.google_service_email)
            .field("google_private_key", &"[REDACTED]")
            .field("google_spreadsheet_id", &self.google_spreadsheet_id)
            .field("google_sheets_range", &self.google_sheets_range)
            .field("google_sheets_api_url", &self.google_sheets_api_url)
            .field("google_token_url", &self.google_token_url)
            .field("webhook_url", &self.webhook_url.as_ref().map(|_| "[REDACTED]"))
            .field("http_timeout_secs", &self.http_timeout_secs)
            .finish()
    }
}

/// Reads a variable, treating blank values as unset.
fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Reads the first set alias, recording the primary name as missing otherwise.
fn required(names: &[&str], missing: &mut Vec<String>) -> String {
    match names.iter().find_map(|name| optional(name)) {
        Some(value) => value,
        None => {
            missing.push(names[0].to_string());
            String::new()
        }
    }
}

fn http_url(name: &str, url: String) -> anyhow::Result<String> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    Ok(url.trim_end_matches('/').to_string())
}

fn parse_webhook_url(raw: &str) -> anyhow::Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| anyhow::anyhow!("ZAPIER_WEBHOOK_URL is not a valid URL: {}", e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => anyhow::bail!("ZAPIER_WEBHOOK_URL must use http or https, got {}", other),
    }
}

pub(crate) fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}

/// Env files usually carry the PEM key on one line with escaped newlines.
pub(crate) fn unescape_private_key(raw: &str) -> String {
    raw.replace("\\n", "\n")
}
