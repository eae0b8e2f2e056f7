use std::{env, error::Error, time::Duration};

use url::Url;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub cal_api_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub api_version: String,
    pub api_base_url: Url,
    pub workflow_token: Option<String>,
    pub max_webhook_size_bytes: usize,
    pub request_timeout: Duration,
    pub dedup_ttl: Option<Duration>,
}

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_API_VERSION: &str = "2024-08-13";
const DEFAULT_API_BASE_URL: &str = "https://api.cal.com/v2";
const DEFAULT_MAX_WEBHOOK_SIZE_BYTES: usize = 1_048_576;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

impl AppConfig {
    pub fn from_env() -> Result<Self, Box<dyn Error>> {
        let bind_addr = optional_var("BIND_ADDR")?.unwrap_or_else(|| DEFAULT_BIND_ADDR.to_owned());
        let cal_api_key = optional_var("CAL_API_KEY")?;
        let webhook_secret = optional_var("CAL_WEBHOOK_SECRET")?;
        let api_version =
            optional_var("CAL_API_VERSION")?.unwrap_or_else(|| DEFAULT_API_VERSION.to_owned());
        let api_base_url = match optional_var("CAL_API_BASE_URL")? {
            Some(raw) => Url::parse(&raw)?,
            None => Url::parse(DEFAULT_API_BASE_URL)?,
        };
        let workflow_token = optional_var("WORKFLOW_TOKEN")?;
        let max_webhook_size_bytes = match optional_var("MAX_WEBHOOK_SIZE_BYTES")? {
            Some(raw) => raw.parse::<usize>()?,
            None => DEFAULT_MAX_WEBHOOK_SIZE_BYTES,
        };
        let request_timeout = match optional_var("CAL_REQUEST_TIMEOUT_MS")? {
            Some(raw) => Duration::from_millis(raw.parse::<u64>()?),
            None => Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
        };
        let dedup_ttl = match optional_var("DEDUP_TTL_SECS")? {
            Some(raw) => Some(Duration::from_secs(raw.parse::<u64>()?)),
            None => None,
        };

        Ok(Self {
            bind_addr,
            cal_api_key,
            webhook_secret,
            api_version,
            api_base_url,
            workflow_token,
            max_webhook_size_bytes,
            request_timeout,
            dedup_ttl,
        })
    }

    /// Configuration for tests and embedding: no credentials, no dedup,
    /// provider at `api_base_url`.
    pub fn for_base_url(api_base_url: Url) -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_owned(),
            cal_api_key: None,
            webhook_secret: None,
            api_version: DEFAULT_API_VERSION.to_owned(),
            api_base_url,
            workflow_token: None,
            max_webhook_size_bytes: DEFAULT_MAX_WEBHOOK_SIZE_BYTES,
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            dedup_ttl: None,
        }
    }
}

/// Reads a variable, treating unset and blank the same way.
fn optional_var(name: &str) -> Result<Option<String>, Box<dyn Error>> {
    match env::var(name) {
        Ok(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(trimmed.to_owned()))
            }
        }
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(Box::new(err)),
    }
}
