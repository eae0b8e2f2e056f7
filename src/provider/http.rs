use async_trait::async_trait;
use reqwest::{header, StatusCode};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::{
    config::AppConfig,
    domain::CreateBooking,
    provider::{unwrap_booking, BookingApi, ProviderError},
};

pub const API_VERSION_HEADER: &str = "cal-api-version";

/// `BookingApi` over the provider's REST API.
#[derive(Debug, Clone)]
pub struct HttpBookingApi {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
    api_version: String,
}

impl HttpBookingApi {
    pub fn new(
        client: reqwest::Client,
        base_url: Url,
        api_key: String,
        api_version: String,
    ) -> Self {
        Self {
            client,
            base_url,
            api_key,
            api_version,
        }
    }

    /// Builds a client from configuration; `None` when no API key is set.
    pub fn from_config(config: &AppConfig) -> Result<Option<Self>, ProviderError> {
        let Some(api_key) = config.cal_api_key.clone() else {
            return Ok(None);
        };
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Some(Self::new(
            client,
            config.api_base_url.clone(),
            api_key,
            config.api_version.clone(),
        )))
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ProviderError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.api_key)
            .header(API_VERSION_HEADER, &self.api_version)
            .header(header::ACCEPT, "application/json")
    }
}

#[async_trait]
impl BookingApi for HttpBookingApi {
    async fn create_booking(&self, booking: &CreateBooking) -> Result<Value, ProviderError> {
        let url = self.endpoint(&["bookings"])?;
        let response = self
            .request(reqwest::Method::POST, url)
            .json(booking)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(ProviderError::rejected(
                status.as_u16(),
                String::from_utf8_lossy(&body).into_owned(),
            ));
        }

        // A 2xx means the booking exists even if the body is unreadable.
        let created = serde_json::from_slice(&body).unwrap_or(Value::Null);
        Ok(unwrap_booking(created))
    }

    async fn fetch_booking(&self, uid: &str) -> Result<Option<Value>, ProviderError> {
        let url = self.endpoint(&["bookings", uid])?;
        let response = self.request(reqwest::Method::GET, url).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(uid = %uid, "provider has no booking with this uid");
            return Ok(None);
        }
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(ProviderError::rejected(
                status.as_u16(),
                String::from_utf8_lossy(&body).into_owned(),
            ));
        }

        let detail: Value =
            serde_json::from_slice(&body).map_err(|err| ProviderError::Decode(err.to_string()))?;
        Ok(Some(unwrap_booking(detail)))
    }
}
