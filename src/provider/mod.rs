use async_trait::async_trait;
use serde_json::Value;

use crate::domain::CreateBooking;

pub mod http;
#[cfg(test)]
pub mod memory;

/// Largest slice of a provider error body surfaced to callers.
const MAX_ERROR_BODY_BYTES: usize = 2048;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider returned HTTP {status}")]
    Status { status: u16, body: String },
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider response could not be decoded: {0}")]
    Decode(String),
    #[error("invalid provider url: {0}")]
    InvalidUrl(String),
}

impl ProviderError {
    pub fn rejected(status: u16, body: String) -> Self {
        Self::Status {
            status,
            body: truncate_body(body),
        }
    }

    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(err) => err.status().map(|status| status.as_u16()),
            Self::Decode(_) | Self::InvalidUrl(_) => None,
        }
    }

    /// Diagnostic text for the caller: the provider's body when it sent one.
    pub fn details(&self) -> String {
        match self {
            Self::Status { body, .. } => body.clone(),
            other => other.to_string(),
        }
    }
}

/// The provider's booking API.
#[async_trait]
pub trait BookingApi: Send + Sync {
    /// Creates one booking and returns the provider's record of it.
    async fn create_booking(&self, booking: &CreateBooking) -> Result<Value, ProviderError>;

    /// Full booking detail, or `None` when the provider does not know `uid`.
    async fn fetch_booking(&self, uid: &str) -> Result<Option<Value>, ProviderError>;
}

/// Strips `data` and `booking` wrappers, in that order, where present.
pub fn unwrap_booking(mut value: Value) -> Value {
    for wrapper in ["data", "booking"] {
        if value.get(wrapper).is_some_and(Value::is_object) {
            value = value[wrapper].take();
        }
    }
    value
}

fn truncate_body(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY_BYTES {
        let mut cut = MAX_ERROR_BODY_BYTES;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn unwrap_booking_strips_known_wrappers() {
        let wrapped = json!({ "status": "success", "data": { "booking": { "uid": "x" } } });
        let data_only = json!({ "data": { "uid": "y" } });
        let bare = json!({ "uid": "z" });

        assert_eq!(unwrap_booking(wrapped), json!({ "uid": "x" }));
        assert_eq!(unwrap_booking(data_only), json!({ "uid": "y" }));
        assert_eq!(unwrap_booking(bare), json!({ "uid": "z" }));
    }

    #[test]
    fn unwrap_booking_leaves_non_object_data_alone() {
        let listed = json!({ "data": [{ "uid": "a" }] });

        assert_eq!(unwrap_booking(listed.clone()), listed);
    }

    #[test]
    fn long_error_bodies_are_truncated_on_char_boundary() {
        let body = "é".repeat(MAX_ERROR_BODY_BYTES);

        let err = ProviderError::rejected(409, body);

        let details = err.details();
        assert!(details.len() <= MAX_ERROR_BODY_BYTES);
        assert!(details.chars().all(|c| c == 'é'));
        assert_eq!(err.http_status(), Some(409));
    }
}
