use std::any::Any;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::replicate::ReplicationError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("authentication failed")]
    Unauthorized,
    #[error("missing configuration: {0}")]
    Configuration(String),
    #[error("invalid booking: {0}")]
    Validation(String),
    #[error("provider rejected a sibling booking")]
    Upstream {
        qty: u32,
        extra: u32,
        created: u32,
        status: Option<u16>,
        details: String,
    },
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ReplicationError> for AppError {
    fn from(err: ReplicationError) -> Self {
        match err {
            ReplicationError::Validation(missing) => {
                Self::Validation(format!("booking is missing {missing}"))
            }
            ReplicationError::Upstream {
                qty,
                created,
                source,
            } => Self::Upstream {
                qty: qty.get(),
                extra: qty.extra(),
                created,
                status: source.http_status(),
                details: source.details(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    ok: bool,
    error: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    qty: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    extra: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    created: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl<'a> ErrorBody<'a> {
    fn new(error: &'a str, message: String) -> Self {
        Self {
            ok: false,
            error,
            message,
            qty: None,
            extra: None,
            created: None,
            status: None,
            details: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ErrorBody::new("unauthorized", "Invalid signature or token".to_owned()),
            ),
            AppError::Configuration(message) => {
                tracing::error!(error = %message, "required configuration missing");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::new("configuration_error", message.to_owned()),
                )
            }
            AppError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody::new("validation_error", message.to_owned()),
            ),
            AppError::Upstream {
                qty,
                extra,
                created,
                status,
                details,
            } => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    qty: Some(*qty),
                    extra: Some(*extra),
                    created: Some(*created),
                    status: *status,
                    details: Some(details.to_owned()),
                    ..ErrorBody::new(
                        "upstream_error",
                        format!("Created {created} of {extra} extra bookings"),
                    )
                },
            ),
            AppError::Internal(message) => {
                tracing::error!(error = %message, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::new("internal_error", "An internal error occurred".to_owned()),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Renders a handler panic as an internal error.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(text) = panic.downcast_ref::<&str>() {
        (*text).to_owned()
    } else if let Some(text) = panic.downcast_ref::<String>() {
        text.clone()
    } else {
        "handler panicked".to_owned()
    };
    AppError::Internal(message).into_response()
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use serde_json::{json, Value};

    use super::*;

    async fn render(err: AppError) -> (StatusCode, Value) {
        read(err.into_response()).await
    }

    async fn read(response: Response) -> (StatusCode, Value) {
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn taxonomy_maps_to_statuses() {
        assert_eq!(render(AppError::Unauthorized).await.0, StatusCode::UNAUTHORIZED);
        assert_eq!(
            render(AppError::Configuration("CAL_API_KEY is not set".into())).await.0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            render(AppError::Validation("booking is missing start time".into())).await.0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            render(AppError::Internal("boom".into())).await.0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn upstream_error_reports_counters() {
        let (status, body) = render(AppError::Upstream {
            qty: 4,
            extra: 3,
            created: 1,
            status: Some(409),
            details: "slot full".into(),
        })
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({
                "ok": false,
                "error": "upstream_error",
                "message": "Created 1 of 3 extra bookings",
                "qty": 4,
                "extra": 3,
                "created": 1,
                "status": 409,
                "details": "slot full"
            })
        );
    }

    #[tokio::test]
    async fn internal_errors_hide_their_cause() {
        let (status, body) = read(panic_response(Box::new("secret detail"))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal_error");
        assert_eq!(body["message"], "An internal error occurred");
    }
}
