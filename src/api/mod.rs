use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::HeaderMap,
    routing::get,
    Json, Router,
};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{info, instrument, warn, Span};
use uuid::Uuid;

use crate::{
    auth::{self, SIGNATURE_HEADER, TOKEN_PARAM},
    config::AppConfig,
    dedup::SeenBookings,
    domain::{SkipReason, WebhookResponse},
    errors::{panic_response, AppError},
    extract::resolve_quantity,
    filter::{screen, Screening},
    provider::BookingApi,
    replicate,
    webhook::WebhookEnvelope,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// `None` when no provider API key is configured.
    pub provider: Option<Arc<dyn BookingApi>>,
    /// `None` unless the redelivery guard is enabled.
    pub seen: Option<Arc<dyn SeenBookings>>,
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_webhook_size_bytes;
    Router::new()
        .route("/", get(health).post(receive_webhook))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness probe; also answers `HEAD /` with an empty body.
async fn health() -> &'static str {
    "ok"
}

#[instrument(
    name = "receive_webhook",
    skip_all,
    fields(
        request_id = %Uuid::new_v4(),
        trigger = tracing::field::Empty,
        booking_uid = tracing::field::Empty,
    )
)]
async fn receive_webhook(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    let token = params.get(TOKEN_PARAM).map(String::as_str);

    if !auth::is_authorized(&state.config, &body, signature, token) {
        warn!(
            has_signature = signature.is_some(),
            has_token = token.is_some(),
            "rejecting unauthenticated webhook"
        );
        return Err(AppError::Unauthorized);
    }

    let envelope = WebhookEnvelope::parse(&body);
    let booking = envelope.booking();
    let span = Span::current();
    span.record("trigger", envelope.trigger.as_str());
    if let Some(uid) = booking.uid() {
        span.record("booking_uid", uid.as_str());
    }

    if let Screening::Skip(reason) = screen(&envelope) {
        info!(reason = reason.as_str(), "skipping webhook");
        return Ok(Json(WebhookResponse::skipped(reason, &envelope.trigger)));
    }

    let resolution = resolve_quantity(&envelope.booking, state.provider.as_deref()).await;
    let qty = resolution.qty;
    info!(
        qty = qty.get(),
        source = %resolution.source,
        field = resolution.field.as_deref(),
        from_detail = resolution.from_detail,
        "seat quantity resolved"
    );

    if qty.is_single() {
        return Ok(Json(WebhookResponse::single_seat()));
    }

    let provider = state
        .provider
        .as_deref()
        .ok_or_else(|| AppError::Configuration("CAL_API_KEY is not configured".to_owned()))?;

    let plan = replicate::plan(&booking, qty).map_err(|err| {
        warn!(error = %err, "booking cannot be replicated");
        AppError::from(err)
    })?;

    if let Some(seen) = &state.seen {
        if !seen.try_claim(&plan.parent_uid).await {
            info!("booking already replicated by an earlier delivery");
            return Ok(Json(WebhookResponse::skipped(
                SkipReason::DuplicateDelivery,
                &envelope.trigger,
            )));
        }
    }

    match replicate::execute(provider, &plan).await {
        Ok(report) => Ok(Json(WebhookResponse::replicated(
            report.qty,
            report.created,
            report.uids,
        ))),
        Err(err) => {
            if let Some(seen) = &state.seen {
                // Siblings already on the calendar must not be created twice.
                if err.created() == 0 {
                    seen.release(&plan.parent_uid).await;
                } else {
                    warn!(created = err.created(), "keeping claim after partial replication");
                }
            }
            Err(err.into())
        }
    }
}
