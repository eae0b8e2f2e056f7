//! Sibling-booking replication.
//!
//! Creates are issued one after another and stop at the first rejection.
//! Siblings created before a failure are kept; the report says how many.

use serde_json::{Map, Value};
use tracing::{info, instrument, warn};

use crate::{
    domain::{CreateBooking, SeatQuantity, REPLICATION_MARKER_KEY, SEAT_INDEX_KEY},
    provider::{BookingApi, ProviderError},
    webhook::BookingView,
};

#[derive(Debug, thiserror::Error)]
pub enum ReplicationError {
    #[error("booking is missing {0}")]
    Validation(String),
    #[error("provider rejected sibling booking after {created} created")]
    Upstream {
        qty: SeatQuantity,
        created: u32,
        #[source]
        source: ProviderError,
    },
}

impl ReplicationError {
    /// Siblings that exist despite the failure.
    pub fn created(&self) -> u32 {
        match self {
            Self::Validation(_) => 0,
            Self::Upstream { created, .. } => *created,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplicationPlan {
    pub parent_uid: String,
    pub qty: SeatQuantity,
    pub requests: Vec<CreateBooking>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationReport {
    pub qty: SeatQuantity,
    pub created: u32,
    pub uids: Vec<String>,
}

/// Builds one create request per extra seat. Fails without side effects when
/// the booking lacks what a sibling needs.
pub fn plan(
    booking: &BookingView<'_>,
    qty: SeatQuantity,
) -> Result<ReplicationPlan, ReplicationError> {
    let mut missing = Vec::new();
    let event_type_id = booking.event_type_id();
    let start = booking.start_time();
    let attendee = booking.primary_attendee();
    let parent_uid = booking.uid();

    if event_type_id.is_none() {
        missing.push("event type id");
    }
    if start.is_none() {
        missing.push("start time");
    }
    if attendee.is_none() {
        missing.push("attendee email");
    }
    if parent_uid.is_none() {
        missing.push("booking uid");
    }

    let (Some(event_type_id), Some(start), Some(attendee), Some(parent_uid)) =
        (event_type_id, start, attendee, parent_uid)
    else {
        return Err(ReplicationError::Validation(missing.join(", ")));
    };

    let event_type_id = match event_type_id.parse::<u64>() {
        Ok(id) => Value::from(id),
        Err(_) => Value::String(event_type_id),
    };
    let responses = booking.responses().cloned();

    let requests = (2..=qty.get())
        .map(|seat| {
            let mut metadata = Map::new();
            metadata.insert(
                REPLICATION_MARKER_KEY.to_owned(),
                Value::String(parent_uid.clone()),
            );
            metadata.insert(SEAT_INDEX_KEY.to_owned(), Value::String(seat.to_string()));

            CreateBooking {
                start: start.to_owned(),
                event_type_id: event_type_id.clone(),
                attendee: attendee.clone(),
                metadata,
                booking_fields_responses: responses.clone(),
            }
        })
        .collect();

    Ok(ReplicationPlan {
        parent_uid,
        qty,
        requests,
    })
}

/// Issues the planned creates in order, stopping at the first failure.
#[instrument(skip_all, fields(parent_uid = %plan.parent_uid, extra = plan.requests.len()))]
pub async fn execute(
    api: &dyn BookingApi,
    plan: &ReplicationPlan,
) -> Result<ReplicationReport, ReplicationError> {
    let mut uids = Vec::with_capacity(plan.requests.len());
    let mut created = 0u32;

    for request in &plan.requests {
        match api.create_booking(request).await {
            Ok(record) => {
                created += 1;
                if let Some(uid) = BookingView::new(&record).uid() {
                    uids.push(uid);
                }
            }
            Err(source) => {
                warn!(
                    created,
                    status = source.http_status(),
                    details = %source.details(),
                    "sibling booking rejected, stopping replication"
                );
                return Err(ReplicationError::Upstream {
                    qty: plan.qty,
                    created,
                    source,
                });
            }
        }
    }

    info!(created, "sibling bookings created");
    Ok(ReplicationReport {
        qty: plan.qty,
        created,
        uids,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::provider::memory::RecordingBookingApi;

    fn booking() -> Value {
        json!({
            "uid": "orig-1",
            "eventTypeId": 77,
            "startTime": "2026-11-02T09:00:00.000Z",
            "attendees": [
                { "name": "Ada", "email": "ada@example.com", "timeZone": "Europe/Paris" }
            ],
            "responses": { "places": 4, "email": "ada@example.com" }
        })
    }

    #[test]
    fn plan_builds_one_request_per_extra_seat() {
        let raw = booking();

        let plan = plan(&BookingView::new(&raw), SeatQuantity::clamped(4)).unwrap();

        assert_eq!(plan.requests.len(), 3);
        for (index, request) in plan.requests.iter().enumerate() {
            assert_eq!(request.event_type_id, json!(77));
            assert_eq!(request.start, "2026-11-02T09:00:00.000Z");
            assert_eq!(request.attendee.email, "ada@example.com");
            assert_eq!(request.parent_uid(), Some("orig-1"));
            assert_eq!(
                request.metadata[SEAT_INDEX_KEY],
                json!((index + 2).to_string())
            );
        }
    }

    #[test]
    fn plan_for_single_seat_is_empty() {
        let raw = booking();

        let plan = plan(&BookingView::new(&raw), SeatQuantity::SINGLE).unwrap();

        assert!(plan.requests.is_empty());
    }

    #[test]
    fn plan_keeps_non_numeric_event_type_ids_as_strings() {
        let mut raw = booking();
        raw["eventTypeId"] = json!("team-intro");

        let plan = plan(&BookingView::new(&raw), SeatQuantity::clamped(2)).unwrap();

        assert_eq!(plan.requests[0].event_type_id, json!("team-intro"));
    }

    #[test]
    fn plan_reports_every_missing_field() {
        let raw = json!({ "uid": "orig-1", "attendees": [] });

        let err = plan(&BookingView::new(&raw), SeatQuantity::clamped(3)).unwrap_err();

        match err {
            ReplicationError::Validation(missing) => {
                assert_eq!(missing, "event type id, start time, attendee email");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn execute_creates_all_siblings() {
        let api = RecordingBookingApi::default();
        let raw = booking();
        let plan = plan(&BookingView::new(&raw), SeatQuantity::clamped(4)).unwrap();

        let report = execute(&api, &plan).await.unwrap();

        assert_eq!(report.created, 3);
        assert_eq!(report.uids.len(), 3);
        assert_eq!(api.created().await.len(), 3);
    }

    #[tokio::test]
    async fn execute_stops_at_first_rejection() {
        let api = RecordingBookingApi::default();
        api.reject_create(2, 409, "slot full").await;
        let raw = booking();
        let plan = plan(&BookingView::new(&raw), SeatQuantity::clamped(4)).unwrap();

        let err = execute(&api, &plan).await.unwrap_err();

        assert_eq!(err.created(), 1);
        match err {
            ReplicationError::Upstream { created, source, .. } => {
                assert_eq!(created, 1);
                assert_eq!(source.http_status(), Some(409));
                assert_eq!(source.details(), "slot full");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(api.create_attempts().await, 2);
        assert_eq!(api.created().await.len(), 1);
    }
}
