use serde::Serialize;
use serde_json::{Map, Value};

/// Upper bound on seats a single booking may expand to.
pub const MAX_SEATS: u32 = 15;

/// Metadata key carried by every sibling booking, pointing back at the
/// booking it was replicated from.
pub const REPLICATION_MARKER_KEY: &str = "multiParentUid";

/// Metadata key recording which seat (2..=qty) a sibling stands for.
pub const SEAT_INDEX_KEY: &str = "multiSeatIndex";

/// Number of seats requested under one logical booking, always in `1..=MAX_SEATS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SeatQuantity(u32);

impl SeatQuantity {
    pub const SINGLE: Self = Self(1);

    pub fn clamped(raw: i64) -> Self {
        Self(raw.clamp(1, i64::from(MAX_SEATS)) as u32)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    /// Sibling bookings needed on top of the original.
    pub const fn extra(self) -> u32 {
        self.0 - 1
    }

    pub const fn is_single(self) -> bool {
        self.0 == 1
    }
}

impl Default for SeatQuantity {
    fn default() -> Self {
        Self::SINGLE
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub name: String,
    pub email: String,
    pub time_zone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Body of a `POST /bookings` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBooking {
    pub start: String,
    pub event_type_id: Value,
    pub attendee: Attendee,
    pub metadata: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_fields_responses: Option<Map<String, Value>>,
}

impl CreateBooking {
    pub fn parent_uid(&self) -> Option<&str> {
        self.metadata
            .get(REPLICATION_MARKER_KEY)
            .and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    UnhandledEventType,
    SelfCreatedBooking,
    DuplicateDelivery,
}

impl SkipReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnhandledEventType => "unhandled_event_type",
            Self::SelfCreatedBooking => "self_created_booking",
            Self::DuplicateDelivery => "duplicate_delivery",
        }
    }
}

/// Successful (2xx) webhook answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qty: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uids: Vec<String>,
    /// Set when the booking needed no siblings at all.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub single_seat: bool,
}

impl WebhookResponse {
    pub fn skipped(reason: SkipReason, event: &str) -> Self {
        Self {
            ok: true,
            skipped: Some(reason),
            event: Some(event.to_owned()),
            qty: None,
            extra: None,
            created: None,
            uids: Vec::new(),
            single_seat: false,
        }
    }

    /// Acknowledges a one-seat booking; nothing is replicated.
    pub fn single_seat() -> Self {
        Self {
            single_seat: true,
            ..Self::replicated(SeatQuantity::SINGLE, 0, Vec::new())
        }
    }

    pub fn replicated(qty: SeatQuantity, created: u32, uids: Vec<String>) -> Self {
        Self {
            ok: true,
            skipped: None,
            event: None,
            qty: Some(qty.get()),
            extra: Some(qty.extra()),
            created: Some(created),
            uids,
            single_seat: false,
        }
    }
}
