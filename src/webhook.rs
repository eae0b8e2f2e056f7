//! Inbound webhook envelope and a read-only view over the booking it carries.
//!
//! The provider's booking payload is kept as a `serde_json::Value` and read
//! through accessors that try each known field spelling in turn. Nothing
//! here fails: missing or oddly typed fields simply read as `None`.

use serde_json::{Map, Value};

use crate::domain::{Attendee, REPLICATION_MARKER_KEY};

const FALLBACK_TIME_ZONE: &str = "UTC";

#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEnvelope {
    /// Event name as sent, e.g. `BOOKING_CREATED`.
    pub trigger: String,
    pub booking: Value,
}

impl WebhookEnvelope {
    /// Parses a raw body. Malformed JSON is treated as an empty object.
    pub fn parse(body: &[u8]) -> Self {
        let root: Value = match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!(error = %err, "webhook body is not valid JSON, treating as empty");
                Value::Object(Map::new())
            }
        };

        let trigger = ["triggerEvent", "type"]
            .iter()
            .find_map(|key| root.get(*key).and_then(Value::as_str))
            .unwrap_or_default()
            .to_owned();

        let booking = ["payload", "data"]
            .iter()
            .find_map(|key| root.get(*key).filter(|value| value.is_object()))
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));

        Self { trigger, booking }
    }

    pub fn booking(&self) -> BookingView<'_> {
        BookingView::new(&self.booking)
    }
}

/// Lower-cases an event name and folds `-`, `.`, `:` and spaces into `_`.
pub fn normalize_trigger(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            '-' | '.' | ':' | ' ' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
pub struct BookingView<'a> {
    raw: &'a Value,
}

impl<'a> BookingView<'a> {
    pub fn new(raw: &'a Value) -> Self {
        Self { raw }
    }

    pub fn uid(&self) -> Option<String> {
        ["uid", "id", "bookingId"]
            .iter()
            .find_map(|key| self.raw.get(*key).and_then(scalar_string))
    }

    pub fn event_type_id(&self) -> Option<String> {
        self.raw
            .get("eventTypeId")
            .and_then(scalar_string)
            .or_else(|| {
                self.raw
                    .get("eventType")
                    .and_then(|event_type| event_type.get("id"))
                    .and_then(scalar_string)
            })
    }

    pub fn start_time(&self) -> Option<&'a str> {
        ["startTime", "start"]
            .iter()
            .find_map(|key| self.raw.get(*key).and_then(non_empty_str))
    }

    pub fn metadata(&self) -> Option<&'a Map<String, Value>> {
        self.raw.get("metadata").and_then(Value::as_object)
    }

    /// Uid of the booking this one was replicated from, if it is a sibling.
    pub fn replication_parent(&self) -> Option<&'a Value> {
        self.metadata()
            .and_then(|metadata| metadata.get(REPLICATION_MARKER_KEY))
            .filter(|value| !value.is_null())
    }

    /// The booking-form answers keyed by field slug.
    pub fn responses(&self) -> Option<&'a Map<String, Value>> {
        self.raw.get("responses").and_then(Value::as_object)
    }

    /// First attendee, completed from the form answers and organizer when
    /// the attendee entry is partial. `None` when no email can be found.
    pub fn primary_attendee(&self) -> Option<Attendee> {
        let first = self
            .raw
            .get("attendees")
            .and_then(Value::as_array)
            .and_then(|attendees| attendees.first());

        let email = first
            .and_then(|attendee| attendee.get("email"))
            .and_then(non_empty_str)
            .or_else(|| self.response_text("email"))?
            .to_owned();

        let name = first
            .and_then(|attendee| attendee.get("name"))
            .and_then(non_empty_str)
            .or_else(|| self.response_text("name"))
            .unwrap_or(email.as_str())
            .to_owned();

        let time_zone = first
            .and_then(|attendee| attendee.get("timeZone"))
            .and_then(non_empty_str)
            .or_else(|| {
                self.raw
                    .get("organizer")
                    .and_then(|organizer| organizer.get("timeZone"))
                    .and_then(non_empty_str)
            })
            .unwrap_or(FALLBACK_TIME_ZONE)
            .to_owned();

        let language = first.and_then(|attendee| attendee.get("language")).and_then(
            |language| match language {
                Value::String(locale) if !locale.is_empty() => Some(locale.clone()),
                Value::Object(map) => map.get("locale").and_then(non_empty_str).map(str::to_owned),
                _ => None,
            },
        );

        Some(Attendee {
            name,
            email,
            time_zone,
            language,
        })
    }

    /// A form answer stored either as a bare string or as `{ "value": "..." }`.
    fn response_text(&self, field: &str) -> Option<&'a str> {
        let answer = self.responses()?.get(field)?;
        non_empty_str(answer).or_else(|| answer.get("value").and_then(non_empty_str))
    }
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty())
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
