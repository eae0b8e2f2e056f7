//! Seat-quantity extraction.
//!
//! Booking-form layouts differ between event types and tenants, so the seat
//! count is searched for through progressively looser heuristics:
//!
//! 1. known field names in the answer maps (`responses` and friends),
//! 2. any answer-map key containing a seat hint,
//! 3. answer lists of `{label, value}`-style objects,
//! 4. the same three steps over the provider's full booking detail,
//! 5. a deep scan of every nested key in the record.
//!
//! A step only counts when it yields more than one seat; every result is
//! clamped into `1..=MAX_SEATS`. Nothing here fails: an unreadable or absent
//! count resolves to a single seat.
//!
//! The deep scan visits keys in whatever order the JSON maps iterate. Which
//! match wins when a record holds several unrelated seat-like numbers is
//! best-effort and not something callers should rely on.

use std::fmt;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{domain::SeatQuantity, provider::BookingApi, webhook::BookingView};

const KNOWN_FIELDS: &[&str] = &[
    "places",
    "nombre_de_places",
    "nombre-de-places",
    "nombreDePlaces",
    "nb_places",
    "nb-places",
    "number_of_participants",
    "number-of-participants",
    "numberOfParticipants",
    "number_of_seats",
    "seats",
    "quantity",
];

/// Record fields holding answers keyed by field slug.
const ANSWER_MAPS: &[&str] = &[
    "responses",
    "bookingFieldsResponses",
    "userFieldsResponses",
    "customInputs",
];

/// Record fields holding ordered lists of answer objects.
const ANSWER_LISTS: &[&str] = &[
    "customInputs",
    "responses",
    "bookingFieldsResponses",
    "answers",
    "formResponses",
    "fields",
    "questions",
];

const KEY_HINTS: &[&str] = &["place", "seat"];
const DEEP_HINTS: &[&str] = &["place", "seat", "particip"];

/// Identifying fields of an answer object, in lookup order.
const LABEL_FIELDS: &[&str] = &["key", "id", "name", "label", "question"];

/// Value-holding fields of an answer object, in priority order.
const VALUE_FIELDS: &[&str] = &["value", "answer", "response", "number", "text"];

/// Event-type capacity settings that look like seat counts but are not.
const DEEP_SCAN_IGNORED: &[&str] = &[
    "seatsPerTimeSlot",
    "seatsShowAttendees",
    "seatsShowAvailabilityCount",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantitySource {
    Default,
    KnownField,
    KeyScan,
    AnswerList,
    DeepScan,
}

impl QuantitySource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::KnownField => "known_field",
            Self::KeyScan => "key_scan",
            Self::AnswerList => "answer_list",
            Self::DeepScan => "deep_scan",
        }
    }
}

impl fmt::Display for QuantitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub qty: SeatQuantity,
    pub source: QuantitySource,
    /// Field the quantity was read from.
    pub field: Option<String>,
    /// Whether the quantity came from the fetched booking detail.
    pub from_detail: bool,
}

impl Resolution {
    fn single() -> Self {
        Self {
            qty: SeatQuantity::SINGLE,
            source: QuantitySource::Default,
            field: None,
            from_detail: false,
        }
    }

    fn found(qty: SeatQuantity, source: QuantitySource, field: &str) -> Self {
        Self {
            qty,
            source,
            field: Some(field.to_owned()),
            from_detail: false,
        }
    }

    fn is_multi(&self) -> bool {
        !self.qty.is_single()
    }
}

/// Resolves the seat count for `booking`, fetching its full detail through
/// `api` when the webhook payload alone says nothing beyond one seat.
pub async fn resolve_quantity(booking: &Value, api: Option<&dyn BookingApi>) -> Resolution {
    if let Some(found) = scan_structured(booking).filter(Resolution::is_multi) {
        return found;
    }

    let mut detail = None;
    let uid = BookingView::new(booking).uid();
    if let (Some(api), Some(uid)) = (api, uid) {
        match api.fetch_booking(&uid).await {
            Ok(Some(fetched)) => {
                if let Some(mut found) = scan_structured(&fetched).filter(Resolution::is_multi) {
                    found.from_detail = true;
                    return found;
                }
                detail = Some(fetched);
            }
            Ok(None) => debug!(uid = %uid, "no booking detail available"),
            Err(err) => {
                warn!(
                    uid = %uid,
                    error = %err,
                    "booking detail fetch failed, using webhook payload only"
                );
            }
        }
    }

    if let Some(fetched) = &detail {
        if let Some(mut found) = deep_scan(fetched).filter(Resolution::is_multi) {
            found.from_detail = true;
            return found;
        }
    }
    if let Some(found) = deep_scan(booking).filter(Resolution::is_multi) {
        return found;
    }

    Resolution::single()
}

/// Steps 1-3 over one record; the first step that finds a readable count wins.
pub fn scan_structured(record: &Value) -> Option<Resolution> {
    let maps: Vec<&Map<String, Value>> = ANSWER_MAPS
        .iter()
        .filter_map(|key| record.get(*key).and_then(Value::as_object))
        .collect();

    known_fields(&maps)
        .or_else(|| key_scan(&maps))
        .or_else(|| answer_lists(record))
}

fn known_fields(maps: &[&Map<String, Value>]) -> Option<Resolution> {
    maps.iter().find_map(|map| {
        KNOWN_FIELDS.iter().find_map(|field| {
            let qty = map.get(*field).and_then(coerce_count)?;
            Some(Resolution::found(qty, QuantitySource::KnownField, field))
        })
    })
}

fn key_scan(maps: &[&Map<String, Value>]) -> Option<Resolution> {
    maps.iter().find_map(|map| {
        map.iter().find_map(|(key, value)| {
            if !contains_hint(key, KEY_HINTS) {
                return None;
            }
            let qty = coerce_count(value)?;
            Some(Resolution::found(qty, QuantitySource::KeyScan, key))
        })
    })
}

fn answer_lists(record: &Value) -> Option<Resolution> {
    ANSWER_LISTS
        .iter()
        .filter_map(|key| record.get(*key).and_then(Value::as_array))
        .flatten()
        .find_map(|entry| {
            let label = LABEL_FIELDS.iter().find_map(|field| {
                entry
                    .get(*field)
                    .and_then(Value::as_str)
                    .filter(|label| contains_hint(label, KEY_HINTS))
            })?;
            let qty = VALUE_FIELDS
                .iter()
                .find_map(|field| entry.get(*field).and_then(coerce_count))?;
            Some(Resolution::found(qty, QuantitySource::AnswerList, label))
        })
}

/// Walks every nested map and list looking for a seat-like key with a
/// numeric value.
pub fn deep_scan(record: &Value) -> Option<Resolution> {
    let mut worklist = vec![record];

    while let Some(node) = worklist.pop() {
        match node {
            Value::Object(map) => {
                for (key, value) in map {
                    if DEEP_SCAN_IGNORED.contains(&key.as_str()) {
                        continue;
                    }
                    if contains_hint(key, DEEP_HINTS) {
                        if let Some(raw) = numeric_leaf(value) {
                            let qty = SeatQuantity::clamped(raw);
                            return Some(Resolution::found(qty, QuantitySource::DeepScan, key));
                        }
                    }
                    if value.is_object() || value.is_array() {
                        worklist.push(value);
                    }
                }
            }
            Value::Array(items) => worklist.extend(items.iter()),
            _ => {}
        }
    }

    None
}

fn contains_hint(key: &str, hints: &[&str]) -> bool {
    let key = key.to_lowercase();
    hints.iter().any(|hint| key.contains(hint))
}

/// Reads a seat count from a form answer: a number, a string containing a
/// number (`"4"`, `"4 places"`), or an object wrapping one of those.
pub fn coerce_count(value: &Value) -> Option<SeatQuantity> {
    let raw = match value {
        Value::Number(n) => number_to_i64(n)?,
        Value::String(s) => first_integer(s)?,
        Value::Object(map) => {
            return VALUE_FIELDS
                .iter()
                .find_map(|field| map.get(*field).and_then(coerce_count));
        }
        Value::Null | Value::Bool(_) | Value::Array(_) => return None,
    };
    Some(SeatQuantity::clamped(raw))
}

/// A JSON number or a string that is entirely an integer.
fn numeric_leaf(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => number_to_i64(n),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn number_to_i64(n: &serde_json::Number) -> Option<i64> {
    if let Some(int) = n.as_i64() {
        return Some(int);
    }
    // Saturating cast: huge values clamp to the cap, fractions truncate.
    n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)
}

/// First optionally-negative run of ASCII digits in `text`.
fn first_integer(text: &str) -> Option<i64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    let negative = text[..start].ends_with('-');

    let magnitude = digits.parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}
