use crate::{
    domain::SkipReason,
    webhook::{normalize_trigger, WebhookEnvelope},
};

const BOOKING_CREATED: &str = "booking_created";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screening {
    Proceed,
    Skip(SkipReason),
}

/// Lets through only booking-created events for bookings this service did
/// not create itself.
pub fn screen(envelope: &WebhookEnvelope) -> Screening {
    if normalize_trigger(&envelope.trigger) != BOOKING_CREATED {
        return Screening::Skip(SkipReason::UnhandledEventType);
    }

    if envelope.booking().replication_parent().is_some() {
        return Screening::Skip(SkipReason::SelfCreatedBooking);
    }

    Screening::Proceed
}
