use async_trait::async_trait;

pub mod memory;

/// Remembers which original bookings are being, or have been, replicated so
/// a redelivered webhook for the same booking does not replicate twice.
#[async_trait]
pub trait SeenBookings: Send + Sync {
    /// Claims `uid`. Returns `false` when it is already claimed.
    async fn try_claim(&self, uid: &str) -> bool;

    /// Drops a claim so a later delivery may retry.
    async fn release(&self, uid: &str);
}
