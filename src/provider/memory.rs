use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::{
    domain::CreateBooking,
    provider::{BookingApi, ProviderError},
};

/// In-process `BookingApi` that records every call. Creates succeed unless a
/// rejection was scheduled for that call number.
#[derive(Clone, Default)]
pub struct RecordingBookingApi {
    state: Arc<RwLock<RecordingState>>,
}

#[derive(Default)]
struct RecordingState {
    create_attempts: usize,
    created: Vec<CreateBooking>,
    fetched: Vec<String>,
    details: HashMap<String, Value>,
    rejections: HashMap<usize, (u16, String)>,
    fetch_rejection: Option<(u16, String)>,
}

impl RecordingBookingApi {
    /// Serves `detail` for `fetch_booking(uid)`.
    pub async fn insert_detail(&self, uid: impl Into<String>, detail: Value) {
        self.state.write().await.details.insert(uid.into(), detail);
    }

    /// Rejects the `attempt`-th create call (1-based) with `status` and `body`.
    pub async fn reject_create(&self, attempt: usize, status: u16, body: impl Into<String>) {
        self.state
            .write()
            .await
            .rejections
            .insert(attempt, (status, body.into()));
    }

    /// Fails every `fetch_booking` call with `status` and `body`.
    pub async fn reject_fetch(&self, status: u16, body: impl Into<String>) {
        self.state.write().await.fetch_rejection = Some((status, body.into()));
    }

    pub async fn created(&self) -> Vec<CreateBooking> {
        self.state.read().await.created.clone()
    }

    pub async fn create_attempts(&self) -> usize {
        self.state.read().await.create_attempts
    }

    pub async fn fetched(&self) -> Vec<String> {
        self.state.read().await.fetched.clone()
    }
}

#[async_trait]
impl BookingApi for RecordingBookingApi {
    async fn create_booking(&self, booking: &CreateBooking) -> Result<Value, ProviderError> {
        let mut state = self.state.write().await;
        state.create_attempts += 1;
        let attempt = state.create_attempts;

        if let Some((status, body)) = state.rejections.get(&attempt).cloned() {
            return Err(ProviderError::rejected(status, body));
        }

        state.created.push(booking.clone());
        let parent = booking.parent_uid().unwrap_or("booking");
        Ok(json!({ "uid": format!("{parent}-seat-{attempt}") }))
    }

    async fn fetch_booking(&self, uid: &str) -> Result<Option<Value>, ProviderError> {
        let mut state = self.state.write().await;
        state.fetched.push(uid.to_owned());
        if let Some((status, body)) = state.fetch_rejection.clone() {
            return Err(ProviderError::rejected(status, body));
        }
        Ok(state.details.get(uid).cloned())
    }
}
