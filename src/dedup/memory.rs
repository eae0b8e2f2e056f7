use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::dedup::SeenBookings;

/// Process-local claims that expire after a fixed TTL.
#[derive(Clone)]
pub struct MemorySeenBookings {
    ttl: Duration,
    claims: Arc<RwLock<HashMap<String, DateTime<Utc>>>>,
}

impl MemorySeenBookings {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            claims: Arc::default(),
        }
    }

    async fn claim_at(&self, uid: &str, now: DateTime<Utc>) -> bool {
        let mut claims = self.claims.write().await;
        let ttl = self.ttl;
        claims.retain(|_, claimed_at| {
            now.signed_duration_since(*claimed_at)
                .to_std()
                .map_or(true, |age| age < ttl)
        });

        if claims.contains_key(uid) {
            return false;
        }
        claims.insert(uid.to_owned(), now);
        true
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.claims.read().await.len()
    }
}

#[async_trait]
impl SeenBookings for MemorySeenBookings {
    async fn try_claim(&self, uid: &str) -> bool {
        self.claim_at(uid, Utc::now()).await
    }

    async fn release(&self, uid: &str) {
        self.claims.write().await.remove(uid);
    }
}
