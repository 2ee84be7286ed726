use std::{sync::Arc, time::Duration as StdDuration};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde_json::Value;
use thiserror::Error;
use tokio::{task::JoinHandle, time::MissedTickBehavior};

use super::clock::Clock;

pub const HANDOFF_TTL_SECONDS: i64 = 90;
const HANDOFF_ID_BYTES: usize = 16;

/// Token response exactly as the provider returned it.
pub type TokenBundle = Value;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HandoffError {
    #[error("token handoff not found")]
    NotFound,
    #[error("token handoff expired")]
    Expired,
}

#[derive(Debug)]
struct HandoffEntry {
    payload: TokenBundle,
    expires_at: DateTime<Utc>,
}

impl HandoffEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Short-lived, single-use relay between the OAuth callback and the web
/// client. Entries live in process memory only.
///
/// `take` removes the entry before inspecting it, so concurrent callers
/// racing on one id see exactly one removal; everyone else gets
/// [`HandoffError::NotFound`].
pub struct HandoffStore {
    entries: DashMap<String, HandoffEntry>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl HandoffStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_ttl(clock, Duration::seconds(HANDOFF_TTL_SECONDS))
    }

    pub fn with_ttl(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
            ttl,
        }
    }

    /// Stores `payload` under a freshly generated id and returns the id.
    pub fn put(&self, payload: TokenBundle) -> String {
        let id = generate_handoff_id();
        let expires_at = self.clock.now() + self.ttl;

        // 128 random bits make this practically unreachable; the replaced
        // entry is lost if it ever happens.
        if self
            .entries
            .insert(
                id.clone(),
                HandoffEntry {
                    payload,
                    expires_at,
                },
            )
            .is_some()
        {
            tracing::warn!("handoff id collision, previous entry replaced");
        }

        id
    }

    pub fn take(&self, id: &str) -> Result<TokenBundle, HandoffError> {
        let (_, entry) = self.entries.remove(id).ok_or(HandoffError::NotFound)?;

        if entry.is_expired(self.clock.now()) {
            return Err(HandoffError::Expired);
        }

        Ok(entry.payload)
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let keep = !entry.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Runs [`HandoffStore::sweep_expired`] every `period` until the runtime shuts down.
pub fn spawn_sweeper(store: Arc<HandoffStore>, period: StdDuration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let removed = store.sweep_expired();
            if removed > 0 {
                tracing::debug!(removed, remaining = store.len(), "swept expired handoffs");
            }
        }
    })
}

fn generate_handoff_id() -> String {
    let bytes: [u8; HANDOFF_ID_BYTES] = rand::random();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use serde_json::json;

    use super::*;
    use crate::auth::clock::ManualClock;

    fn store_with_clock() -> (Arc<HandoffStore>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let store = Arc::new(HandoffStore::new(clock.clone()));
        (store, clock)
    }

    #[test]
    fn unknown_id_is_not_found() {
        let (store, _) = store_with_clock();
        assert_eq!(store.take("never-issued"), Err(HandoffError::NotFound));
        assert_eq!(store.take(""), Err(HandoffError::NotFound));
    }

    #[test]
    fn first_take_returns_payload_then_not_found() {
        let (store, clock) = store_with_clock();
        let payload = json!({ "access_token": "at-1", "refresh_token": "rt-1" });
        let id = store.put(payload.clone());

        clock.advance(Duration::seconds(30));
        assert_eq!(store.take(&id), Ok(payload));
        assert_eq!(store.take(&id), Err(HandoffError::NotFound));
        assert!(store.is_empty());
    }

    #[test]
    fn entry_is_still_valid_at_the_ttl_boundary() {
        let (store, clock) = store_with_clock();
        let id = store.put(json!({ "access_token": "at" }));

        clock.advance(Duration::seconds(HANDOFF_TTL_SECONDS));
        assert!(store.take(&id).is_ok());
    }

    #[test]
    fn expired_take_reports_expired_once() {
        let (store, clock) = store_with_clock();
        let id = store.put(json!({ "access_token": "at" }));

        clock.advance(Duration::seconds(HANDOFF_TTL_SECONDS + 1));
        assert_eq!(store.take(&id), Err(HandoffError::Expired));
        assert_eq!(store.take(&id), Err(HandoffError::NotFound));
    }

    #[test]
    fn ids_are_hex_and_distinct() {
        let (store, _) = store_with_clock();
        let ids: HashSet<String> = (0..256).map(|_| store.put(json!({}))).collect();

        assert_eq!(ids.len(), 256);
        for id in &ids {
            assert_eq!(id.len(), HANDOFF_ID_BYTES * 2);
            assert!(id.chars().all(|ch| ch.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn sweep_only_removes_expired_entries() {
        let (store, clock) = store_with_clock();
        let old = store.put(json!({ "access_token": "old" }));
        clock.advance(Duration::seconds(60));
        let fresh = store.put(json!({ "access_token": "fresh" }));
        clock.advance(Duration::seconds(31));

        assert_eq!(store.sweep_expired(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.take(&old), Err(HandoffError::NotFound));
        assert_eq!(store.take(&fresh), Ok(json!({ "access_token": "fresh" })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_takes_yield_exactly_one_payload() {
        let (store, _) = store_with_clock();
        let id = store.put(json!({ "access_token": "contended" }));

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let store = Arc::clone(&store);
                let id = id.clone();
                tokio::spawn(async move { store.take(&id) })
            })
            .collect();

        let mut successes = 0;
        let mut not_found = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(payload) => {
                    assert_eq!(payload, json!({ "access_token": "contended" }));
                    successes += 1;
                }
                Err(HandoffError::NotFound) => not_found += 1,
                Err(HandoffError::Expired) => panic!("entry should not be expired"),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(not_found, 31);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_task_clears_abandoned_entries() {
        let (store, clock) = store_with_clock();
        store.put(json!({ "access_token": "abandoned" }));
        clock.advance(Duration::seconds(HANDOFF_TTL_SECONDS + 1));

        let handle = spawn_sweeper(Arc::clone(&store), StdDuration::from_secs(30));
        tokio::time::sleep(StdDuration::from_secs(1)).await;

        assert!(store.is_empty());
        handle.abort();
    }
}
