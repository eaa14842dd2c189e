//! Process-wide session store with per-call serialization and TTL eviction.
//!
//! Each entry is an `Arc<Mutex<CallSession>>`: handlers lock the session for
//! the whole transition, so duplicate or out-of-order provider callbacks for
//! one call id serialize while unrelated calls proceed concurrently. The outer
//! map lock is only held for map operations.

use super::CallSession;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

pub type SharedSession = Arc<Mutex<CallSession>>;

#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<String, SharedSession>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn create(
        &self,
        call_id: &str,
        job_role: &str,
        job_description: &str,
    ) -> SharedSession {
        let session = Arc::new(Mutex::new(CallSession::new(
            call_id,
            job_role,
            job_description,
        )));
        let mut map = self.inner.lock().await;
        map.insert(call_id.to_string(), Arc::clone(&session));
        session
    }

    pub async fn get(&self, call_id: &str) -> Option<SharedSession> {
        let map = self.inner.lock().await;
        map.get(call_id).cloned()
    }

    pub async fn remove(&self, call_id: &str) -> Option<SharedSession> {
        let mut map = self.inner.lock().await;
        map.remove(call_id)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    /// Drop sessions idle past the TTL. Sessions locked by an in-flight
    /// transition are skipped; their `last_activity` is fresh anyway.
    pub async fn sweep_expired(&self) -> usize {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or_else(|_| chrono::Duration::hours(1));
        let cutoff = Utc::now() - ttl;

        let mut map = self.inner.lock().await;
        let before = map.len();
        map.retain(|call_id, shared| match shared.try_lock() {
            Ok(session) => {
                let keep = session.last_activity > cutoff;
                if !keep {
                    warn!(
                        "Evicting idle session for call {} (phase {}, last activity {})",
                        call_id,
                        session.phase.as_str(),
                        session.last_activity
                    );
                }
                keep
            }
            Err(_) => true,
        });
        before - map.len()
    }

    /// Background eviction loop. Holds only a clone of the store.
    pub fn spawn_sweeper(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = store.sweep_expired().await;
                if evicted > 0 {
                    info!("Session sweeper reclaimed {} idle session(s)", evicted);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::InterviewPhase;

    fn store() -> SessionStore {
        SessionStore::new(Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_create_get_remove() {
        let store = store();
        store.create("CA1", "Backend Engineer", "Rust services").await;
        assert_eq!(store.len().await, 1);

        let shared = store.get("CA1").await.expect("session exists");
        assert_eq!(shared.lock().await.phase, InterviewPhase::Introduction);

        assert!(store.remove("CA1").await.is_some());
        assert!(store.get("CA1").await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_get_unknown_call_id() {
        let store = store();
        assert!(store.get("CA-unknown").await.is_none());
    }

    #[tokio::test]
    async fn test_sweep_evicts_idle_sessions_only() {
        let store = store();
        let stale = store.create("CA-stale", "Backend Engineer", "desc").await;
        store.create("CA-fresh", "Backend Engineer", "desc").await;

        stale.lock().await.last_activity = Utc::now() - chrono::Duration::seconds(120);

        let evicted = store.sweep_expired().await;
        assert_eq!(evicted, 1);
        assert!(store.get("CA-stale").await.is_none());
        assert!(store.get("CA-fresh").await.is_some());
    }

    #[tokio::test]
    async fn test_sweep_skips_locked_sessions() {
        let store = store();
        let busy = store.create("CA-busy", "Backend Engineer", "desc").await;
        busy.lock().await.last_activity = Utc::now() - chrono::Duration::seconds(120);

        let guard = busy.lock().await;
        let evicted = store.sweep_expired().await;
        drop(guard);

        assert_eq!(evicted, 0);
        assert!(store.get("CA-busy").await.is_some());
    }
}
