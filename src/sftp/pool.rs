//! SFTP session pool
//!
//! Keeps at most one live session per endpoint (`host:port`), established
//! lazily and reused across listing, download and upload operations.
//! There is no idle-timeout eviction: a session lives until `release` or
//! process exit. A session that silently died from network loss is detected
//! by the liveness probe on the next acquire and transparently replaced, so
//! callers never see a stale-connection error.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::transport::{Connector, RemoteFs};
use crate::config::ConnectionProfile;
use crate::ssh::ConnectionError;

/// One cached slot per session key.
///
/// The per-key mutex makes probe / connect / evict atomic against concurrent
/// acquires and releases of the same endpoint, while leaving distinct
/// endpoints fully independent.
struct PoolEntry {
    slot: Mutex<Option<Arc<dyn RemoteFs>>>,
}

/// Pool of live SFTP sessions keyed by `host:port`
pub struct SessionPool {
    connector: Arc<dyn Connector>,
    entries: DashMap<String, Arc<PoolEntry>>,
}

impl SessionPool {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            entries: DashMap::new(),
        }
    }

    fn entry(&self, key: &str) -> Arc<PoolEntry> {
        self.entries
            .entry(key.to_string())
            .or_insert_with(|| {
                Arc::new(PoolEntry {
                    slot: Mutex::new(None),
                })
            })
            .value()
            .clone()
    }

    /// Return the cached session for the profile's endpoint, or connect and
    /// cache a new one.
    ///
    /// A cached session is probed first; a dead one is closed, evicted and
    /// replaced within the same call. Connection failures surface once to
    /// the caller and are never retried here.
    pub async fn acquire(
        &self,
        profile: &ConnectionProfile,
    ) -> Result<Arc<dyn RemoteFs>, ConnectionError> {
        let key = profile.session_key();
        let entry = self.entry(&key);
        let mut slot = entry.slot.lock().await;

        if let Some(session) = slot.as_ref() {
            if session.is_alive().await {
                debug!("Reusing cached session for {}", key);
                return Ok(Arc::clone(session));
            }
            warn!("Cached session for {} is dead, reconnecting", key);
            let dead = slot.take();
            if let Some(dead) = dead {
                dead.close().await;
            }
        }

        let session = self.connector.connect(profile).await?;
        info!("Cached new session for {}", key);
        *slot = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Close and evict the session for the profile's endpoint.
    ///
    /// No-op when nothing is cached under that key.
    pub async fn release(&self, profile: &ConnectionProfile) {
        let key = profile.session_key();
        let Some(entry) = self.entries.get(&key).map(|e| Arc::clone(e.value())) else {
            return;
        };

        let mut slot = entry.slot.lock().await;
        if let Some(session) = slot.take() {
            info!("Releasing session for {}", key);
            session.close().await;
        }
    }

    /// Whether a session is currently cached for the profile's endpoint
    pub async fn is_cached(&self, profile: &ConnectionProfile) -> bool {
        let key = profile.session_key();
        match self.entries.get(&key).map(|e| Arc::clone(e.value())) {
            Some(entry) => entry.slot.lock().await.is_some(),
            None => false,
        }
    }
}
