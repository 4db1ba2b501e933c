//! In-memory transport for tests
//!
//! A [`Connector`]/[`RemoteFs`] pair backed by a per-endpoint map instead of
//! a network, with knobs for injected failures, artificial upload latency
//! and concurrency accounting. Kept in the library (not behind `cfg(test)`)
//! so downstream integrations can drive the panel logic without a server.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use super::error::{FetchError, ListError, SyncError};
use super::transport::{Connector, RawEntry, RemoteFs};
use crate::config::ConnectionProfile;
use crate::ssh::ConnectionError;

#[derive(Debug, Clone)]
enum Node {
    File(Vec<u8>),
    Dir,
}

/// Shared state of one fake endpoint.
///
/// Survives session replacement, so reconnect tests observe the same files
/// and counters across sessions.
#[derive(Default)]
pub struct EndpointState {
    nodes: DashMap<String, Node>,
    uploads: AtomicUsize,
    downloads: AtomicUsize,
    in_flight_uploads: AtomicUsize,
    max_in_flight_uploads: AtomicUsize,
    fail_uploads: AtomicBool,
    fail_downloads: AtomicBool,
    upload_delay_ms: AtomicU64,
}

impl EndpointState {
    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    /// Highest number of uploads that were ever in flight at once
    pub fn max_in_flight_uploads(&self) -> usize {
        self.max_in_flight_uploads.load(Ordering::SeqCst)
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_downloads(&self, fail: bool) {
        self.fail_downloads.store(fail, Ordering::SeqCst);
    }

    pub fn set_upload_delay(&self, delay: Duration) {
        self.upload_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn insert_file(&self, path: &str, contents: &[u8]) {
        self.nodes
            .insert(path.to_string(), Node::File(contents.to_vec()));
    }

    pub fn insert_dir(&self, path: &str) {
        self.nodes.insert(path.to_string(), Node::Dir);
    }

    /// Current contents of a remote file, if it exists
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        match self.nodes.get(path).map(|n| n.value().clone()) {
            Some(Node::File(bytes)) => Some(bytes),
            _ => None,
        }
    }

    fn children(&self, base: &str) -> Option<Vec<RawEntry>> {
        let base = if base.len() > 1 {
            base.trim_end_matches('/')
        } else {
            base
        };
        if base != "/" && !matches!(self.nodes.get(base).map(|n| n.value().clone()), Some(Node::Dir))
        {
            return None;
        }

        let mut out = Vec::new();
        for item in self.nodes.iter() {
            let path = item.key();
            let Some(idx) = path.rfind('/') else { continue };
            let parent = if idx == 0 { "/" } else { &path[..idx] };
            if parent == base {
                out.push(RawEntry {
                    name: path[idx + 1..].to_string(),
                    is_directory: matches!(item.value(), Node::Dir),
                });
            }
        }
        Some(out)
    }
}

/// Fake session bound to one [`EndpointState`]
pub struct MemoryRemoteFs {
    endpoint: Arc<EndpointState>,
    alive: AtomicBool,
}

impl MemoryRemoteFs {
    /// A standalone session with its own endpoint, for tests that do not
    /// involve the pool
    pub fn detached() -> Self {
        Self::bound(Arc::new(EndpointState::default()))
    }

    fn bound(endpoint: Arc<EndpointState>) -> Self {
        Self {
            endpoint,
            alive: AtomicBool::new(true),
        }
    }

    pub fn endpoint(&self) -> Arc<EndpointState> {
        Arc::clone(&self.endpoint)
    }

    pub fn alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Simulate a silent network death (or revival) of this session
    pub fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::SeqCst);
    }

    pub fn insert_file(&self, path: &str, contents: &[u8]) {
        self.endpoint.insert_file(path, contents);
    }

    pub fn insert_dir(&self, path: &str) {
        self.endpoint.insert_dir(path);
    }
}

#[async_trait]
impl RemoteFs for MemoryRemoteFs {
    async fn read_dir(&self, path: &str) -> Result<Vec<RawEntry>, ListError> {
        if !self.alive() {
            return Err(ListError::Remote {
                path: path.to_string(),
                detail: "session closed".to_string(),
            });
        }
        self.endpoint.children(path).ok_or_else(|| ListError::Remote {
            path: path.to_string(),
            detail: "no such directory".to_string(),
        })
    }

    async fn download(&self, remote_path: &str, local_path: &Path) -> Result<(), FetchError> {
        if !self.alive() || self.endpoint.fail_downloads.load(Ordering::SeqCst) {
            return Err(FetchError::Remote {
                remote_path: remote_path.to_string(),
                detail: "permission denied".to_string(),
            });
        }
        let bytes = self
            .endpoint
            .file(remote_path)
            .ok_or_else(|| FetchError::Remote {
                remote_path: remote_path.to_string(),
                detail: "no such file".to_string(),
            })?;
        tokio::fs::write(local_path, bytes).await?;
        self.endpoint.downloads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn upload(&self, local_path: &Path, remote_path: &str) -> Result<(), SyncError> {
        if !self.alive() || self.endpoint.fail_uploads.load(Ordering::SeqCst) {
            return Err(SyncError::Remote {
                remote_path: remote_path.to_string(),
                detail: "permission denied".to_string(),
            });
        }
        let bytes = tokio::fs::read(local_path).await?;

        let in_flight = self.endpoint.in_flight_uploads.fetch_add(1, Ordering::SeqCst) + 1;
        self.endpoint
            .max_in_flight_uploads
            .fetch_max(in_flight, Ordering::SeqCst);

        let delay = self.endpoint.upload_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        self.endpoint.insert_file(remote_path, &bytes);
        self.endpoint.uploads.fetch_add(1, Ordering::SeqCst);
        self.endpoint.in_flight_uploads.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    async fn is_alive(&self) -> bool {
        self.alive()
    }

    async fn close(&self) {
        self.set_alive(false);
    }
}

/// Connector handing out [`MemoryRemoteFs`] sessions.
///
/// Sessions for the same key share one [`EndpointState`]; every created
/// session is retained so tests can reach (and kill) earlier ones.
#[derive(Default)]
pub struct MemoryConnector {
    endpoints: DashMap<String, Arc<EndpointState>>,
    sessions: DashMap<String, Vec<Arc<MemoryRemoteFs>>>,
    connect_count: AtomicUsize,
    fail_connect: AtomicBool,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the shared endpoint state for a session key
    pub fn endpoint(&self, key: &str) -> Arc<EndpointState> {
        self.endpoints
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(EndpointState::default()))
            .value()
            .clone()
    }

    /// Every session ever created for the key, oldest first
    pub fn sessions(&self, key: &str) -> Vec<Arc<MemoryRemoteFs>> {
        self.sessions
            .get(key)
            .map(|s| s.value().clone())
            .unwrap_or_default()
    }

    pub fn connect_count(&self) -> usize {
        self.connect_count.load(Ordering::SeqCst)
    }

    pub fn set_fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(
        &self,
        profile: &ConnectionProfile,
    ) -> Result<Arc<dyn RemoteFs>, ConnectionError> {
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(ConnectionError::Failed {
                profile: profile.name.clone(),
                detail: "connection refused".to_string(),
            });
        }

        let key = profile.session_key();
        let session = Arc::new(MemoryRemoteFs::bound(self.endpoint(&key)));
        self.sessions
            .entry(key)
            .or_default()
            .push(Arc::clone(&session));
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        Ok(session)
    }
}
