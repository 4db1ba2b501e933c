//! Remote file sync tracker
//!
//! Maps each materialized local temp file back to the (connection, remote
//! path) pair it was pulled from, and routes local saves to the remote side.
//! Save is the only sync trigger: closing a document drops the binding
//! without a final flush.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::ConnectionProfile;
use crate::sftp::error::{FetchError, SyncError};
use crate::sftp::path_utils::local_temp_path;
use crate::sftp::SessionPool;

/// Lifecycle of a tracked file. `Unopened` and `Closed` have no binding,
/// so only the two live states are represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    /// Downloaded to the local temp path, not yet pushed back
    Materialized,
    /// At least one save has been uploaded since materialization
    Synced,
}

/// Association between a local temp file and its remote origin
pub struct RemoteFileBinding {
    profile: ConnectionProfile,
    remote_path: String,
    state: RwLock<BindingState>,
}

impl RemoteFileBinding {
    fn new(profile: ConnectionProfile, remote_path: &str) -> Self {
        Self {
            profile,
            remote_path: remote_path.to_string(),
            state: RwLock::new(BindingState::Materialized),
        }
    }

    pub fn profile(&self) -> &ConnectionProfile {
        &self.profile
    }

    pub fn remote_path(&self) -> &str {
        &self.remote_path
    }

    pub fn state(&self) -> BindingState {
        *self.state.read()
    }
}

/// What a save did, for the UI boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The saved file is not remote-tracked; nothing was uploaded
    Untracked,
    /// Uploaded to the bound remote path
    Synced { remote_path: String },
}

/// Tracks materialized remote files for the lifetime of the process
pub struct SyncTracker {
    pool: Arc<SessionPool>,
    bindings: DashMap<PathBuf, Arc<RemoteFileBinding>>,
    /// Serializes uploads per local path; concurrent saves must never
    /// interleave bytes on the wire. Keyed independently of the bindings
    /// so close-then-reopen cannot hand out a fresh lock while an earlier
    /// upload of the same path is still in flight. Entries are never
    /// recycled; the set of distinct temp paths is small and process-scoped.
    upload_locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl SyncTracker {
    pub fn new(pool: Arc<SessionPool>) -> Self {
        Self {
            pool,
            bindings: DashMap::new(),
            upload_locks: DashMap::new(),
        }
    }

    /// Download a remote file to its deterministic local temp path and
    /// start tracking it.
    ///
    /// Reopening the same remote file reuses the binding (and re-downloads
    /// the content). On download failure no new binding is recorded.
    pub async fn open_remote(
        &self,
        profile: &ConnectionProfile,
        remote_path: &str,
    ) -> Result<PathBuf, FetchError> {
        let session = self.pool.acquire(profile).await?;

        let local_path = local_temp_path(&profile.host, remote_path);
        if let Some(parent) = local_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        session.download(remote_path, &local_path).await?;

        let binding = self
            .bindings
            .entry(local_path.clone())
            .or_insert_with(|| Arc::new(RemoteFileBinding::new(profile.clone(), remote_path)))
            .value()
            .clone();
        // Fresh content on disk, even when the binding already existed
        *binding.state.write() = BindingState::Materialized;

        info!(
            "Opened {} from '{}' at {:?}",
            remote_path, profile.name, local_path
        );
        Ok(local_path)
    }

    /// Push a saved local file to its bound remote path.
    ///
    /// Untracked paths are a no-op. Uploads of the same local path are
    /// serialized; whichever save the lock admits last determines the final
    /// remote content. On failure the binding is retained so the next save
    /// retries.
    pub async fn on_local_save(&self, local_path: &Path) -> Result<SaveOutcome, SyncError> {
        if !self.bindings.contains_key(local_path) {
            return Ok(SaveOutcome::Untracked);
        }

        let lock = self
            .upload_locks
            .entry(local_path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();
        let _serialized = lock.lock().await;

        // Re-resolve after the wait: the document may have been closed (or
        // closed and reopened under a new binding) while an earlier upload
        // of the same path was in flight
        let Some(binding) = self.bindings.get(local_path).map(|b| b.value().clone()) else {
            debug!("Binding for {:?} removed while save was queued", local_path);
            return Ok(SaveOutcome::Untracked);
        };

        let session = self.pool.acquire(&binding.profile).await?;
        match session.upload(local_path, &binding.remote_path).await {
            Ok(()) => {
                *binding.state.write() = BindingState::Synced;
                info!("Synced {:?} to {}", local_path, binding.remote_path);
                Ok(SaveOutcome::Synced {
                    remote_path: binding.remote_path.clone(),
                })
            }
            Err(e) => {
                // Binding stays; the user retries by saving again
                warn!("Sync of {:?} to {} failed: {}", local_path, binding.remote_path, e);
                Err(e)
            }
        }
    }

    /// Stop tracking a closed document. Unsaved edits are not flushed.
    pub fn on_local_close(&self, local_path: &Path) {
        if self.bindings.remove(local_path).is_some() {
            debug!("Stopped tracking {:?}", local_path);
        }
    }

    /// The binding for a local path, if it is tracked
    pub fn binding(&self, local_path: &Path) -> Option<Arc<RemoteFileBinding>> {
        self.bindings.get(local_path).map(|b| b.value().clone())
    }

    pub fn is_tracked(&self, local_path: &Path) -> bool {
        self.bindings.contains_key(local_path)
    }

    pub fn tracked_count(&self) -> usize {
        self.bindings.len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::sftp::testing::MemoryConnector;

    fn profile(host: &str) -> ConnectionProfile {
        ConnectionProfile {
            name: format!("dev-{host}"),
            host: host.to_string(),
            port: 22,
            username: "alice".to_string(),
            password: Some("x".to_string()),
            private_key: None,
        }
    }

    fn tracker() -> (Arc<MemoryConnector>, SyncTracker) {
        let connector = Arc::new(MemoryConnector::new());
        let pool = Arc::new(SessionPool::new(connector.clone()));
        (connector, SyncTracker::new(pool))
    }

    #[tokio::test]
    async fn open_then_save_uploads_once_to_bound_path() {
        let (connector, tracker) = tracker();
        let dev = profile("track-a");
        let endpoint = connector.endpoint("track-a:22");
        endpoint.insert_file("/readme.txt", b"hello");

        let local = tracker.open_remote(&dev, "/readme.txt").await.unwrap();
        assert_eq!(tokio::fs::read(&local).await.unwrap(), b"hello");
        let binding = tracker.binding(&local).unwrap();
        assert_eq!(binding.state(), BindingState::Materialized);
        assert_eq!(binding.remote_path(), "/readme.txt");

        tokio::fs::write(&local, b"edited").await.unwrap();
        let outcome = tracker.on_local_save(&local).await.unwrap();
        assert_eq!(
            outcome,
            SaveOutcome::Synced {
                remote_path: "/readme.txt".to_string()
            }
        );
        assert_eq!(endpoint.uploads(), 1);
        assert_eq!(endpoint.file("/readme.txt").unwrap(), b"edited");
        assert_eq!(binding.state(), BindingState::Synced);
    }

    #[tokio::test]
    async fn unmodified_round_trip_leaves_remote_content_unchanged() {
        let (connector, tracker) = tracker();
        let dev = profile("track-rt");
        let endpoint = connector.endpoint("track-rt:22");
        endpoint.insert_file("/a/b.txt", b"stable");
        endpoint.insert_dir("/a");

        let local = tracker.open_remote(&dev, "/a/b.txt").await.unwrap();
        tracker.on_local_save(&local).await.unwrap();

        // The transfer still occurred, the bytes did not change
        assert_eq!(endpoint.uploads(), 1);
        assert_eq!(endpoint.file("/a/b.txt").unwrap(), b"stable");
    }

    #[tokio::test]
    async fn save_of_untracked_path_is_a_noop() {
        let (connector, tracker) = tracker();
        let scratch = tempfile::tempdir().unwrap();
        let local = scratch.path().join("notes.txt");
        tokio::fs::write(&local, b"local only").await.unwrap();

        let outcome = tracker.on_local_save(&local).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Untracked);
        assert_eq!(connector.connect_count(), 0);
    }

    #[tokio::test]
    async fn save_after_close_attempts_no_upload() {
        let (connector, tracker) = tracker();
        let dev = profile("track-b");
        let endpoint = connector.endpoint("track-b:22");
        endpoint.insert_file("/readme.txt", b"hello");

        let local = tracker.open_remote(&dev, "/readme.txt").await.unwrap();
        tracker.on_local_close(&local);
        assert!(!tracker.is_tracked(&local));

        let outcome = tracker.on_local_save(&local).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Untracked);
        assert_eq!(endpoint.uploads(), 0);
    }

    #[tokio::test]
    async fn failed_upload_keeps_binding_for_retry() {
        let (connector, tracker) = tracker();
        let dev = profile("track-c");
        let endpoint = connector.endpoint("track-c:22");
        endpoint.insert_file("/cfg", b"v1");

        let local = tracker.open_remote(&dev, "/cfg").await.unwrap();
        tokio::fs::write(&local, b"v2").await.unwrap();

        endpoint.set_fail_uploads(true);
        let err = tracker.on_local_save(&local).await.unwrap_err();
        assert!(matches!(err, SyncError::Remote { .. }));
        assert!(tracker.is_tracked(&local));
        assert_eq!(endpoint.file("/cfg").unwrap(), b"v1");

        // Retry via another save succeeds
        endpoint.set_fail_uploads(false);
        tracker.on_local_save(&local).await.unwrap();
        assert_eq!(endpoint.file("/cfg").unwrap(), b"v2");
    }

    #[tokio::test]
    async fn failed_download_records_no_binding() {
        let (_, tracker) = tracker();
        let dev = profile("track-d");

        let err = tracker.open_remote(&dev, "/missing").await.unwrap_err();
        assert!(matches!(err, FetchError::Remote { .. }));
        assert_eq!(tracker.tracked_count(), 0);
    }

    #[tokio::test]
    async fn reopening_reuses_the_binding_and_redownloads() {
        let (connector, tracker) = tracker();
        let dev = profile("track-e");
        let endpoint = connector.endpoint("track-e:22");
        endpoint.insert_file("/readme.txt", b"v1");

        let first = tracker.open_remote(&dev, "/readme.txt").await.unwrap();
        let binding = tracker.binding(&first).unwrap();
        tokio::fs::write(&first, b"local edit").await.unwrap();
        tracker.on_local_save(&first).await.unwrap();
        assert_eq!(binding.state(), BindingState::Synced);

        endpoint.insert_file("/readme.txt", b"v2");
        let second = tracker.open_remote(&dev, "/readme.txt").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(tracker.tracked_count(), 1);
        assert_eq!(tokio::fs::read(&second).await.unwrap(), b"v2");
        assert!(Arc::ptr_eq(&binding, &tracker.binding(&second).unwrap()));
        assert_eq!(binding.state(), BindingState::Materialized);
    }

    #[tokio::test]
    async fn concurrent_saves_of_one_path_are_serialized() {
        let (connector, tracker) = tracker();
        let dev = profile("track-f");
        let endpoint = connector.endpoint("track-f:22");
        endpoint.insert_file("/doc.md", b"base");
        endpoint.set_upload_delay(Duration::from_millis(40));

        let local = tracker.open_remote(&dev, "/doc.md").await.unwrap();
        tokio::fs::write(&local, b"final").await.unwrap();

        let (a, b) = tokio::join!(tracker.on_local_save(&local), tracker.on_local_save(&local));
        a.unwrap();
        b.unwrap();

        assert_eq!(endpoint.uploads(), 2);
        // Never more than one upload of this path on the wire at a time
        assert_eq!(endpoint.max_in_flight_uploads(), 1);
        assert_eq!(endpoint.file("/doc.md").unwrap(), b"final");
    }

    #[tokio::test]
    async fn saves_stay_serialized_across_close_and_reopen() {
        let (connector, tracker) = tracker();
        let tracker = Arc::new(tracker);
        let dev = profile("track-g");
        let endpoint = connector.endpoint("track-g:22");
        endpoint.insert_file("/doc.md", b"base");
        endpoint.set_upload_delay(Duration::from_millis(80));

        let local = tracker.open_remote(&dev, "/doc.md").await.unwrap();
        tokio::fs::write(&local, b"first").await.unwrap();

        let bg = {
            let tracker = Arc::clone(&tracker);
            let local = local.clone();
            tokio::spawn(async move { tracker.on_local_save(&local).await })
        };
        // Let the first upload get onto the wire
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Closing and reopening must not hand the next save a fresh lock
        tracker.on_local_close(&local);
        let reopened = tracker.open_remote(&dev, "/doc.md").await.unwrap();
        assert_eq!(reopened, local);
        tokio::fs::write(&local, b"second").await.unwrap();
        tracker.on_local_save(&local).await.unwrap();

        bg.await.unwrap().unwrap();
        assert_eq!(endpoint.uploads(), 2);
        assert_eq!(endpoint.max_in_flight_uploads(), 1);
        assert_eq!(endpoint.file("/doc.md").unwrap(), b"second");
    }
}
