//! UI event boundary
//!
//! One entry point per discrete editor event: expand a tree node, open a
//! remote file, save or close a document, manage connection profiles. Every
//! error is caught here and converted into a user-visible [`Notice`];
//! nothing below this boundary reaches the host process as a panic or an
//! unhandled error.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::warn;

use crate::config::{ConnectionProfile, ProfileStorage, ProfileStore, StorageError};
use crate::sftp::error::ListError;
use crate::sftp::transport::Connector;
use crate::sftp::{lister, Entry, SessionPool};
use crate::sync::{SaveOutcome, SyncTracker};

/// Severity of a user-facing notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

/// A notification string for the hosting UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

/// Panel backend: profile store, session pool and sync tracker wired
/// together.
///
/// Explicitly constructed (no ambient globals) so tests and hosts can run
/// isolated instances side by side.
pub struct App {
    storage: ProfileStorage,
    profiles: Mutex<ProfileStore>,
    pool: Arc<SessionPool>,
    tracker: SyncTracker,
}

impl App {
    /// Load saved profiles and wire the backend up with the given transport
    pub async fn load(
        storage: ProfileStorage,
        connector: Arc<dyn Connector>,
    ) -> Result<Self, StorageError> {
        let profiles = ProfileStore::new(storage.load().await?);
        let pool = Arc::new(SessionPool::new(connector));
        Ok(Self {
            storage,
            profiles: Mutex::new(profiles),
            tracker: SyncTracker::new(Arc::clone(&pool)),
            pool,
        })
    }

    /// Saved profiles in their user-visible order
    pub async fn profiles(&self) -> Vec<ConnectionProfile> {
        self.profiles.lock().await.profiles().to_vec()
    }

    /// List a remote directory for the tree view.
    ///
    /// Listing failure degrades to an empty node plus an error notice; the
    /// tree itself never crashes.
    pub async fn expand_node(
        &self,
        profile: &ConnectionProfile,
        remote_path: &str,
    ) -> (Vec<Entry>, Option<Notice>) {
        match self.list_dir(profile, remote_path).await {
            Ok(entries) => (entries, None),
            Err(e) => {
                warn!("Listing {} on '{}' failed: {}", remote_path, profile.name, e);
                (Vec::new(), Some(Notice::error(format!("Error listing files: {e}"))))
            }
        }
    }

    async fn list_dir(
        &self,
        profile: &ConnectionProfile,
        remote_path: &str,
    ) -> Result<Vec<Entry>, ListError> {
        let session = self.pool.acquire(profile).await?;
        lister::list(session.as_ref(), remote_path).await
    }

    /// Materialize a remote file for editing and start tracking it
    pub async fn open_file(
        &self,
        profile: &ConnectionProfile,
        remote_path: &str,
    ) -> Result<PathBuf, Notice> {
        self.tracker
            .open_remote(profile, remote_path)
            .await
            .map_err(|e| Notice::error(format!("Error opening file: {e}")))
    }

    /// Route a document save to the remote side when the file is tracked
    pub async fn document_saved(&self, local_path: &Path) -> Option<Notice> {
        match self.tracker.on_local_save(local_path).await {
            Ok(SaveOutcome::Untracked) => None,
            Ok(SaveOutcome::Synced { remote_path }) => {
                Some(Notice::info(format!("Synced to remote: {remote_path}")))
            }
            Err(e) => Some(Notice::error(format!("Failed to sync file: {e}"))),
        }
    }

    /// Drop tracking for a closed document. Unsaved edits are not pushed.
    pub fn document_closed(&self, local_path: &Path) {
        self.tracker.on_local_close(local_path);
    }

    pub async fn add_profile(&self, profile: ConnectionProfile) -> Notice {
        let name = profile.name.clone();
        let mut profiles = self.profiles.lock().await;
        if let Err(e) = profiles.add(profile) {
            return Notice::error(e.to_string());
        }
        match self.persist(&profiles).await {
            Ok(()) => Notice::info(format!("Connection \"{name}\" added!")),
            Err(e) => Notice::error(format!("Failed to save connections: {e}")),
        }
    }

    pub async fn edit_profile(&self, name: &str, updated: ConnectionProfile) -> Notice {
        let new_name = updated.name.clone();
        let mut profiles = self.profiles.lock().await;
        if let Err(e) = profiles.edit(name, updated) {
            return Notice::error(e.to_string());
        }
        match self.persist(&profiles).await {
            Ok(()) => Notice::info(format!("Connection \"{new_name}\" updated!")),
            Err(e) => Notice::error(format!("Failed to save connections: {e}")),
        }
    }

    /// Delete a profile, releasing its pooled session first
    pub async fn delete_profile(&self, name: &str) -> Notice {
        let mut profiles = self.profiles.lock().await;
        let removed = match profiles.remove(name) {
            Ok(p) => p,
            Err(e) => return Notice::error(e.to_string()),
        };
        self.pool.release(&removed).await;
        match self.persist(&profiles).await {
            Ok(()) => Notice::info(format!("Connection \"{name}\" deleted!")),
            Err(e) => Notice::error(format!("Failed to save connections: {e}")),
        }
    }

    /// Close the pooled session for a profile without forgetting the profile
    pub async fn disconnect(&self, profile: &ConnectionProfile) -> Notice {
        self.pool.release(profile).await;
        Notice::info(format!("Disconnected from {}", profile.name))
    }

    async fn persist(&self, profiles: &ProfileStore) -> Result<(), StorageError> {
        self.storage.save(profiles.profiles()).await
    }
}

/// Argument vector for spawning a system `ssh` terminal for a profile
pub fn ssh_terminal_args(profile: &ConnectionProfile) -> Vec<String> {
    vec![
        format!("{}@{}", profile.username, profile.host),
        "-p".to_string(),
        profile.port.to_string(),
    ]
}
