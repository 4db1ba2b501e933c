//! Transport seam between the pool and the SSH/SFTP library.
//!
//! All protocol work lives behind these two traits. The production
//! implementation drives russh + russh-sftp (`ssh::RusshConnector`); tests
//! use the in-memory implementation in [`crate::sftp::testing`].

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use super::error::{FetchError, ListError, SyncError};
use crate::config::ConnectionProfile;
use crate::ssh::ConnectionError;

/// One raw directory entry as reported by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub name: String,
    pub is_directory: bool,
}

/// An open, authenticated session to one remote endpoint
#[async_trait]
pub trait RemoteFs: Send + Sync {
    /// Fetch the raw entries of a remote directory
    async fn read_dir(&self, path: &str) -> Result<Vec<RawEntry>, ListError>;

    /// Download a remote file to a local path, replacing any existing file
    async fn download(&self, remote_path: &str, local_path: &Path) -> Result<(), FetchError>;

    /// Upload a local file to a remote path, truncating the remote file
    async fn upload(&self, local_path: &Path, remote_path: &str) -> Result<(), SyncError>;

    /// Cheap round-trip probe; false means the session must be discarded
    async fn is_alive(&self) -> bool;

    /// Tear the session down. Errors are ignored; the session is gone either way.
    async fn close(&self);
}

/// Opens authenticated sessions from connection profiles
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        profile: &ConnectionProfile,
    ) -> Result<Arc<dyn RemoteFs>, ConnectionError>;
}
