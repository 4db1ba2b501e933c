//! SFTP operation errors
//!
//! One error type per operation family, matching how failures are reported
//! to the user: listing degrades to an empty view, a failed download aborts
//! the open, a failed upload keeps the binding so the user can retry by
//! saving again. A connection failure inside any operation stays inside that
//! operation's error via the `Connect` variants.

use thiserror::Error;

use crate::ssh::ConnectionError;

/// Directory fetch failed. Non-fatal: the tree shows nothing under the node.
#[derive(Debug, Error)]
pub enum ListError {
    #[error(transparent)]
    Connect(#[from] ConnectionError),

    #[error("Failed to list {path}: {detail}")]
    Remote { path: String, detail: String },
}

/// Remote file download failed. The open aborts and no binding is recorded.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Connect(#[from] ConnectionError),

    #[error("Failed to download {remote_path}: {detail}")]
    Remote { remote_path: String, detail: String },

    #[error("Local IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Upload of a tracked file failed. The binding is retained for retry.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Connect(#[from] ConnectionError),

    #[error("Failed to sync {remote_path}: {detail}")]
    Remote { remote_path: String, detail: String },

    #[error("Local IO error: {0}")]
    Io(#[from] std::io::Error),
}
