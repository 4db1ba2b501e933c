//! sshpanel — remote file panel backend
//!
//! The connection-bookkeeping core behind an editor's remote file tree:
//! saved connection profiles, a pooled SFTP session per endpoint, ordered
//! directory listings, and save-back synchronization of remote files
//! materialized into local temp files. All SSH/SFTP protocol work is
//! delegated to russh / russh-sftp.
//!
//! Construct an [`App`] with a [`config::ProfileStorage`] and a
//! [`sftp::Connector`] (production: [`ssh::RusshConnector`]) and feed it the
//! host editor's events; every failure comes back as a [`Notice`] string
//! for the UI rather than an error that escapes the boundary.

pub mod app;
pub mod config;
pub mod sftp;
pub mod ssh;
pub mod sync;

pub use app::{ssh_terminal_args, App, Notice, Severity};
pub use config::{ConfigError, ConnectionProfile, ProfileStorage, ProfileStore, StorageError};
pub use sftp::{Connector, Entry, FetchError, ListError, RemoteFs, SessionPool, SyncError};
pub use ssh::{ConnectionError, RusshConnector};
pub use sync::{BindingState, SaveOutcome, SyncTracker};
