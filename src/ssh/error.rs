//! Session establishment errors

use thiserror::Error;

/// Failure to establish an authenticated SFTP session.
///
/// Every variant names the profile that triggered the attempt so the UI can
/// report which connection failed. The pool never retries on its own; the
/// next operation against the same endpoint re-attempts the connect.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Cannot resolve address for '{profile}': {detail}")]
    Resolve { profile: String, detail: String },

    #[error("Connection to '{profile}' timed out")]
    Timeout { profile: String },

    #[error("Connection to '{profile}' failed: {detail}")]
    Failed { profile: String, detail: String },

    #[error("Authentication failed for '{profile}': {detail}")]
    AuthFailed { profile: String, detail: String },

    #[error("Invalid private key for '{profile}': {detail}")]
    Key { profile: String, detail: String },

    #[error("'{profile}' has neither a password nor a private key")]
    NoCredentials { profile: String },

    #[error("SFTP subsystem unavailable on '{profile}': {detail}")]
    Subsystem { profile: String, detail: String },
}

impl ConnectionError {
    /// Name of the profile whose connect attempt failed
    pub fn profile(&self) -> &str {
        match self {
            ConnectionError::Resolve { profile, .. }
            | ConnectionError::Timeout { profile }
            | ConnectionError::Failed { profile, .. }
            | ConnectionError::AuthFailed { profile, .. }
            | ConnectionError::Key { profile, .. }
            | ConnectionError::NoCredentials { profile }
            | ConnectionError::Subsystem { profile, .. } => profile,
        }
    }
}
