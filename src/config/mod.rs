//! Connection configuration
//!
//! Handles the saved connection profiles and their on-disk persistence.

pub mod storage;
pub mod types;

pub use storage::{config_dir, profiles_file, ProfileStorage, StorageError};
pub use types::{AuthMethod, ConfigError, ConnectionProfile, ProfileStore};
