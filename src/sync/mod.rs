//! Local/remote file synchronization

pub mod tracker;

pub use tracker::{BindingState, RemoteFileBinding, SaveOutcome, SyncTracker};
