//! SSH transport layer
//!
//! Session establishment and the russh-backed transport implementation.
//! Everything protocol-level is delegated to russh / russh-sftp.

pub mod client;
pub mod error;

pub use client::RusshConnector;
pub use error::ConnectionError;
