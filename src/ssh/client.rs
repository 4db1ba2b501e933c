//! SSH/SFTP connector implementation using russh
//!
//! This is the production [`Connector`]: it resolves the endpoint, performs
//! the SSH handshake and authentication, opens the `sftp` subsystem and
//! wraps the result as a [`RemoteFs`]. No protocol logic lives here beyond
//! driving russh / russh-sftp.

use std::net::ToSocketAddrs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::keys::key::PrivateKeyWithHashAlg;
use russh::keys::PublicKey;
use russh::*;
use russh_sftp::client::SftpSession;
use russh_sftp::protocol::OpenFlags;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::error::ConnectionError;
use crate::config::{AuthMethod, ConnectionProfile};
use crate::sftp::error::{FetchError, ListError, SyncError};
use crate::sftp::transport::{Connector, RawEntry, RemoteFs};

/// Default timeout for the whole connect + auth sequence
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Opens russh-backed SFTP sessions from connection profiles
pub struct RusshConnector {
    timeout: Duration,
}

impl RusshConnector {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for RusshConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for RusshConnector {
    async fn connect(
        &self,
        profile: &ConnectionProfile,
    ) -> Result<Arc<dyn RemoteFs>, ConnectionError> {
        let addr = format!("{}:{}", profile.host, profile.port);
        info!("Connecting to SFTP endpoint {} ('{}')", addr, profile.name);

        let socket_addr = addr
            .to_socket_addrs()
            .map_err(|e| ConnectionError::Resolve {
                profile: profile.name.clone(),
                detail: e.to_string(),
            })?
            .next()
            .ok_or_else(|| ConnectionError::Resolve {
                profile: profile.name.clone(),
                detail: "no address found".to_string(),
            })?;

        let ssh_config = client::Config {
            keepalive_interval: Some(Duration::from_secs(30)),
            keepalive_max: 3,
            ..Default::default()
        };

        let handler = PanelHandler {
            host: profile.host.clone(),
            port: profile.port,
        };

        let mut handle = tokio::time::timeout(
            self.timeout,
            client::connect(Arc::new(ssh_config), socket_addr, handler),
        )
        .await
        .map_err(|_| ConnectionError::Timeout {
            profile: profile.name.clone(),
        })?
        .map_err(|e| ConnectionError::Failed {
            profile: profile.name.clone(),
            detail: e.to_string(),
        })?;

        debug!("SSH handshake completed for '{}'", profile.name);

        // Private key takes precedence when a profile carries both credentials
        let authenticated = match profile.auth() {
            AuthMethod::PrivateKey { pem } => {
                let key =
                    russh::keys::decode_secret_key(pem, None).map_err(|e| ConnectionError::Key {
                        profile: profile.name.clone(),
                        detail: e.to_string(),
                    })?;
                let key_with_hash = PrivateKeyWithHashAlg::new(Arc::new(key), None);

                handle
                    .authenticate_publickey(&profile.username, key_with_hash)
                    .await
                    .map_err(|e| ConnectionError::AuthFailed {
                        profile: profile.name.clone(),
                        detail: e.to_string(),
                    })?
            }
            AuthMethod::Password { password } => handle
                .authenticate_password(&profile.username, password)
                .await
                .map_err(|e| ConnectionError::AuthFailed {
                    profile: profile.name.clone(),
                    detail: e.to_string(),
                })?,
            AuthMethod::None => {
                return Err(ConnectionError::NoCredentials {
                    profile: profile.name.clone(),
                })
            }
        };

        if !authenticated.success() {
            return Err(ConnectionError::AuthFailed {
                profile: profile.name.clone(),
                detail: "rejected by server".to_string(),
            });
        }

        info!("SSH authentication successful for '{}'", profile.name);

        let channel =
            handle
                .channel_open_session()
                .await
                .map_err(|e| ConnectionError::Subsystem {
                    profile: profile.name.clone(),
                    detail: e.to_string(),
                })?;
        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(|e| ConnectionError::Subsystem {
                profile: profile.name.clone(),
                detail: e.to_string(),
            })?;

        let sftp = SftpSession::new(channel.into_stream())
            .await
            .map_err(|e| ConnectionError::Subsystem {
                profile: profile.name.clone(),
                detail: e.to_string(),
            })?;

        info!("SFTP subsystem opened for '{}'", profile.name);

        Ok(Arc::new(RusshRemoteFs { handle, sftp }))
    }
}

/// Client handler for russh callbacks.
///
/// The original panel never kept a known_hosts store, so server keys are
/// accepted and logged rather than verified.
struct PanelHandler {
    host: String,
    port: u16,
}

impl client::Handler for PanelHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        debug!(
            "Accepting server key for {}:{} ({})",
            self.host,
            self.port,
            server_public_key.algorithm()
        );
        Ok(true)
    }
}

/// A live russh SFTP session bound to one endpoint
struct RusshRemoteFs {
    handle: client::Handle<PanelHandler>,
    sftp: SftpSession,
}

#[async_trait]
impl RemoteFs for RusshRemoteFs {
    async fn read_dir(&self, path: &str) -> Result<Vec<RawEntry>, ListError> {
        let read_dir = self
            .sftp
            .read_dir(path)
            .await
            .map_err(|e| ListError::Remote {
                path: path.to_string(),
                detail: e.to_string(),
            })?;

        let entries: Vec<RawEntry> = read_dir
            .into_iter()
            .map(|entry| RawEntry {
                is_directory: entry.metadata().is_dir(),
                name: entry.file_name(),
            })
            .collect();

        debug!("Listed {} raw entries in {}", entries.len(), path);
        Ok(entries)
    }

    async fn download(&self, remote_path: &str, local_path: &Path) -> Result<(), FetchError> {
        debug!("Downloading {} to {:?}", remote_path, local_path);

        let mut remote = self
            .sftp
            .open(remote_path)
            .await
            .map_err(|e| FetchError::Remote {
                remote_path: remote_path.to_string(),
                detail: e.to_string(),
            })?;

        let mut local = tokio::fs::File::create(local_path).await?;
        let bytes = tokio::io::copy(&mut remote, &mut local).await?;
        local.flush().await?;

        info!("Downloaded {} ({} bytes)", remote_path, bytes);
        Ok(())
    }

    async fn upload(&self, local_path: &Path, remote_path: &str) -> Result<(), SyncError> {
        debug!("Uploading {:?} to {}", local_path, remote_path);

        let mut local = tokio::fs::File::open(local_path).await?;

        let mut remote = self
            .sftp
            .open_with_flags(
                remote_path,
                OpenFlags::CREATE | OpenFlags::TRUNCATE | OpenFlags::WRITE,
            )
            .await
            .map_err(|e| SyncError::Remote {
                remote_path: remote_path.to_string(),
                detail: e.to_string(),
            })?;

        let bytes = tokio::io::copy(&mut local, &mut remote)
            .await
            .map_err(|e| SyncError::Remote {
                remote_path: remote_path.to_string(),
                detail: e.to_string(),
            })?;
        remote.flush().await.map_err(|e| SyncError::Remote {
            remote_path: remote_path.to_string(),
            detail: e.to_string(),
        })?;
        remote.shutdown().await.map_err(|e| SyncError::Remote {
            remote_path: remote_path.to_string(),
            detail: e.to_string(),
        })?;

        info!("Uploaded {} bytes to {}", bytes, remote_path);
        Ok(())
    }

    async fn is_alive(&self) -> bool {
        // One cheap round-trip; any failure means the session is gone
        self.sftp.canonicalize("/").await.is_ok()
    }

    async fn close(&self) {
        if let Err(e) = self
            .handle
            .disconnect(russh::Disconnect::ByApplication, "Session closed", "en")
            .await
        {
            warn!("Error while disconnecting: {}", e);
        }
    }
}
