//! SFTP transfer integration
//!
//! `ssh2` is a blocking client, so every network call runs on the blocking
//! pool and is awaited before the next one starts.

use crate::config::SftpConfig;
use crate::domain::{PorterError, Result};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use ssh2::{Session, Sftp};
use std::fs::File;
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const SESSION_TIMEOUT_MS: u32 = 30_000;

/// An open transfer session
#[async_trait]
pub trait FileTransfer: Send + Sync {
    /// Upload a local file into the remote directory under `remote_name`
    ///
    /// # Errors
    ///
    /// Returns a transfer error if the upload fails.
    async fn upload(&self, local_path: &Path, remote_name: &str) -> Result<()>;
}

/// Opens transfer sessions
#[async_trait]
pub trait TransferConnector: Send + Sync {
    /// Open a session for one run
    ///
    /// # Errors
    ///
    /// Returns a transfer error if the server cannot be reached or rejects
    /// the credentials.
    async fn connect(&self) -> Result<Box<dyn FileTransfer>>;
}

/// Connects to the configured SFTP server
#[derive(Debug, Clone)]
pub struct SftpConnector {
    config: SftpConfig,
}

impl SftpConnector {
    pub fn new(config: SftpConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TransferConnector for SftpConnector {
    async fn connect(&self) -> Result<Box<dyn FileTransfer>> {
        let config = self.config.clone();
        let remote_directory = config.remote_directory.clone();

        let (session, sftp) = tokio::task::spawn_blocking(move || open_session(&config))
            .await
            .map_err(|e| PorterError::Transfer(format!("SFTP connect task failed: {e}")))??;

        tracing::info!(
            host = %self.config.host,
            port = self.config.port,
            "SFTP connection successful"
        );
        Ok(Box::new(SftpSession {
            _session: session,
            sftp: Arc::new(Mutex::new(sftp)),
            remote_directory,
        }))
    }
}

fn open_session(config: &SftpConfig) -> Result<(Session, Sftp)> {
    let tcp = TcpStream::connect((config.host.as_str(), config.port)).map_err(|e| {
        PorterError::Transfer(format!(
            "Failed to connect to {}:{}: {e}",
            config.host, config.port
        ))
    })?;

    let mut session = Session::new()?;
    session.set_timeout(SESSION_TIMEOUT_MS);
    session.set_tcp_stream(tcp);
    session.handshake()?;

    match config.private_key_path.as_deref().filter(|p| !p.is_empty()) {
        Some(key_path) => {
            let passphrase = config
                .password
                .as_ref()
                .map(|p| AsRef::<str>::as_ref(p.expose_secret()));
            session.userauth_pubkey_file(&config.username, None, Path::new(key_path), passphrase)?;
        }
        None => {
            let password = config
                .password
                .as_ref()
                .map(|p| AsRef::<str>::as_ref(p.expose_secret()))
                .ok_or_else(|| {
                    PorterError::Transfer("Neither password nor private key provided".to_string())
                })?;
            session.userauth_password(&config.username, password)?;
        }
    }

    if !session.authenticated() {
        return Err(PorterError::Transfer(format!(
            "Authentication failed for user {}",
            config.username
        )));
    }

    let sftp = session.sftp()?;
    Ok((session, sftp))
}

/// Remote path for a file inside the remote directory
fn remote_path(remote_directory: &str, name: &str) -> PathBuf {
    let dir = remote_directory.trim_end_matches('/');
    if dir.is_empty() {
        PathBuf::from(format!("/{name}"))
    } else {
        PathBuf::from(format!("{dir}/{name}"))
    }
}

struct SftpSession {
    // Keeps the SSH session alive for as long as the channel is used.
    _session: Session,
    sftp: Arc<Mutex<Sftp>>,
    remote_directory: String,
}

#[async_trait]
impl FileTransfer for SftpSession {
    async fn upload(&self, local_path: &Path, remote_name: &str) -> Result<()> {
        let sftp = Arc::clone(&self.sftp);
        let local_path = local_path.to_path_buf();
        let target = remote_path(&self.remote_directory, remote_name);

        tokio::task::spawn_blocking(move || -> Result<()> {
            let sftp = sftp
                .lock()
                .map_err(|_| PorterError::Transfer("SFTP channel lock poisoned".to_string()))?;
            let mut local = File::open(&local_path)?;
            let mut remote = sftp.create(&target)?;
            std::io::copy(&mut local, &mut remote).map_err(|e| {
                PorterError::Transfer(format!("Failed to write {}: {e}", target.display()))
            })?;
            Ok(())
        })
        .await
        .map_err(|e| PorterError::Transfer(format!("SFTP upload task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_path() {
        assert_eq!(remote_path("/inbound/", "a.csv"), PathBuf::from("/inbound/a.csv"));
        assert_eq!(remote_path("inbound", "a.csv"), PathBuf::from("inbound/a.csv"));
        assert_eq!(remote_path("/", "a.csv"), PathBuf::from("/a.csv"));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let config = SftpConfig {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 1,
            username: "porter".to_string(),
            password: Some(crate::config::secret_string("pw".to_string())),
            private_key_path: None,
            remote_directory: "/inbound".to_string(),
        };
        let result = SftpConnector::new(config).connect().await;
        assert!(matches!(result, Err(PorterError::Transfer(_))));
    }
}
