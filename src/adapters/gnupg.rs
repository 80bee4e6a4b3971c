//! GnuPG encryption integration
//!
//! Drives the `gpg` executable rather than linking a crypto library, so the
//! keyring, trust database and algorithm choices stay those of the host's
//! GnuPG installation.

use crate::config::EncryptionConfig;
use crate::domain::{PorterError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;

/// Public-key encryption primitive
#[async_trait]
pub trait Encryptor: Send + Sync {
    /// Import a public key and return the fingerprints it provided
    ///
    /// # Errors
    ///
    /// Returns an encryption error if the key file cannot be imported.
    async fn import_key(&self, key_path: &Path) -> Result<Vec<String>>;

    /// Encrypt `source` for `recipient` into `destination`
    ///
    /// # Errors
    ///
    /// Returns an encryption error if encryption fails.
    async fn encrypt_file(&self, recipient: &str, source: &Path, destination: &Path)
        -> Result<()>;
}

/// [`Encryptor`] backed by the `gpg` command line tool
#[derive(Debug, Clone)]
pub struct GnuPg {
    binary: String,
    home: Option<PathBuf>,
}

impl GnuPg {
    pub fn new(binary: impl Into<String>, home: Option<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            home,
        }
    }

    pub fn from_config(config: &EncryptionConfig) -> Self {
        Self::new(
            config.gpg_binary.clone(),
            config.gpg_home.as_ref().map(PathBuf::from),
        )
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--batch");
        if let Some(home) = &self.home {
            cmd.arg("--homedir").arg(home);
        }
        cmd.kill_on_drop(true);
        cmd
    }

    async fn run(&self, mut cmd: Command, action: &str) -> Result<Output> {
        let output = cmd.output().await.map_err(|e| {
            PorterError::Encryption(format!("Failed to run {} for {action}: {e}", self.binary))
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PorterError::Encryption(format!(
                "{action} failed ({}): {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(output)
    }
}

#[async_trait]
impl Encryptor for GnuPg {
    async fn import_key(&self, key_path: &Path) -> Result<Vec<String>> {
        if !key_path.is_file() {
            return Err(PorterError::Encryption(format!(
                "Public key file not found: {}",
                key_path.display()
            )));
        }

        let mut cmd = self.command();
        cmd.args(["--status-fd", "1", "--import"]).arg(key_path);
        let output = self.run(cmd, "key import").await?;

        Ok(parse_import_fingerprints(&String::from_utf8_lossy(
            &output.stdout,
        )))
    }

    async fn encrypt_file(
        &self,
        recipient: &str,
        source: &Path,
        destination: &Path,
    ) -> Result<()> {
        let mut cmd = self.command();
        cmd.args(["--yes", "--trust-model", "always", "--recipient", recipient])
            .arg("--output")
            .arg(destination)
            .arg("--encrypt")
            .arg(source);
        self.run(cmd, "encryption").await?;
        Ok(())
    }
}

/// Collect fingerprints from `IMPORT_OK` status lines, first seen first
fn parse_import_fingerprints(status: &str) -> Vec<String> {
    let mut fingerprints: Vec<String> = Vec::new();
    for line in status.lines() {
        let mut fields = line.split_whitespace();
        if fields.next() != Some("[GNUPG:]") || fields.next() != Some("IMPORT_OK") {
            continue;
        }
        if let Some(fpr) = fields.nth(1) {
            if !fingerprints.iter().any(|f| f == fpr) {
                fingerprints.push(fpr.to_string());
            }
        }
    }
    fingerprints
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_import_fingerprints() {
        let status = "\
[GNUPG:] KEY_CONSIDERED 0A1B2C3D4E5F60718293A4B5C6D7E8F901234567 0
[GNUPG:] IMPORT_OK 1 0A1B2C3D4E5F60718293A4B5C6D7E8F901234567
[GNUPG:] IMPORT_OK 0 0A1B2C3D4E5F60718293A4B5C6D7E8F901234567
[GNUPG:] IMPORT_OK 1 FFFF2C3D4E5F60718293A4B5C6D7E8F90123FFFF
[GNUPG:] IMPORT_RES 2 0 1 0 1 0 0 0 0 0 0 0 0 0 0
";
        assert_eq!(
            parse_import_fingerprints(status),
            vec![
                "0A1B2C3D4E5F60718293A4B5C6D7E8F901234567",
                "FFFF2C3D4E5F60718293A4B5C6D7E8F90123FFFF",
            ]
        );
    }

    #[test]
    fn test_parse_import_without_keys() {
        let status = "[GNUPG:] IMPORT_RES 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0\n";
        assert!(parse_import_fingerprints(status).is_empty());
    }

    #[tokio::test]
    async fn test_import_missing_key_file() {
        let gpg = GnuPg::new("gpg", None);
        let err = gpg
            .import_key(Path::new("/nonexistent/porter/key.asc"))
            .await
            .unwrap_err();
        assert!(matches!(err, PorterError::Encryption(_)));
    }
}
