//! Transfer stage
//!
//! Uploads the working directory's export files and moves each uploaded file
//! to the backup directory. Uploads are isolated per file: one failure is
//! recorded and the stage continues with the next file.

use crate::adapters::sftp::FileTransfer;
use crate::core::aggregate::RunAggregate;
use crate::core::files::{has_extension, list_files, relocate};
use crate::domain::artifact::strip_encrypted_suffix;
use crate::domain::ENCRYPTED_SUFFIX;
use std::fs;
use std::path::Path;

/// Which file variant the stage ships
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPolicy {
    /// Ship encrypted siblings instead of plaintext files
    pub encrypted: bool,

    /// Export extension
    pub extension: String,
}

impl TransferPolicy {
    fn selects(&self, file_name: &str) -> bool {
        if self.encrypted {
            has_extension(file_name, ENCRYPTED_SUFFIX)
        } else {
            has_extension(file_name, &self.extension)
        }
    }
}

/// Upload and back up every selected file in `export_dir`
pub async fn transfer_directory(
    session: &dyn FileTransfer,
    export_dir: &Path,
    backup_dir: &Path,
    policy: &TransferPolicy,
) -> RunAggregate {
    let mut aggregate = RunAggregate::new();

    if let Err(e) = fs::create_dir_all(backup_dir) {
        tracing::error!(
            backup = %backup_dir.display(),
            error = %e,
            "Cannot create backup directory"
        );
        aggregate.record_error(format!(
            "Failed to create backup directory {}: {e}",
            backup_dir.display()
        ));
        return aggregate;
    }

    let files = match list_files(export_dir, |name| policy.selects(name)) {
        Ok(files) => files,
        Err(e) => {
            tracing::error!(error = %e, "SFTP error");
            aggregate.record_error(format!("Error during SFTP file transfer: {e}"));
            return aggregate;
        }
    };

    for (name, path) in files {
        if let Err(e) = session.upload(&path, &name).await {
            tracing::error!(file = %name, error = %e, "File not uploaded over SFTP");
            aggregate.record_failed_upload(name.clone());
            aggregate.record_error(format!("File {name} not uploaded over SFTP: {e}"));
            continue;
        }
        tracing::info!(file = %name, "File uploaded");
        aggregate.record_uploaded(name.clone());

        match relocate(&path, backup_dir) {
            Ok(_) => {
                tracing::info!(file = %name, "File moved to backup");
                aggregate.record_backup(name.clone());
            }
            Err(e) => {
                tracing::error!(file = %name, error = %e, "Failed to move file to backup");
                aggregate.record_error(format!("Failed to move {name} to backup: {e}"));
            }
        }

        if policy.encrypted {
            if let Some(original) = relocate_original(export_dir, backup_dir, &name) {
                aggregate.record_backup(original);
            }
        }
    }

    aggregate
}

/// Move the plaintext companion of an uploaded encrypted file, if present
///
/// Returns the companion's name once it is in the backup directory. A failed
/// move is logged only.
fn relocate_original(export_dir: &Path, backup_dir: &Path, encrypted_name: &str) -> Option<String> {
    let original = strip_encrypted_suffix(encrypted_name)?;
    let original_path = export_dir.join(original);
    if !original_path.exists() {
        return None;
    }
    match relocate(&original_path, backup_dir) {
        Ok(_) => {
            tracing::info!(file = %original, "Original file moved to backup");
            Some(original.to_string())
        }
        Err(e) => {
            tracing::error!(
                file = %original,
                error = %e,
                "Failed to move original file to backup"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PorterError, Result};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeSession {
        reject: HashSet<String>,
        uploaded: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl FileTransfer for FakeSession {
        async fn upload(&self, _local_path: &Path, remote_name: &str) -> Result<()> {
            if self.reject.contains(remote_name) {
                return Err(PorterError::Transfer("permission denied".into()));
            }
            self.uploaded.lock().unwrap().push(remote_name.to_string());
            Ok(())
        }
    }

    fn setup(files: &[&str]) -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        for f in files {
            fs::write(dir.path().join(f), "data").unwrap();
        }
        let backup = dir.path().join("backup");
        (dir, backup)
    }

    fn plain() -> TransferPolicy {
        TransferPolicy {
            encrypted: false,
            extension: "csv".into(),
        }
    }

    #[tokio::test]
    async fn test_upload_failure_is_isolated() {
        let (dir, backup) = setup(&["a.csv", "b.csv"]);
        let session = FakeSession {
            reject: HashSet::from(["a.csv".to_string()]),
            ..Default::default()
        };

        let agg = transfer_directory(&session, dir.path(), &backup, &plain()).await;

        assert_eq!(agg.failed_files, vec!["a.csv"]);
        assert_eq!(agg.uploaded_files, vec!["b.csv"]);
        assert_eq!(agg.backup_files, vec!["b.csv"]);
        assert!(dir.path().join("a.csv").exists());
        assert!(!dir.path().join("b.csv").exists());
        assert!(backup.join("b.csv").exists());
        assert_eq!(agg.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_encrypted_mode_ships_ciphertext_and_moves_original() {
        let (dir, backup) = setup(&["a.csv", "a.csv.gpg", "b.csv"]);
        let session = FakeSession::default();
        let policy = TransferPolicy {
            encrypted: true,
            extension: "csv".into(),
        };

        let agg = transfer_directory(&session, dir.path(), &backup, &policy).await;

        assert_eq!(*session.uploaded.lock().unwrap(), vec!["a.csv.gpg"]);
        assert_eq!(agg.backup_files, vec!["a.csv.gpg", "a.csv"]);
        assert_eq!(agg.backup_count(), 2);
        assert!(agg.errors.is_empty());
        assert!(backup.join("a.csv").exists());
        assert!(backup.join("a.csv.gpg").exists());
        // plaintext without a ciphertext sibling stays put
        assert!(dir.path().join("b.csv").exists());
    }

    #[tokio::test]
    async fn test_plain_mode_ignores_other_extensions() {
        let (dir, backup) = setup(&["a.csv", "a.csv.gpg", "readme.txt"]);
        let session = FakeSession::default();

        let agg = transfer_directory(&session, dir.path(), &backup, &plain()).await;
        assert_eq!(agg.uploaded_files, vec!["a.csv"]);
        assert!(dir.path().join("a.csv.gpg").exists());
    }

    #[tokio::test]
    async fn test_missing_working_directory_is_recorded() {
        let dir = TempDir::new().unwrap();
        let session = FakeSession::default();
        let agg = transfer_directory(
            &session,
            &dir.path().join("missing"),
            &dir.path().join("backup"),
            &plain(),
        )
        .await;
        assert!(agg.errors[0].starts_with("Error during SFTP file transfer"));
    }
}
