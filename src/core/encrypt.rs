//! Encryption stage
//!
//! Encrypts every exported file in the working directory for the recipient
//! of the configured public key. The stage fails closed: without a usable
//! key nothing is encrypted and the run stops, so plaintext never goes out
//! when encryption was requested.

use crate::adapters::gnupg::Encryptor;
use crate::core::files::{has_extension, list_files};
use crate::domain::{EncryptedArtifact, PorterError, Result};
use std::path::Path;

/// Encrypt every `*.extension` file in `export_dir`
///
/// Files are processed in name order. Encrypted siblings already produced
/// are left in place when a later file fails.
///
/// # Errors
///
/// Returns an encryption error if the key yields no fingerprint or any file
/// fails to encrypt.
pub async fn encrypt_directory(
    encryptor: &dyn Encryptor,
    key_path: &Path,
    export_dir: &Path,
    extension: &str,
) -> Result<Vec<EncryptedArtifact>> {
    let fingerprints = encryptor.import_key(key_path).await?;
    let Some(recipient) = fingerprints.first() else {
        return Err(PorterError::Encryption(
            "Failed to import public key: no usable keys".to_string(),
        ));
    };
    tracing::info!(
        fingerprints = ?fingerprints,
        recipient = %recipient,
        "Public key imported"
    );

    let files = list_files(export_dir, |name| has_extension(name, extension))?;
    let mut encrypted = Vec::with_capacity(files.len());

    for (name, path) in files {
        let artifact = EncryptedArtifact::for_source(path);
        encryptor
            .encrypt_file(recipient, &artifact.source, &artifact.path)
            .await
            .map_err(|e| {
                tracing::error!(file = %name, error = %e, "Encryption failed");
                PorterError::Encryption(format!("Encryption failed for {name}: {e}"))
            })?;
        tracing::info!(file = %name, output = %artifact.path.display(), "File encrypted");
        encrypted.push(artifact);
    }

    Ok(encrypted)
}
