//! Run coordinator - main orchestrator for a pipeline run
//!
//! Resolves the window, exports every unit, optionally encrypts, transfers
//! and finally decides on the summary email. Stages run strictly one after
//! another and hand their results forward as values.

use crate::adapters::database::{PostgreSQLConnector, SourceConnector};
use crate::adapters::gnupg::{Encryptor, GnuPg};
use crate::adapters::sftp::{SftpConnector, TransferConnector};
use crate::adapters::smtp::{Notifier, SmtpNotifier};
use crate::config::PorterConfig;
use crate::core::aggregate::RunAggregate;
use crate::core::encrypt::encrypt_directory;
use crate::core::export::batch::{BatchExporter, ExportReport};
use crate::core::export::summary::RunSummary;
use crate::core::export::unit::{ExistenceCheck, FsExistence};
use crate::core::export::writer::WriteOptions;
use crate::core::notify::{notify, NotificationStatus};
use crate::core::transfer::{transfer_directory, TransferPolicy};
use crate::core::window::{ResolvedWindow, RunWindow};
use crate::domain::{PorterError, Result};
use chrono::NaiveDateTime;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;
use uuid::Uuid;

/// External systems a run talks to
pub struct Collaborators {
    pub source: Arc<dyn SourceConnector>,
    pub encryptor: Arc<dyn Encryptor>,
    pub transfer: Arc<dyn TransferConnector>,

    /// `None` disables notification
    pub notifier: Option<Arc<dyn Notifier>>,

    pub existence: Arc<dyn ExistenceCheck>,
}

impl Collaborators {
    /// Production wiring for a configuration
    ///
    /// # Errors
    ///
    /// Returns a notification error if email is enabled and the SMTP relay
    /// cannot be configured.
    pub fn from_config(config: &PorterConfig) -> Result<Self> {
        let notifier = if config.email.enabled {
            Some(Arc::new(SmtpNotifier::from_config(&config.email)?) as Arc<dyn Notifier>)
        } else {
            None
        };

        Ok(Self {
            source: Arc::new(PostgreSQLConnector::new(config.source.clone())),
            encryptor: Arc::new(GnuPg::from_config(&config.encryption)),
            transfer: Arc::new(SftpConnector::new(config.sftp.clone())),
            notifier,
            existence: Arc::new(FsExistence),
        })
    }

    /// Drop the notifier
    pub fn without_notifier(mut self) -> Self {
        self.notifier = None;
        self
    }
}

/// Run coordinator
pub struct RunCoordinator {
    config: PorterConfig,
    collaborators: Collaborators,
}

impl RunCoordinator {
    /// Create a new run coordinator
    pub fn new(config: PorterConfig, collaborators: Collaborators) -> Self {
        Self {
            config,
            collaborators,
        }
    }

    /// Resolve the configured window against `now`
    ///
    /// # Errors
    ///
    /// Returns a date parse error if either bound cannot be resolved.
    pub fn resolve_window(&self, now: NaiveDateTime) -> Result<ResolvedWindow> {
        RunWindow::from(&self.config.export).resolve(now)
    }

    /// Execute a run
    ///
    /// Every log line of the run carries the run's `run_id`.
    ///
    /// # Errors
    ///
    /// Returns an error only for run-aborting failures: an unresolvable
    /// window, an unusable working directory, or a failed encryption stage.
    /// Per-unit and per-file failures are reported in the summary.
    pub async fn execute(&self, now: NaiveDateTime) -> Result<RunSummary> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("run", run_id = %run_id);
        self.execute_run(run_id, now).instrument(span).await
    }

    async fn execute_run(&self, run_id: Uuid, now: NaiveDateTime) -> Result<RunSummary> {
        let start_time = Instant::now();

        let window = self.resolve_window(now).map_err(|e| {
            tracing::error!(error = %e, "Failed to resolve run window, aborting");
            e
        })?;
        let catalog = self.config.unit_catalog()?;
        let total_units = catalog.total_units();

        tracing::info!(
            from = ?window.from.map(|d| d.at),
            to = %window.to.at,
            units = total_units,
            "Starting run"
        );

        let export_dir = PathBuf::from(&self.config.directories.export_path);
        let backup_dir = PathBuf::from(&self.config.directories.backup_path);
        fs::create_dir_all(&export_dir).map_err(|e| {
            tracing::error!(
                path = %export_dir.display(),
                error = %e,
                "Cannot create export directory"
            );
            PorterError::Io(format!(
                "Failed to create export directory {}: {e}",
                export_dir.display()
            ))
        })?;

        crate::log_stage_start!("export");
        let (report, source_connected) = match self.collaborators.source.connect().await {
            Ok(source) => {
                let exporter = BatchExporter::new(
                    source,
                    Arc::clone(&self.collaborators.existence),
                    WriteOptions::from_config(&self.config.export),
                    export_dir.clone(),
                    backup_dir.clone(),
                );
                (exporter.export(&catalog, &window).await, true)
            }
            Err(e) => {
                tracing::error!(error = %e, "Database connection failed");
                let mut report = ExportReport::new(total_units);
                report.export_succeeded = false;
                report
                    .aggregate
                    .record_error(format!("Database connection failed: {e}"));
                (report, false)
            }
        };
        let export_succeeded = report.export_succeeded;
        let artifacts = report.artifacts;
        let mut aggregate = report.aggregate;

        let encrypted_files = if self.config.encryption.enabled {
            crate::log_stage_start!("encrypt");
            self.encrypt(&export_dir).await?
        } else {
            tracing::debug!("Encryption not required, skipping");
            0
        };

        let transfer_attempted = export_succeeded && self.config.sftp.enabled;
        if transfer_attempted {
            crate::log_stage_start!("transfer");
            let stage = self.transfer(&export_dir, &backup_dir).await;
            aggregate = aggregate.merge(stage);
        } else if self.config.sftp.enabled {
            tracing::warn!("Skipping SFTP transfer because the export stage failed");
        }

        let notification = match &self.collaborators.notifier {
            Some(notifier) => {
                crate::log_stage_start!("notify");
                notify(
                    notifier.as_ref(),
                    &self.config.email,
                    &aggregate,
                    total_units,
                    now.date(),
                )
                .await
            }
            None => NotificationStatus::Disabled,
        };

        let summary = RunSummary {
            run_id,
            window,
            total_units,
            aggregate,
            artifacts,
            source_connected,
            export_succeeded,
            encrypted_files,
            transfer_attempted,
            notification,
            duration: Duration::ZERO,
        }
        .with_duration(start_time.elapsed());
        summary.log_summary();

        Ok(summary)
    }

    async fn encrypt(&self, export_dir: &Path) -> Result<usize> {
        let key_path = self
            .config
            .encryption
            .public_key_path
            .as_deref()
            .ok_or_else(|| {
                PorterError::Configuration("encryption.public_key_path is not set".to_string())
            })?;

        let encrypted = encrypt_directory(
            self.collaborators.encryptor.as_ref(),
            Path::new(key_path),
            export_dir,
            &self.config.export.file_extension(),
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "GPG encryption failed, aborting run");
            e
        })?;

        tracing::info!(count = encrypted.len(), "Encryption completed");
        Ok(encrypted.len())
    }

    async fn transfer(&self, export_dir: &Path, backup_dir: &Path) -> RunAggregate {
        let session = match self.collaborators.transfer.connect().await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(error = %e, "SFTP error");
                let mut aggregate = RunAggregate::new();
                aggregate.record_error(format!("Failed to transfer files over SFTP: {e}"));
                return aggregate;
            }
        };

        let policy = TransferPolicy {
            encrypted: self.config.encryption.enabled,
            extension: self.config.export.file_extension(),
        };
        transfer_directory(session.as_ref(), export_dir, backup_dir, &policy).await
    }
}
