//! Run summary and reporting

use crate::core::aggregate::RunAggregate;
use crate::core::notify::NotificationStatus;
use crate::core::window::ResolvedWindow;
use crate::domain::ExportedArtifact;
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

/// Summary of one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Identifier attached to every log line of the run
    pub run_id: Uuid,

    /// Window the run exported
    pub window: ResolvedWindow,

    /// Units reachable from the execution order
    pub total_units: usize,

    /// Merged outcome of every stage
    pub aggregate: RunAggregate,

    /// Files written by the export stage
    pub artifacts: Vec<ExportedArtifact>,

    /// Whether the source connection could be opened
    pub source_connected: bool,

    /// False if any unit failed with a database error
    pub export_succeeded: bool,

    /// Number of files encrypted
    pub encrypted_files: usize,

    /// Whether the transfer stage ran
    pub transfer_attempted: bool,

    pub notification: NotificationStatus,

    /// Duration of the run
    pub duration: Duration,
}

impl RunSummary {
    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Check if the run completed without any recorded failure
    pub fn is_successful(&self) -> bool {
        self.source_connected && self.export_succeeded && !self.aggregate.has_failures()
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            total = self.total_units,
            exported = self.aggregate.exported_count(),
            skipped = self.aggregate.skipped_count(),
            encrypted = self.encrypted_files,
            uploaded = self.aggregate.uploaded_count(),
            failed = self.aggregate.failed_count(),
            backed_up = self.aggregate.backup_count(),
            notification = ?self.notification,
            duration_secs = self.duration.as_secs(),
            "Run completed"
        );

        if !self.aggregate.errors.is_empty() {
            tracing::warn!(
                error_count = self.aggregate.errors.len(),
                "Run completed with errors"
            );
            for error in &self.aggregate.errors {
                tracing::warn!(message = %error, "Run error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::window::ResolvedDate;
    use chrono::NaiveDate;

    fn summary() -> RunSummary {
        let at = NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        RunSummary {
            run_id: Uuid::new_v4(),
            window: ResolvedWindow {
                from: None,
                to: ResolvedDate::today(at),
                date_format: "%m%d%Y".into(),
                separator: "_".into(),
            },
            total_units: 2,
            aggregate: RunAggregate::new(),
            artifacts: Vec::new(),
            source_connected: true,
            export_succeeded: true,
            encrypted_files: 0,
            transfer_attempted: false,
            notification: NotificationStatus::Disabled,
            duration: Duration::from_secs(0),
        }
    }

    #[test]
    fn test_with_duration() {
        let summary = summary().with_duration(Duration::from_secs(42));
        assert_eq!(summary.duration, Duration::from_secs(42));
    }

    #[test]
    fn test_is_successful() {
        let mut s = summary();
        assert!(s.is_successful());

        s.aggregate.record_failed_upload("a.csv");
        assert!(!s.is_successful());

        let mut s = summary();
        s.export_succeeded = false;
        assert!(!s.is_successful());
    }

    #[test]
    fn test_serializes_to_json() {
        let json = serde_json::to_value(summary()).unwrap();
        assert_eq!(json["total_units"], 2);
        assert_eq!(json["notification"], "disabled");
    }
}
