//! Run-level outcome accumulation
//!
//! Each stage returns a [`RunAggregate`] describing only what it did; the
//! pipeline merges them in stage order. Counts are derived from the lists,
//! so a count can never drift from its list.

use serde::Serialize;

/// Outcome lists collected by a stage or a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunAggregate {
    /// Files written by the export stage
    pub exported_files: Vec<String>,

    /// Files whose export was skipped
    pub skipped_files: Vec<String>,

    /// Files uploaded to the remote directory
    pub uploaded_files: Vec<String>,

    /// Files that failed to upload
    pub failed_files: Vec<String>,

    /// Files relocated to the backup directory after upload
    pub backup_files: Vec<String>,

    /// Human readable error messages, in the order they occurred
    pub errors: Vec<String>,
}

impl RunAggregate {
    /// Create an empty aggregate
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_exported(&mut self, file_name: impl Into<String>) {
        self.exported_files.push(file_name.into());
    }

    pub fn record_skipped(&mut self, file_name: impl Into<String>) {
        self.skipped_files.push(file_name.into());
    }

    pub fn record_uploaded(&mut self, file_name: impl Into<String>) {
        self.uploaded_files.push(file_name.into());
    }

    pub fn record_failed_upload(&mut self, file_name: impl Into<String>) {
        self.failed_files.push(file_name.into());
    }

    pub fn record_backup(&mut self, file_name: impl Into<String>) {
        self.backup_files.push(file_name.into());
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn exported_count(&self) -> usize {
        self.exported_files.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped_files.len()
    }

    pub fn uploaded_count(&self) -> usize {
        self.uploaded_files.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed_files.len()
    }

    pub fn backup_count(&self) -> usize {
        self.backup_files.len()
    }

    /// Whether any error or failed upload was recorded
    pub fn has_failures(&self) -> bool {
        !self.errors.is_empty() || !self.failed_files.is_empty()
    }

    /// Append another aggregate, keeping this one's entries first
    #[must_use]
    pub fn merge(mut self, other: RunAggregate) -> Self {
        self.exported_files.extend(other.exported_files);
        self.skipped_files.extend(other.skipped_files);
        self.uploaded_files.extend(other.uploaded_files);
        self.failed_files.extend(other.failed_files);
        self.backup_files.extend(other.backup_files);
        self.errors.extend(other.errors);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_aggregate_is_empty() {
        let agg = RunAggregate::new();
        assert_eq!(agg.exported_count(), 0);
        assert_eq!(agg.skipped_count(), 0);
        assert!(!agg.has_failures());
    }

    #[test]
    fn test_counts_follow_lists() {
        let mut agg = RunAggregate::new();
        agg.record_exported("a.csv");
        agg.record_exported("b.csv");
        agg.record_skipped("c.csv");
        agg.record_uploaded("a.csv");
        agg.record_failed_upload("b.csv");
        agg.record_backup("a.csv");

        assert_eq!(agg.exported_count(), 2);
        assert_eq!(agg.skipped_count(), 1);
        assert_eq!(agg.uploaded_count(), 1);
        assert_eq!(agg.failed_count(), 1);
        assert_eq!(agg.backup_count(), 1);
        assert!(agg.has_failures());
    }

    #[test]
    fn test_merge_preserves_stage_order() {
        let mut export = RunAggregate::new();
        export.record_exported("orders.csv");
        export.record_error("Failed to export file: items.csv due to database error.");

        let mut transfer = RunAggregate::new();
        transfer.record_uploaded("orders.csv");
        transfer.record_error("Failed to move orders.csv to backup");

        let merged = export.merge(transfer);
        assert_eq!(merged.exported_files, vec!["orders.csv"]);
        assert_eq!(merged.uploaded_files, vec!["orders.csv"]);
        assert_eq!(
            merged.errors,
            vec![
                "Failed to export file: items.csv due to database error.",
                "Failed to move orders.csv to backup",
            ]
        );
    }
}
