//! Table sync
//!
//! Copies source views and procedure results into target tables, indexes
//! them, runs the post-load procedures on the target and mails a status
//! message. A failing query is logged and the next one still runs; a failing
//! connection or post-load procedure fails the whole sync.

use crate::adapters::database::{
    PostgreSQLConnector, PostgreSQLTargetConnector, SourceClient, SourceConnector, TableLoader,
    TargetConnector,
};
use crate::adapters::smtp::{EmailMessage, Notifier, SmtpNotifier};
use crate::config::{EmailConfig, PorterConfig, SyncConfig, SyncQueryConfig};
use crate::core::notify::NotificationStatus;
use crate::domain::{PorterError, Result, ResultSet, UnitKind};
use md5::{Digest, Md5};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;
use uuid::Uuid;

/// PostgreSQL truncates identifiers beyond this many bytes
const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Name of the single-column index on `column`
///
/// `<prefix>_<column>_idx`, or, when that exceeds the identifier limit,
/// `<prefix>_<first 20 chars of column>_<6 hex chars of its md5>`. Always
/// lowercase.
pub fn index_name(prefix: &str, column: &str) -> String {
    let base = format!("{prefix}_{column}_idx");
    let name = if base.chars().count() > MAX_IDENTIFIER_LENGTH {
        let digest = format!("{:x}", Md5::digest(base.as_bytes()));
        let head: String = column.chars().take(20).collect();
        format!("{prefix}_{head}_{}", &digest[..6])
    } else {
        base
    };
    name.to_lowercase()
}

/// Remove rows whose width differs from the column count; returns how many
pub fn drop_ragged_rows(data: &mut ResultSet) -> usize {
    let width = data.columns.len();
    let before = data.rows.len();
    data.rows.retain(|row| row.len() == width);
    before - data.rows.len()
}

/// External systems a sync talks to
pub struct SyncCollaborators {
    pub source: Arc<dyn SourceConnector>,
    pub target: Arc<dyn TargetConnector>,

    /// `None` disables the status email
    pub notifier: Option<Arc<dyn Notifier>>,
}

impl SyncCollaborators {
    /// Production wiring for a configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no sync target is configured, and a
    /// notification error if the SMTP relay cannot be configured.
    pub fn from_config(config: &PorterConfig) -> Result<Self> {
        let target = config.sync.target.clone().ok_or_else(|| {
            PorterError::Configuration("No [sync.target] database is configured".to_string())
        })?;
        let notifier = if config.email.enabled {
            Some(Arc::new(SmtpNotifier::from_config(&config.email)?) as Arc<dyn Notifier>)
        } else {
            None
        };

        Ok(Self {
            source: Arc::new(PostgreSQLConnector::new(config.source.clone())),
            target: Arc::new(PostgreSQLTargetConnector::new(target)),
            notifier,
        })
    }

    /// Drop the notifier
    pub fn without_notifier(mut self) -> Self {
        self.notifier = None;
        self
    }
}

/// One loaded table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncedTable {
    pub query: String,
    pub table: String,
    pub rows: u64,
    pub indexes_created: Vec<String>,
}

/// Outcome of a sync
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub run_id: Uuid,

    /// Tables replaced, in query order
    pub tables: Vec<SyncedTable>,

    /// Queries that returned no rows; their tables were left alone
    pub empty_queries: Vec<String>,

    /// Rows dropped because their width did not match the columns
    pub dropped_rows: usize,

    /// Per-query failures; the sync carried on past each of them
    pub errors: Vec<String>,

    /// Post-load procedures that completed
    pub procedures_run: usize,

    pub source_connected: bool,
    pub target_connected: bool,

    /// Failure that ended the sync
    pub failure: Option<String>,

    pub notification: NotificationStatus,
    pub duration: Duration,
}

impl SyncReport {
    /// Report with nothing done yet
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            tables: Vec::new(),
            empty_queries: Vec::new(),
            dropped_rows: 0,
            errors: Vec::new(),
            procedures_run: 0,
            source_connected: false,
            target_connected: false,
            failure: None,
            notification: NotificationStatus::Disabled,
            duration: Duration::ZERO,
        }
    }

    /// No failure and no per-query error
    pub fn is_successful(&self) -> bool {
        self.failure.is_none() && self.errors.is_empty()
    }

    /// Rows loaded across every table
    pub fn rows_loaded(&self) -> u64 {
        self.tables.iter().map(|t| t.rows).sum()
    }

    /// Log the report
    pub fn log_summary(&self) {
        tracing::info!(
            tables = self.tables.len(),
            rows = self.rows_loaded(),
            empty = self.empty_queries.len(),
            procedures = self.procedures_run,
            errors = self.errors.len(),
            notification = ?self.notification,
            duration_ms = self.duration.as_millis() as u64,
            "Sync completed"
        );
        if let Some(failure) = &self.failure {
            tracing::error!(error = %failure, "Sync failed");
        }
    }
}

/// Body of the status email
pub fn compose_sync_body(report: &SyncReport) -> String {
    if let Some(failure) = &report.failure {
        return format!("ETL process failed with error:\n{failure}");
    }
    let mut body = String::from("ETL process completed successfully.");
    if !report.errors.is_empty() {
        body.push_str("\n\nErrors:\n");
        for error in &report.errors {
            let _ = writeln!(body, "{error}");
        }
    }
    body
}

/// Drives one sync from source reads to the status email
pub struct SyncRunner {
    config: SyncConfig,
    email: EmailConfig,
    collaborators: SyncCollaborators,
}

impl SyncRunner {
    pub fn new(config: &PorterConfig, collaborators: SyncCollaborators) -> Self {
        Self {
            config: config.sync.clone(),
            email: config.email.clone(),
            collaborators,
        }
    }

    /// Execute a sync
    ///
    /// Every failure is recorded in the report rather than returned.
    pub async fn execute(&self) -> SyncReport {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("sync", run_id = %run_id);
        self.execute_sync(run_id).instrument(span).await
    }

    async fn execute_sync(&self, run_id: Uuid) -> SyncReport {
        let start_time = Instant::now();
        let mut report = SyncReport::new(run_id);
        tracing::info!(
            queries = self.config.queries.len(),
            procedures = self.config.procedures.len(),
            "Starting sync"
        );

        if let Err(e) = self.load_and_finish(&mut report).await {
            report.failure = Some(e.to_string());
        }

        report.notification = match &self.collaborators.notifier {
            Some(notifier) => {
                crate::log_stage_start!("notify");
                self.notify(notifier.as_ref(), &report).await
            }
            None => NotificationStatus::Disabled,
        };

        report.duration = start_time.elapsed();
        report.log_summary();
        report
    }

    async fn load_and_finish(&self, report: &mut SyncReport) -> Result<()> {
        let source = self.collaborators.source.connect().await.map_err(|e| {
            PorterError::Database(format!("Source database connection failed: {e}"))
        })?;
        report.source_connected = true;
        let target = self.collaborators.target.connect().await.map_err(|e| {
            PorterError::Database(format!("Target database connection failed: {e}"))
        })?;
        report.target_connected = true;

        crate::log_stage_start!("load");
        for query in &self.config.queries {
            if let Err(e) = self
                .sync_query(source.as_ref(), target.as_ref(), query, report)
                .await
            {
                tracing::error!(query = %query.name, error = %e, "Error processing query");
                report
                    .errors
                    .push(format!("Query {} failed: {e}", query.name));
            }
        }

        crate::log_stage_start!("post-load");
        for procedure in &self.config.procedures {
            tracing::info!(
                schema = %procedure.schema,
                procedure = %procedure.name,
                "Running post-load procedure"
            );
            target
                .call_procedure(&procedure.schema, &procedure.name, &procedure.arguments)
                .await
                .map_err(|e| {
                    PorterError::Database(format!(
                        "Procedure {}.{} failed: {e}",
                        procedure.schema, procedure.name
                    ))
                })?;
            report.procedures_run += 1;
        }
        Ok(())
    }

    async fn sync_query(
        &self,
        source: &dyn SourceClient,
        target: &dyn TableLoader,
        query: &SyncQueryConfig,
        report: &mut SyncReport,
    ) -> Result<()> {
        let table = query.table();
        tracing::info!(query = %query.name, table = %table, "Syncing query");

        let mut data = match query.unit_kind() {
            Some(UnitKind::View) => source.query_view(&query.name).await?,
            Some(UnitKind::Procedure) => {
                source
                    .call_with_arguments(&query.name, &query.arguments)
                    .await?
            }
            None => {
                return Err(PorterError::Configuration(format!(
                    "Unknown query type '{}'",
                    query.kind
                )))
            }
        };

        let dropped = drop_ragged_rows(&mut data);
        if dropped > 0 {
            tracing::warn!(
                query = %query.name,
                dropped,
                columns = data.columns.len(),
                "Dropped rows that do not match the column count"
            );
            report.dropped_rows += dropped;
        }

        if data.is_empty() {
            tracing::warn!(query = %query.name, "No data returned, table left unchanged");
            report.empty_queries.push(query.name.clone());
            return Ok(());
        }

        let rows = target.replace_table(table, &data).await?;
        tracing::info!(table = %table, rows, "Table replaced");

        let mut synced = SyncedTable {
            query: query.name.clone(),
            table: table.to_string(),
            rows,
            indexes_created: Vec::new(),
        };
        if !query.index_columns.is_empty() {
            let result = self
                .ensure_indexes(target, query, &data, &mut synced.indexes_created)
                .await;
            report.tables.push(synced);
            return result;
        }
        report.tables.push(synced);
        Ok(())
    }

    /// Create any missing index; existing names are compared without case
    async fn ensure_indexes(
        &self,
        target: &dyn TableLoader,
        query: &SyncQueryConfig,
        data: &ResultSet,
        created: &mut Vec<String>,
    ) -> Result<()> {
        let table = query.table();
        let mut existing: HashSet<String> = target
            .index_names(table)
            .await?
            .into_iter()
            .map(|name| name.to_lowercase())
            .collect();

        for column in &query.index_columns {
            if !data.columns.iter().any(|c| c == column) {
                return Err(PorterError::Validation(format!(
                    "Index column '{column}' is not a column of {table}"
                )));
            }
            let index = index_name(&query.index_prefix, column);
            if existing.contains(&index) {
                tracing::debug!(index = %index, "Index already exists");
                continue;
            }
            target.create_index(table, &index, column).await?;
            tracing::info!(table = %table, index = %index, "Index created");
            existing.insert(index.clone());
            created.push(index);
        }
        Ok(())
    }

    async fn notify(&self, notifier: &dyn Notifier, report: &SyncReport) -> NotificationStatus {
        let message = EmailMessage {
            sender: self.email.sender.clone(),
            recipients: self.email.recipients.clone(),
            subject: self.config.subject.clone(),
            body: compose_sync_body(report),
        };
        match notifier.send(&message).await {
            Ok(()) => NotificationStatus::Sent,
            Err(e) => {
                tracing::error!(error = %e, "Error sending email");
                NotificationStatus::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CellValue;
    use test_case::test_case;

    #[test_case("idx", "sku", "idx_sku_idx"; "short name kept")]
    #[test_case("IDX", "Warehouse", "idx_warehouse_idx"; "lowercased")]
    fn test_index_name_short(prefix: &str, column: &str, expected: &str) {
        assert_eq!(index_name(prefix, column), expected);
    }

    #[test]
    fn test_index_name_long_is_hashed() {
        let column = "a_very_long_column_name_that_pushes_the_index_past_the_limit";
        let base = format!("idx_{column}_idx");
        assert!(base.len() > MAX_IDENTIFIER_LENGTH);

        let digest = format!("{:x}", Md5::digest(base.as_bytes()));
        let name = index_name("idx", column);
        assert_eq!(name, format!("idx_a_very_long_column_n_{}", &digest[..6]));
        assert!(name.len() <= MAX_IDENTIFIER_LENGTH);
    }

    #[test]
    fn test_index_name_at_limit_is_kept() {
        // 4 + 55 + 4 = 63 characters
        let column = "c".repeat(55);
        assert_eq!(index_name("idx", &column), format!("idx_{column}_idx"));
    }

    #[test]
    fn test_drop_ragged_rows() {
        let mut data = ResultSet::new(
            vec!["a".into(), "b".into()],
            vec![
                vec![CellValue::Integer(1), CellValue::Integer(2)],
                vec![CellValue::Integer(3)],
                vec![CellValue::Integer(4), CellValue::Integer(5)],
            ],
        );
        assert_eq!(drop_ragged_rows(&mut data), 1);
        assert_eq!(data.row_count(), 2);
    }

    #[test]
    fn test_sync_body() {
        let mut report = SyncReport::new(Uuid::new_v4());
        assert_eq!(
            compose_sync_body(&report),
            "ETL process completed successfully."
        );

        report.errors.push("Query v_stock failed: timeout".into());
        assert!(compose_sync_body(&report).ends_with("Errors:\nQuery v_stock failed: timeout\n"));

        report.failure = Some("Procedure public.refresh failed: boom".into());
        assert_eq!(
            compose_sync_body(&report),
            "ETL process failed with error:\nProcedure public.refresh failed: boom"
        );
    }
}
