//! Sync command implementation
//!
//! Loads the configured source queries into the target database, runs the
//! post-load procedures and mails the status message.

use crate::config::{load_config, PorterConfig};
use crate::core::sync::{index_name, SyncCollaborators, SyncReport, SyncRunner};
use crate::log_error_with_context;
use clap::Args;

/// Arguments for the sync command
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// List the tables and indexes the sync would touch, and do nothing else
    #[arg(long)]
    pub dry_run: bool,

    /// Do not send the status email
    #[arg(long)]
    pub no_email: bool,

    /// Print the sync report as JSON
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    /// Execute the sync command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting sync command");

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                log_error_with_context!(&e, "Failed to load configuration");
                eprintln!("Configuration error: {e}");
                return Ok(2);
            }
        };
        if !config.sync.is_configured() {
            eprintln!("Configuration error: no [[sync.queries]] or [[sync.procedures]] declared");
            return Ok(2);
        }

        if self.dry_run || config.application.dry_run {
            print_plan(&config);
            return Ok(0);
        }

        let mut collaborators = match SyncCollaborators::from_config(&config) {
            Ok(c) => c,
            Err(e) => {
                log_error_with_context!(&e, "Failed to set up collaborators");
                eprintln!("Configuration error: {e}");
                return Ok(2);
            }
        };
        if self.no_email {
            tracing::info!("Email notification disabled from CLI");
            collaborators = collaborators.without_notifier();
        }

        let report = SyncRunner::new(&config, collaborators).execute().await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }

        Ok(exit_code(&report))
    }
}

/// Map a finished sync to the process exit code
pub fn exit_code(report: &SyncReport) -> i32 {
    if !report.source_connected || !report.target_connected {
        4
    } else if report.is_successful() {
        0
    } else {
        1
    }
}

fn print_plan(config: &PorterConfig) {
    println!("DRY RUN - no queries, loads or emails");
    for query in &config.sync.queries {
        println!("  {} ({}) -> {}", query.name, query.kind, query.table());
        for column in &query.index_columns {
            println!("    index {}", index_name(&query.index_prefix, column));
        }
    }
    for procedure in &config.sync.procedures {
        println!("  then CALL {}.{}", procedure.schema, procedure.name);
    }
}

fn print_report(report: &SyncReport) {
    println!();
    println!("Sync Summary ({})", report.run_id);
    println!("  Tables loaded: {}", report.tables.len());
    for table in &report.tables {
        println!("    {} ({} rows)", table.table, table.rows);
        for index in &table.indexes_created {
            println!("      + {index}");
        }
    }
    if !report.empty_queries.is_empty() {
        println!("  Empty: {}", report.empty_queries.join(", "));
    }
    if report.dropped_rows > 0 {
        println!("  Dropped rows: {}", report.dropped_rows);
    }
    println!("  Procedures run: {}", report.procedures_run);
    println!("  Notification: {:?}", report.notification);
    println!("  Duration: {:.2}s", report.duration.as_secs_f64());
    println!();

    if !report.errors.is_empty() {
        println!("Errors encountered:");
        for error in &report.errors {
            println!("  - {error}");
        }
        println!();
    }

    match &report.failure {
        Some(failure) => println!("Sync failed: {failure}"),
        None if report.is_successful() => println!("Sync completed successfully"),
        None => println!("Sync completed with failures"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn connected() -> SyncReport {
        let mut report = SyncReport::new(Uuid::new_v4());
        report.source_connected = true;
        report.target_connected = true;
        report
    }

    #[test]
    fn test_exit_code_success() {
        assert_eq!(exit_code(&connected()), 0);
    }

    #[test]
    fn test_exit_code_query_error() {
        let mut report = connected();
        report.errors.push("Query v_stock failed: timeout".into());
        assert_eq!(exit_code(&report), 1);
    }

    #[test]
    fn test_exit_code_procedure_failure() {
        let mut report = connected();
        report.failure = Some("Procedure public.refresh failed".into());
        assert_eq!(exit_code(&report), 1);
    }

    #[test]
    fn test_exit_code_target_unreachable() {
        let mut report = connected();
        report.target_connected = false;
        report.failure = Some("Target database connection failed".into());
        assert_eq!(exit_code(&report), 4);
    }
}
