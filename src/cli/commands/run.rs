//! Run command implementation
//!
//! This module implements the `run` command, which executes the whole
//! export, encryption, transfer and notification pipeline once.

use super::{describe_bound, plan_from_config};
use crate::config::{load_config, PorterConfig};
use crate::core::export::{Collaborators, RunCoordinator, RunSummary};
use crate::domain::PorterError;
use crate::log_error_with_context;
use chrono::Local;
use clap::Args;

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Override the window start (today, today-N, today+N or a date)
    #[arg(long, value_name = "EXPR")]
    pub from: Option<String>,

    /// Override the window end; an empty value means now
    #[arg(long, value_name = "EXPR")]
    pub to: Option<String>,

    /// Report which files would be exported or skipped, and do nothing else
    #[arg(long)]
    pub dry_run: bool,

    /// Do not send the summary email
    #[arg(long)]
    pub no_email: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    /// Execute the run command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting run command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                log_error_with_context!(&e, "Failed to load configuration");
                eprintln!("Configuration error: {e}");
                return Ok(2);
            }
        };
        self.apply_overrides(&mut config);

        if self.dry_run || config.application.dry_run {
            return self.dry_run(&config);
        }

        let mut collaborators = match Collaborators::from_config(&config) {
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

        let coordinator = RunCoordinator::new(config, collaborators);
        let summary = match coordinator.execute(Local::now().naive_local()).await {
            Ok(s) => s,
            Err(e) => {
                log_error_with_context!(&e, "Run aborted");
                eprintln!("Run aborted: {e}");
                return Ok(match e {
                    PorterError::Configuration(_) => 2,
                    _ => 5,
                });
            }
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            print_summary(&summary);
        }

        Ok(exit_code(&summary))
    }

    fn apply_overrides(&self, config: &mut PorterConfig) {
        if let Some(from) = &self.from {
            tracing::info!(from = %from, "Overriding window start from CLI");
            config.export.from_date = from.clone();
        }
        if let Some(to) = &self.to {
            tracing::info!(to = %to, "Overriding window end from CLI");
            config.export.to_date = to.clone();
        }
    }

    fn dry_run(&self, config: &PorterConfig) -> anyhow::Result<i32> {
        tracing::info!("Dry run mode enabled - nothing will be queried or sent");

        let (window, planned) = match plan_from_config(config, Local::now().naive_local()) {
            Ok(p) => p,
            Err(e @ PorterError::Configuration(_)) => {
                eprintln!("Configuration error: {e}");
                return Ok(2);
            }
            Err(e) => {
                log_error_with_context!(&e, "Failed to resolve run window");
                eprintln!("Dry run failed: {e}");
                return Ok(5);
            }
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&planned)?);
            return Ok(0);
        }

        println!("DRY RUN - no queries, uploads or emails");
        println!("  From: {}", describe_bound(&window, true));
        println!("  To:   {}", describe_bound(&window, false));
        println!();
        for unit in &planned {
            let action = match unit.existing {
                Some(location) => format!("skip (exists in {location:?} directory)"),
                None => "export".to_string(),
            };
            println!("  {:<40} {}", unit.target.file_name, action.to_lowercase());
        }
        let to_export = planned.iter().filter(|u| u.existing.is_none()).count();
        println!();
        println!(
            "{} of {} units would be exported",
            to_export,
            planned.len()
        );

        Ok(0)
    }
}

/// Map a finished run to the process exit code
pub fn exit_code(summary: &RunSummary) -> i32 {
    if !summary.source_connected {
        4
    } else if summary.is_successful() {
        0
    } else {
        1
    }
}

fn print_summary(summary: &RunSummary) {
    let aggregate = &summary.aggregate;

    println!();
    println!("Run Summary ({})", summary.run_id);
    println!("  From: {}", describe_bound(&summary.window, true));
    println!("  To:   {}", describe_bound(&summary.window, false));
    println!("  Units: {}", summary.total_units);
    println!("  Exported: {}", aggregate.exported_count());
    for artifact in &summary.artifacts {
        match artifact.row_count {
            Some(rows) => println!("    {} ({rows} rows)", artifact.file_name),
            None => println!("    {}", artifact.file_name),
        }
    }
    println!("  Skipped: {}", aggregate.skipped_count());
    println!("  Encrypted: {}", summary.encrypted_files);
    if summary.transfer_attempted {
        println!("  Uploaded: {}", aggregate.uploaded_count());
        println!("  Moved to backup: {}", aggregate.backup_count());
        println!("  Not uploaded: {}", aggregate.failed_count());
    }
    println!("  Notification: {:?}", summary.notification);
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
    println!();

    if !aggregate.errors.is_empty() {
        println!("Errors encountered:");
        for error in &aggregate.errors {
            println!("  - {error}");
        }
        println!();
    }

    if summary.is_successful() {
        println!("Run completed successfully");
    } else {
        println!("Run completed with failures");
    }
}
