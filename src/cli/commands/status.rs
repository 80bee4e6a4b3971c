//! Status command implementation
//!
//! This module implements the `status` command, which shows for the current
//! window whether each unit's file has already been produced.

use super::{describe_bound, plan_from_config};
use crate::config::load_config;
use crate::core::export::{Location, PlannedUnit};
use crate::domain::PorterError;
use chrono::Local;
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Only show units of this category
    #[arg(long)]
    pub category: Option<String>,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking export status");

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let (window, planned) = match plan_from_config(&config, Local::now().naive_local()) {
            Ok(p) => p,
            Err(e @ PorterError::Configuration(_)) => {
                println!("❌ Invalid configuration");
                println!("   Error: {e}");
                return Ok(2);
            }
            Err(e) => {
                println!("❌ Failed to resolve the run window");
                println!("   Error: {e}");
                return Ok(5);
            }
        };

        let planned: Vec<PlannedUnit> = planned
            .into_iter()
            .filter(|unit| {
                self.category
                    .as_deref()
                    .map(|c| unit.spec.category.eq_ignore_ascii_case(c))
                    .unwrap_or(true)
            })
            .collect();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&planned)?);
            return Ok(0);
        }

        println!("📊 Export Status");
        println!("  From: {}", describe_bound(&window, true));
        println!("  To:   {}", describe_bound(&window, false));
        println!();

        if planned.is_empty() {
            println!("No export units configured.");
            return Ok(0);
        }

        println!("{:<12} {:<40} {:<10} Query", "Category", "File", "State");
        println!("{}", "-".repeat(80));
        for unit in &planned {
            println!(
                "{:<12} {:<40} {:<10} {}",
                unit.spec.category,
                unit.target.file_name,
                state_label(unit.existing),
                unit.spec.query_name
            );
        }
        println!();

        let pending = planned.iter().filter(|u| u.existing.is_none()).count();
        println!(
            "Pending: {}  In working directory: {}  In backup: {}",
            pending,
            count_at(&planned, Location::Working),
            count_at(&planned, Location::Backup)
        );

        Ok(0)
    }
}

fn state_label(existing: Option<Location>) -> &'static str {
    match existing {
        None => "pending",
        Some(Location::Working) => "exported",
        Some(Location::Backup) => "delivered",
    }
}

fn count_at(planned: &[PlannedUnit], location: Location) -> usize {
    planned
        .iter()
        .filter(|u| u.existing == Some(location))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_label() {
        assert_eq!(state_label(None), "pending");
        assert_eq!(state_label(Some(Location::Working)), "exported");
        assert_eq!(state_label(Some(Location::Backup)), "delivered");
    }

    #[tokio::test]
    async fn test_status_missing_config() {
        let args = StatusArgs {
            category: None,
            json: false,
        };
        assert_eq!(args.execute("does-not-exist.toml").await.unwrap(), 2);
    }
}
