//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Porter configuration file.

use crate::adapters::postgresql::client::redact;
use crate::config::load_config;
use clap::Args;
use secrecy::ExposeSecret;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("Validating configuration file: {config_path}");
        println!();

        // Loading also validates
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let catalog = match config.unit_catalog() {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Invalid unit configuration");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Export Directory: {}", config.directories.export_path);
        println!("  Backup Directory: {}", config.directories.backup_path);
        println!(
            "  Source: {} (schema {})",
            redact(config.source.connection_string.expose_secret().as_ref()),
            config.source.schema
        );
        println!(
            "  Window: {:?} .. {:?} ({})",
            config.export.from_date, config.export.to_date, config.export.date_format
        );
        println!("  Extension: {}", config.export.extension);
        println!("  Execution Order: {:?}", catalog.execution_order());
        for category in catalog.execution_order() {
            match catalog.category(category) {
                Some(units) => println!("    {category}: {} unit(s)", units.len()),
                None => println!("    {category}: not configured"),
            }
        }
        println!("  Total Units: {}", catalog.total_units());
        println!("  Encryption: {}", enabled(config.encryption.enabled));
        if config.sftp.enabled {
            println!(
                "  SFTP: {}@{}:{}{}",
                config.sftp.username,
                config.sftp.host,
                config.sftp.port,
                config.sftp.remote_directory
            );
        } else {
            println!("  SFTP: disabled");
        }
        if config.email.enabled {
            println!(
                "  Email: {} -> {}",
                config.email.sender,
                config.email.recipients.join(", ")
            );
        } else {
            println!("  Email: disabled");
        }
        match &config.sync.target {
            Some(target) if config.sync.is_configured() => println!(
                "  Sync: {} query(s), {} procedure(s) into schema {}",
                config.sync.queries.len(),
                config.sync.procedures.len(),
                target.schema
            ),
            _ => println!("  Sync: not configured"),
        }
        println!();
        Ok(0)
    }
}

fn enabled(flag: bool) -> &'static str {
    if flag {
        "enabled"
    } else {
        "disabled"
    }
}
