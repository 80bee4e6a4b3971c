//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Porter using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Porter - scheduled export, encryption and SFTP delivery
#[derive(Parser, Debug)]
#[command(name = "porter")]
#[command(version, about, long_about = None)]
#[command(author = "Porter Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "porter.toml", env = "PORTER_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "PORTER_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export every configured unit, then encrypt, transfer and notify
    Run(commands::run::RunArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Show which files the current window would export or skip
    Status(commands::status::StatusArgs),

    /// Load source queries into the target database and run post-load procedures
    Sync(commands::sync::SyncArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
