// Porter - Database export, encryption and SFTP delivery
// Copyright (c) 2025 Porter Contributors
// Licensed under the MIT License

//! # Porter - Database Export and Delivery
//!
//! Porter is a scheduled batch tool that exports stored procedures and views
//! from a PostgreSQL database to files, optionally encrypts them with GnuPG,
//! delivers them over SFTP and reports the outcome by email.
//!
//! ## Overview
//!
//! A run:
//! - **Resolves** a date window from expressions such as `today-1`
//! - **Exports** every configured unit to a deterministically named file
//! - **Skips** units whose file already exists in the working or backup
//!   directory, so re-running the same window is safe
//! - **Encrypts** exported files for a partner's public key
//! - **Transfers** files over SFTP and moves them to a backup directory
//! - **Notifies** recipients with a plain-text summary
//!
//! Separately, `porter sync` copies source views and procedure results into
//! tables of a reporting database and runs post-load procedures there.
//!
//! ## Architecture
//!
//! Porter follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Pipeline stages and run coordination
//! - [`adapters`] - External integrations (PostgreSQL, GnuPG, SFTP, SMTP)
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use porter::config::load_config;
//! use porter::core::export::{Collaborators, RunCoordinator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("porter.toml")?;
//!     let collaborators = Collaborators::from_config(&config)?;
//!     let coordinator = RunCoordinator::new(config, collaborators);
//!
//!     let summary = coordinator.execute(chrono::Local::now().naive_local()).await?;
//!     println!("Exported {} files", summary.aggregate.exported_count());
//!     Ok(())
//! }
//! ```
//!
//! ## File Naming
//!
//! File names are built from the unit prefix and the rendered window bounds:
//!
//! ```rust
//! use porter::core::naming::unit_file_name;
//! use porter::core::window::RunWindow;
//! use chrono::NaiveDate;
//!
//! let now = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap().and_hms_opt(6, 0, 0).unwrap();
//! let window = RunWindow::new("today-1", "today", "%m%d%Y", "_").resolve(now).unwrap();
//! let name = unit_file_name("orders", &window, "csv").unwrap();
//! assert_eq!(name, "orders_03092025_03102025.csv");
//! ```
//!
//! ## Error Handling
//!
//! Porter uses the [`domain::PorterError`] type for all errors. Only
//! run-aborting failures are returned as errors; per-unit and per-file
//! failures are recorded in the run summary.
//!
//! ```rust,no_run
//! use porter::domain::PorterError;
//!
//! fn example() -> Result<(), PorterError> {
//!     let config = porter::config::load_config("porter.toml")?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
