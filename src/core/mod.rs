//! Core business logic for Porter.
//!
//! # Modules
//!
//! - [`window`] - Date expression and run window resolution
//! - [`naming`] - Deterministic output file names
//! - [`export`] - Unit execution, batch export and run coordination
//! - [`aggregate`] - Run-level outcome lists
//! - [`encrypt`] - Encryption stage
//! - [`transfer`] - Upload and backup stage
//! - [`notify`] - Notification decision and email composition
//! - [`sync`] - Source-to-target table sync
//!
//! # Run Workflow
//!
//! 1. **Resolve**: turn the window expressions into concrete dates
//! 2. **Export**: run every unit in execution order, skipping units whose
//!    file already exists in the working or backup directory
//! 3. **Encrypt** (optional): encrypt each exported file for the configured key
//! 4. **Transfer** (optional): upload files and move them to backup, only if
//!    no unit hit a database error
//! 5. **Notify** (optional): email a summary when the outcome calls for it
//!
//! # Example
//!
//! ```rust,no_run
//! use porter::config::load_config;
//! use porter::core::export::{Collaborators, RunCoordinator};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("porter.toml")?;
//! let collaborators = Collaborators::from_config(&config)?;
//! let coordinator = RunCoordinator::new(config, collaborators);
//!
//! let summary = coordinator.execute(chrono::Local::now().naive_local()).await?;
//! println!("Exported: {}", summary.aggregate.exported_count());
//! println!("Skipped: {}", summary.aggregate.skipped_count());
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod encrypt;
pub mod export;
pub mod files;
pub mod naming;
pub mod notify;
pub mod sync;
pub mod transfer;
pub mod window;
