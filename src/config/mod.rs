//! Configuration management for Porter.
//!
//! Porter uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `PORTER_*` environment overrides
//! - Default values for optional settings
//! - Validation on load
//!
//! # Example Configuration
//!
//! ```toml
//! [directories]
//! export_path = "/srv/porter/out"
//! backup_path = "/srv/porter/backup"
//!
//! [source]
//! connection_string = "${PORTER_SOURCE_URL}"
//! schema = "dba"
//!
//! [export]
//! execution_order = ["procedures", "views"]
//! from_date = "today-1"
//! to_date = "today"
//!
//! [units.views]
//! orders = "v_orders"
//!
//! [sftp]
//! enabled = "Y"
//! host = "sftp.partner.example"
//! username = "acme"
//! password = "${PORTER_SFTP_PASSWORD}"
//! remote_directory = "/inbound"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::load_config;
pub use schema::{
    ApplicationConfig, DirectoriesConfig, EmailConfig, EncryptionConfig, ExportConfig,
    LoggingConfig, PorterConfig, PostLoadProcedure, SftpConfig, SourceConfig, SyncConfig,
    SyncQueryConfig, SyncTargetConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};
