//! Logging and observability
//!
//! Console logging plus an optional rotated JSON log file. Runs open a `run`
//! span carrying a `run_id`, so every line of a run can be correlated.
//!
//! # Example
//!
//! ```no_run
//! use porter::logging::init_logging;
//! use porter::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the start of a pipeline stage
///
/// # Example
///
/// ```no_run
/// use porter::log_stage_start;
///
/// log_stage_start!("transfer");
/// ```
#[macro_export]
macro_rules! log_stage_start {
    ($stage:expr) => {
        tracing::info!(stage = $stage, "Starting stage");
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use porter::log_error_with_context;
/// use porter::domain::PorterError;
///
/// let error = PorterError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}
