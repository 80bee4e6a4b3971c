//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::PorterConfig;
use super::secret::secret_string;
use crate::domain::errors::PorterError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into PorterConfig
/// 4. Applies environment variable overrides (PORTER_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns a configuration error if the file cannot be read or parsed, a
/// referenced environment variable is missing, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use porter::config::loader::load_config;
///
/// let config = load_config("porter.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<PorterConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(PorterError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        PorterError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: PorterConfig = toml::from_str(&contents)?;

    apply_env_overrides(&mut config);

    config.validate().map_err(|e| {
        PorterError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("environment variable pattern is valid")
    })
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are copied through untouched.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = env_var_pattern();
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed_line = processed_line.replace(&format!("${{{var_name}}}"), &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(PorterError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "true" | "1" => Some(true),
        "n" | "no" | "false" | "0" => Some(false),
        _ => None,
    }
}

/// Applies environment variable overrides using PORTER_* prefix
///
/// Environment variables follow the pattern: PORTER_<SECTION>_<KEY>
/// For example: PORTER_EXPORT_FROM_DATE, PORTER_SFTP_PASSWORD
fn apply_env_overrides(config: &mut PorterConfig) {
    // Application overrides
    if let Ok(val) = std::env::var("PORTER_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Some(flag) = std::env::var("PORTER_APPLICATION_DRY_RUN")
        .ok()
        .and_then(|v| parse_flag(&v))
    {
        config.application.dry_run = flag;
    }

    // Directory overrides
    if let Ok(val) = std::env::var("PORTER_DIRECTORIES_EXPORT_PATH") {
        config.directories.export_path = val;
    }
    if let Ok(val) = std::env::var("PORTER_DIRECTORIES_BACKUP_PATH") {
        config.directories.backup_path = val;
    }

    // Source overrides
    if let Ok(val) = std::env::var("PORTER_SOURCE_CONNECTION_STRING") {
        config.source.connection_string = secret_string(val);
    }
    if let Ok(val) = std::env::var("PORTER_SOURCE_SCHEMA") {
        config.source.schema = val;
    }

    // Sync overrides
    if let Ok(val) = std::env::var("PORTER_SYNC_TARGET_CONNECTION_STRING") {
        if let Some(target) = config.sync.target.as_mut() {
            target.connection_string = secret_string(val);
        }
    }

    // Export overrides
    if let Ok(val) = std::env::var("PORTER_EXPORT_FROM_DATE") {
        config.export.from_date = val;
    }
    if let Ok(val) = std::env::var("PORTER_EXPORT_TO_DATE") {
        config.export.to_date = val;
    }
    if let Ok(val) = std::env::var("PORTER_EXPORT_EXTENSION") {
        config.export.extension = val;
    }
    if let Some(flag) = std::env::var("PORTER_EXPORT_ALLOW_EMPTY_EXPORT")
        .ok()
        .and_then(|v| parse_flag(&v))
    {
        config.export.allow_empty_export = flag;
    }

    // Encryption overrides
    if let Some(flag) = std::env::var("PORTER_ENCRYPTION_ENABLED")
        .ok()
        .and_then(|v| parse_flag(&v))
    {
        config.encryption.enabled = flag;
    }
    if let Ok(val) = std::env::var("PORTER_ENCRYPTION_PUBLIC_KEY_PATH") {
        config.encryption.public_key_path = Some(val);
    }

    // SFTP overrides
    if let Some(flag) = std::env::var("PORTER_SFTP_ENABLED")
        .ok()
        .and_then(|v| parse_flag(&v))
    {
        config.sftp.enabled = flag;
    }
    if let Ok(val) = std::env::var("PORTER_SFTP_HOST") {
        config.sftp.host = val;
    }
    if let Ok(val) = std::env::var("PORTER_SFTP_USERNAME") {
        config.sftp.username = val;
    }
    if let Ok(val) = std::env::var("PORTER_SFTP_PASSWORD") {
        config.sftp.password = Some(secret_string(val));
    }
    if let Ok(val) = std::env::var("PORTER_SFTP_PORT") {
        if let Ok(port) = val.parse() {
            config.sftp.port = port;
        }
    }

    // Email overrides
    if let Some(flag) = std::env::var("PORTER_EMAIL_ENABLED")
        .ok()
        .and_then(|v| parse_flag(&v))
    {
        config.email.enabled = flag;
    }
    if let Ok(val) = std::env::var("PORTER_EMAIL_PASSWORD") {
        config.email.password = Some(secret_string(val));
    }
    if let Some(flag) = std::env::var("PORTER_EMAIL_SEND_WHEN_SUCCESSFUL")
        .ok()
        .and_then(|v| parse_flag(&v))
    {
        config.email.send_when_successful = flag;
    }

    // Logging overrides
    if let Some(flag) = std::env::var("PORTER_LOGGING_LOCAL_ENABLED")
        .ok()
        .and_then(|v| parse_flag(&v))
    {
        config.logging.local_enabled = flag;
    }
    if let Ok(val) = std::env::var("PORTER_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
}
