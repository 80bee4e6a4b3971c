//! Integration tests for logging functionality
//!
//! A global subscriber can be installed only once per process, so only one
//! test here initializes logging.

use porter::config::LoggingConfig;
use porter::logging::init_logging;
use tempfile::TempDir;

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert!(config.local_enabled);
    assert_eq!(config.local_rotation, "daily");
    assert!(!config.local_path.is_empty());
}

#[test]
fn test_invalid_level_is_rejected_before_install() {
    let config = LoggingConfig {
        local_enabled: false,
        ..LoggingConfig::default()
    };

    let err = init_logging("chatty", &config).err().unwrap();
    assert!(err.to_string().contains("Invalid log level"));
}

#[test]
fn test_file_logging_creates_directory_and_writes_json() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("logs");

    let config = LoggingConfig {
        local_enabled: true,
        local_path: log_path.to_string_lossy().to_string(),
        local_rotation: "daily".to_string(),
    };

    // The default filter only admits the library's own target
    std::env::set_var("RUST_LOG", "info");
    let guard = init_logging("info", &config).expect("logging should initialize");
    assert!(log_path.is_dir());

    {
        let span = tracing::info_span!("run", run_id = "test-run");
        let _entered = span.enter();
        tracing::info!(file = "orders_03102025.csv", "File exported");
    }
    // Dropping the guard flushes the non-blocking writer
    drop(guard);

    let entries: Vec<_> = std::fs::read_dir(&log_path)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(entries.len(), 1);
    let name = entries[0].file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("porter.log"));

    let contents = std::fs::read_to_string(&entries[0]).unwrap();
    let line = contents
        .lines()
        .find(|l| l.contains("File exported"))
        .expect("event should be written to the log file");
    let json: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(json["fields"]["file"], "orders_03102025.csv");
    assert_eq!(json["span"]["run_id"], "test-run");
}
