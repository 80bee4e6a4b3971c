//! CLI command implementations
//!
//! This module contains all CLI command implementations.

pub mod init;
pub mod run;
pub mod status;
pub mod sync;
pub mod validate;

use crate::config::PorterConfig;
use crate::core::export::{plan_units, FsExistence, PlannedUnit};
use crate::core::window::{ResolvedWindow, RunWindow};
use crate::domain::Result;
use chrono::NaiveDateTime;
use std::path::Path;

/// Resolve the configured window and the target of every unit against the
/// local filesystem, without touching the source
pub(crate) fn plan_from_config(
    config: &PorterConfig,
    now: NaiveDateTime,
) -> Result<(ResolvedWindow, Vec<PlannedUnit>)> {
    let window = RunWindow::from(&config.export).resolve(now)?;
    let catalog = config.unit_catalog()?;
    let planned = plan_units(
        &catalog,
        &window,
        &config.export.file_extension(),
        Path::new(&config.directories.export_path),
        Path::new(&config.directories.backup_path),
        &FsExistence,
    )?;
    Ok((window, planned))
}

/// Render an optional window bound for display
pub(crate) fn describe_bound(window: &ResolvedWindow, from: bool) -> String {
    let bound = if from { window.from } else { Some(window.to) };
    match bound {
        Some(date) if date.is_today => format!("{} (today)", date.at.date()),
        Some(date) => date.at.to_string(),
        None => "unbounded".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    #[test]
    fn test_plan_uses_normalized_extension() {
        let dir = TempDir::new().unwrap();
        let toml = format!(
            r#"
[directories]
export_path = "{out}"
backup_path = "{backup}"

[source]
connection_string = "postgresql://u:p@localhost/db"

[export]
extension = "CSV"
from_date = "today-1"

[units.views]
orders = "v_orders"
"#,
            out = dir.path().join("out").display(),
            backup = dir.path().join("backup").display(),
        );
        let config: PorterConfig = toml::from_str(&toml).unwrap();
        let now = NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();

        let (_, planned) = plan_from_config(&config, now).unwrap();

        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].target.file_name, "orders_03092025_03102025.csv");
        assert!(planned[0].existing.is_none());
    }
}
