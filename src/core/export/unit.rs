//! Single export unit execution
//!
//! A unit is skipped when its target file already exists in the working or
//! the backup directory. Existence is checked through [`ExistenceCheck`] so
//! the rule can be exercised without a file system.

use crate::adapters::database::SourceClient;
use crate::core::export::writer::{export_to_file, ExportOutcome, WriteOptions};
use crate::core::naming::unit_file_name;
use crate::core::window::ResolvedWindow;
use crate::domain::{ExportUnitSpec, ExportedArtifact, FileFormat, PorterError, Result, UnitKind};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Path existence predicate backing the skip rule
pub trait ExistenceCheck: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
}

/// Checks the real file system
#[derive(Debug, Clone, Copy, Default)]
pub struct FsExistence;

impl ExistenceCheck for FsExistence {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

impl<F> ExistenceCheck for F
where
    F: Fn(&Path) -> bool + Send + Sync,
{
    fn exists(&self, path: &Path) -> bool {
        self(path)
    }
}

/// Where an already-produced file was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    Working,
    Backup,
}

/// Target file of one unit within a window
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitTarget {
    pub file_name: String,
    pub export_path: PathBuf,
    pub backup_path: PathBuf,
}

impl UnitTarget {
    /// Compute the target for `spec` in both directories
    ///
    /// # Errors
    ///
    /// Fails only if the window's date format cannot render a date.
    pub fn resolve(
        spec: &ExportUnitSpec,
        window: &ResolvedWindow,
        extension: &str,
        export_dir: &Path,
        backup_dir: &Path,
    ) -> Result<Self> {
        let file_name = unit_file_name(&spec.prefix, window, extension)?;
        Ok(Self {
            export_path: export_dir.join(&file_name),
            backup_path: backup_dir.join(&file_name),
            file_name,
        })
    }

    /// Where the file already exists, checking the working directory first
    pub fn existing_location(&self, existence: &dyn ExistenceCheck) -> Option<Location> {
        if existence.exists(&self.export_path) {
            Some(Location::Working)
        } else if existence.exists(&self.backup_path) {
            Some(Location::Backup)
        } else {
            None
        }
    }
}

/// Why a unit produced no new file without failing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The target already exists
    AlreadyExists(Location),

    /// The query returned no rows and empty exports are disabled
    EmptyResult,

    /// A procedure ran but did not produce its output file
    NoOutput,
}

/// A recorded unit failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitFailure {
    pub message: String,

    /// Raised by the source database driver
    pub database: bool,
}

impl UnitFailure {
    fn from_error(file_name: &str, error: &PorterError) -> Self {
        if error.is_database() {
            Self {
                message: format!(
                    "Failed to export file: {file_name} due to database error: {error}"
                ),
                database: true,
            }
        } else {
            Self {
                message: format!("Failed to export file: {file_name}: {error}"),
                database: false,
            }
        }
    }
}

/// Outcome of one unit
#[derive(Debug, Clone, PartialEq)]
pub enum UnitOutcome {
    Exported(ExportedArtifact),
    Skipped { file_name: String, reason: SkipReason },
    Failed { file_name: String, failure: UnitFailure },
}

/// Shared inputs for every unit of a run
pub struct UnitContext<'a> {
    pub window: &'a ResolvedWindow,
    pub export_dir: &'a Path,
    pub backup_dir: &'a Path,
    pub options: &'a WriteOptions,
    pub existence: &'a dyn ExistenceCheck,
}

/// Run one unit: skip check, query, materialize
///
/// Never returns an error; every failure is folded into
/// [`UnitOutcome::Failed`].
pub async fn run_unit(
    spec: &ExportUnitSpec,
    source: &dyn SourceClient,
    ctx: &UnitContext<'_>,
) -> UnitOutcome {
    let target = match UnitTarget::resolve(
        spec,
        ctx.window,
        &ctx.options.extension,
        ctx.export_dir,
        ctx.backup_dir,
    ) {
        Ok(target) => target,
        Err(e) => {
            return UnitOutcome::Failed {
                failure: UnitFailure::from_error(&spec.prefix, &e),
                file_name: spec.prefix.clone(),
            }
        }
    };

    if let Some(location) = target.existing_location(ctx.existence) {
        tracing::info!(
            file = %target.file_name,
            location = ?location,
            "File already exists, skipping export"
        );
        return UnitOutcome::Skipped {
            file_name: target.file_name,
            reason: SkipReason::AlreadyExists(location),
        };
    }

    let result = match spec.kind {
        UnitKind::Procedure => run_procedure(spec, source, ctx, &target).await,
        UnitKind::View => run_view(spec, source, ctx, &target).await,
    };

    match result {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(
                file = %target.file_name,
                query = %spec.query_name,
                error = %e,
                "File export error"
            );
            UnitOutcome::Failed {
                failure: UnitFailure::from_error(&target.file_name, &e),
                file_name: target.file_name,
            }
        }
    }
}

async fn run_procedure(
    spec: &ExportUnitSpec,
    source: &dyn SourceClient,
    ctx: &UnitContext<'_>,
    target: &UnitTarget,
) -> Result<UnitOutcome> {
    let result = source
        .call_procedure(
            &spec.query_name,
            &target.export_path,
            ctx.window.from_param(),
            ctx.window.to_param(),
        )
        .await?;

    // The procedure runs even for an unsupported extension; only recording
    // its output fails
    let format: FileFormat = ctx.options.extension.parse()?;

    if format.is_spreadsheet() {
        return materialize(&result, ctx, target, format);
    }

    if ctx.existence.exists(&target.export_path) {
        tracing::info!(
            file = %target.file_name,
            procedure = %spec.query_name,
            "Procedure wrote export file"
        );
        Ok(UnitOutcome::Exported(ExportedArtifact {
            file_name: target.file_name.clone(),
            path: target.export_path.clone(),
            row_count: None,
            format,
        }))
    } else {
        tracing::info!(
            file = %target.file_name,
            procedure = %spec.query_name,
            "Procedure produced no output file"
        );
        Ok(UnitOutcome::Skipped {
            file_name: target.file_name.clone(),
            reason: SkipReason::NoOutput,
        })
    }
}

async fn run_view(
    spec: &ExportUnitSpec,
    source: &dyn SourceClient,
    ctx: &UnitContext<'_>,
    target: &UnitTarget,
) -> Result<UnitOutcome> {
    let format: FileFormat = ctx.options.extension.parse()?;
    let result = source.query_view(&spec.query_name).await?;
    materialize(&result, ctx, target, format)
}

fn materialize(
    result: &crate::domain::ResultSet,
    ctx: &UnitContext<'_>,
    target: &UnitTarget,
    format: FileFormat,
) -> Result<UnitOutcome> {
    match export_to_file(result, &target.export_path, ctx.options) {
        ExportOutcome::Written { rows } => {
            tracing::info!(
                file = %target.file_name,
                rows,
                directory = %ctx.export_dir.display(),
                "File exported"
            );
            Ok(UnitOutcome::Exported(ExportedArtifact {
                file_name: target.file_name.clone(),
                path: target.export_path.clone(),
                row_count: Some(rows),
                format,
            }))
        }
        ExportOutcome::Empty => {
            tracing::info!(
                file = %target.file_name,
                "File was not exported (0 rows and empty exports disabled)"
            );
            Ok(UnitOutcome::Skipped {
                file_name: target.file_name.clone(),
                reason: SkipReason::EmptyResult,
            })
        }
        ExportOutcome::Failed(e) => Err(e),
    }
}
