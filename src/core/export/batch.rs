//! Batch export across all configured units
//!
//! Categories run in the declared execution order and units in declaration
//! order within their category. Units are independent: a failing unit is
//! recorded and the batch moves on.

use crate::adapters::database::SourceClient;
use crate::core::aggregate::RunAggregate;
use crate::core::export::unit::{
    run_unit, ExistenceCheck, Location, UnitContext, UnitOutcome, UnitTarget,
};
use crate::core::export::writer::WriteOptions;
use crate::core::window::ResolvedWindow;
use crate::domain::{ExportUnitSpec, ExportedArtifact, Result, UnitCatalog};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Result of the export stage
#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    /// Exported and skipped files plus export errors
    pub aggregate: RunAggregate,

    /// Files written during this run, in execution order
    pub artifacts: Vec<ExportedArtifact>,

    /// False if any unit failed with a database error
    pub export_succeeded: bool,

    /// Units reachable from the execution order
    pub total_units: usize,
}

impl ExportReport {
    /// Create an empty report for a batch of `total_units`
    pub fn new(total_units: usize) -> Self {
        Self {
            aggregate: RunAggregate::new(),
            artifacts: Vec::new(),
            export_succeeded: true,
            total_units,
        }
    }

    /// Fold one unit outcome into the report
    pub fn record(&mut self, outcome: UnitOutcome) {
        match outcome {
            UnitOutcome::Exported(artifact) => {
                self.aggregate.record_exported(artifact.file_name.clone());
                self.artifacts.push(artifact);
            }
            UnitOutcome::Skipped { file_name, .. } => {
                self.aggregate.record_skipped(file_name);
            }
            UnitOutcome::Failed { failure, .. } => {
                if failure.database {
                    self.export_succeeded = false;
                }
                self.aggregate.record_error(failure.message);
            }
        }
    }
}

/// Runs every configured unit against one source connection
pub struct BatchExporter {
    source: Arc<dyn SourceClient>,
    existence: Arc<dyn ExistenceCheck>,
    options: WriteOptions,
    export_dir: PathBuf,
    backup_dir: PathBuf,
}

impl BatchExporter {
    /// Create a new batch exporter
    pub fn new(
        source: Arc<dyn SourceClient>,
        existence: Arc<dyn ExistenceCheck>,
        options: WriteOptions,
        export_dir: impl Into<PathBuf>,
        backup_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            existence,
            options,
            export_dir: export_dir.into(),
            backup_dir: backup_dir.into(),
        }
    }

    /// Export every unit of the catalog for `window`
    pub async fn export(&self, catalog: &UnitCatalog, window: &ResolvedWindow) -> ExportReport {
        let mut report = ExportReport::new(catalog.total_units());
        let ctx = UnitContext {
            window,
            export_dir: &self.export_dir,
            backup_dir: &self.backup_dir,
            options: &self.options,
            existence: self.existence.as_ref(),
        };

        for category in catalog.execution_order() {
            let Some(units) = catalog.category(category) else {
                tracing::debug!(category = %category, "Category not configured, skipping");
                continue;
            };

            tracing::info!(category = %category, units = units.len(), "Processing category");
            for spec in units {
                let outcome = run_unit(spec, self.source.as_ref(), &ctx).await;
                report.record(outcome);
            }
        }

        tracing::info!(
            total = report.total_units,
            exported = report.aggregate.exported_count(),
            skipped = report.aggregate.skipped_count(),
            errors = report.aggregate.errors.len(),
            export_succeeded = report.export_succeeded,
            "Export stage completed"
        );
        report
    }
}

/// What a run would do with one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedUnit {
    pub spec: ExportUnitSpec,
    pub target: UnitTarget,

    /// Set when the unit would be skipped
    pub existing: Option<Location>,
}

/// Resolve every unit's target without touching the source
///
/// # Errors
///
/// Fails only if the window's date format cannot render a date.
pub fn plan_units(
    catalog: &UnitCatalog,
    window: &ResolvedWindow,
    extension: &str,
    export_dir: &std::path::Path,
    backup_dir: &std::path::Path,
    existence: &dyn ExistenceCheck,
) -> Result<Vec<PlannedUnit>> {
    catalog
        .units_in_order()
        .into_iter()
        .map(|spec| {
            let target = UnitTarget::resolve(spec, window, extension, export_dir, backup_dir)?;
            let existing = target.existing_location(existence);
            Ok(PlannedUnit {
                spec: spec.clone(),
                target,
                existing,
            })
        })
        .collect()
}
