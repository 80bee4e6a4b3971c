//! Export orchestration
//!
//! - [`writer`] materializes result sets as files
//! - [`unit`] runs a single unit with its skip rule
//! - [`batch`] runs all units in execution order
//! - [`coordinator`] drives a whole run across every stage
//! - [`summary`] reports the outcome

pub mod batch;
pub mod coordinator;
pub mod summary;
pub mod unit;
pub mod writer;

pub use batch::{plan_units, BatchExporter, ExportReport, PlannedUnit};
pub use coordinator::{Collaborators, RunCoordinator};
pub use summary::RunSummary;
pub use unit::{ExistenceCheck, FsExistence, Location, UnitOutcome, UnitTarget};
pub use writer::{export_to_file, ExportOutcome, QuoteStyle, WriteOptions};
