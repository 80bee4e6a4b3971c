//! Database abstraction
//!
//! The export stage only needs two operations from the source: calling a
//! stored procedure with the window parameters and reading a view. Both
//! return a fully materialized [`ResultSet`] so column names are available
//! even when no rows come back.
//!
//! The sync command additionally calls source procedures with configured
//! arguments and writes into a target database through [`TableLoader`].

use crate::domain::{Result, ResultSet};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::path::Path;

/// Query driver used by the export stage
///
/// Implementations must report driver-level failures as
/// [`PorterError::Database`](crate::domain::PorterError::Database) so the
/// export stage can tell them apart from file-system problems.
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Test the database connection
    ///
    /// # Errors
    ///
    /// Returns an error if the connection test fails.
    async fn test_connection(&self) -> Result<()>;

    /// Call a stored procedure with `(output_path, from, to)`
    ///
    /// The procedure may write `output_path` itself. Whatever result set the
    /// call produces is returned.
    ///
    /// # Errors
    ///
    /// Returns a database error if the call fails.
    async fn call_procedure(
        &self,
        name: &str,
        output_path: &Path,
        from: Option<NaiveDateTime>,
        to: Option<NaiveDateTime>,
    ) -> Result<ResultSet>;

    /// Read every row of a view
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    async fn query_view(&self, name: &str) -> Result<ResultSet>;

    /// Call a stored procedure with configured arguments
    ///
    /// Each argument is bound as the type the procedure declares for it.
    ///
    /// # Errors
    ///
    /// Returns a database error if the call fails, and a validation error if
    /// an argument cannot be read as its declared type.
    async fn call_with_arguments(&self, name: &str, arguments: &[String]) -> Result<ResultSet>;
}

/// Opens the source connection for a run
#[async_trait]
pub trait SourceConnector: Send + Sync {
    /// Connect to the source
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be reached.
    async fn connect(&self) -> Result<std::sync::Arc<dyn SourceClient>>;
}

/// Writes synced tables into the target database
#[async_trait]
pub trait TableLoader: Send + Sync {
    /// Replace the contents of `table` with `data`
    ///
    /// The table is created from the result set's columns if it does not
    /// exist, then truncated and refilled inside one transaction. Returns
    /// the number of rows inserted.
    ///
    /// # Errors
    ///
    /// Returns a database error if any statement fails; the transaction is
    /// rolled back and the table keeps its previous contents.
    async fn replace_table(&self, table: &str, data: &ResultSet) -> Result<u64>;

    /// Names of the indexes that already exist on `table`
    ///
    /// # Errors
    ///
    /// Returns a database error if the catalog cannot be read.
    async fn index_names(&self, table: &str) -> Result<Vec<String>>;

    /// Create a single-column index
    ///
    /// # Errors
    ///
    /// Returns a database error if the index cannot be created.
    async fn create_index(&self, table: &str, index: &str, column: &str) -> Result<()>;

    /// Call a procedure in the target database
    ///
    /// # Errors
    ///
    /// Returns a database error if the call fails.
    async fn call_procedure(&self, schema: &str, name: &str, arguments: &[String]) -> Result<()>;
}

/// Opens the target connection for a sync run
#[async_trait]
pub trait TargetConnector: Send + Sync {
    /// Connect to the target
    ///
    /// # Errors
    ///
    /// Returns an error if the target cannot be reached.
    async fn connect(&self) -> Result<std::sync::Arc<dyn TableLoader>>;
}
