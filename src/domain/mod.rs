//! Domain models and types for Porter.
//!
//! The domain layer provides:
//! - **Export units** ([`ExportUnitSpec`], [`UnitKind`])
//! - **Artifacts** ([`ExportedArtifact`], [`EncryptedArtifact`], [`FileFormat`])
//! - **Query results** ([`ResultSet`], [`CellValue`])
//! - **Error types** ([`PorterError`]) and the [`Result`] alias
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, PorterError>`]:
//!
//! ```rust
//! use porter::domain::{PorterError, Result};
//!
//! fn example() -> Result<()> {
//!     let config = porter::config::load_config("porter.toml")?;
//!     Ok(())
//! }
//! ```

pub mod artifact;
pub mod errors;
pub mod result;
pub mod rows;
pub mod unit;

// Re-export commonly used types for convenience
pub use artifact::{EncryptedArtifact, ExportedArtifact, FileFormat, ENCRYPTED_SUFFIX};
pub use errors::PorterError;
pub use result::Result;
pub use rows::{CellValue, ResultSet};
pub use unit::{ExportUnitSpec, UnitCatalog, UnitKind};
