//! Database abstraction layer

pub mod factory;
pub mod traits;

pub use factory::{
    create_source_client, create_table_loader, PostgreSQLConnector, PostgreSQLTargetConnector,
};
pub use traits::{SourceClient, SourceConnector, TableLoader, TargetConnector};
