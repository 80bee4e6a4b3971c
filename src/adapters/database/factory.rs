//! Source and target client factories

use crate::adapters::database::traits::{
    SourceClient, SourceConnector, TableLoader, TargetConnector,
};
use crate::adapters::postgresql::adapter::PostgreSQLAdapter;
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::loader::PostgreSQLLoader;
use crate::config::{SourceConfig, SyncTargetConfig};
use crate::domain::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Connect to the configured source database
///
/// One connection is opened per run and shared by every export unit. The
/// connection is checked with a trivial query before it is handed out.
///
/// # Errors
///
/// Returns an error if the connection string is invalid or the server
/// cannot be reached.
pub async fn create_source_client(config: &SourceConfig) -> Result<Arc<dyn SourceClient>> {
    tracing::info!(
        schema = %config.schema,
        ssl_mode = %config.ssl_mode,
        "Connecting to source database"
    );
    let client = PostgreSQLClient::connect(config).await?;
    let connection = client.connection_string_safe().to_string();

    let source = Arc::new(PostgreSQLAdapter::new(client));
    source.test_connection().await?;
    tracing::info!(connection = %connection, "Source connection verified");

    Ok(source as Arc<dyn SourceClient>)
}

/// [`SourceConnector`] for the configured PostgreSQL source
#[derive(Debug, Clone)]
pub struct PostgreSQLConnector {
    config: SourceConfig,
}

impl PostgreSQLConnector {
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SourceConnector for PostgreSQLConnector {
    async fn connect(&self) -> Result<Arc<dyn SourceClient>> {
        create_source_client(&self.config).await
    }
}

/// Connect to the sync target database
///
/// # Errors
///
/// Returns an error if the connection string is invalid or the server
/// cannot be reached.
pub async fn create_table_loader(config: &SyncTargetConfig) -> Result<Arc<dyn TableLoader>> {
    tracing::info!(
        schema = %config.schema,
        ssl_mode = %config.ssl_mode,
        "Connecting to target database"
    );
    let client = PostgreSQLClient::connect(&config.connection()).await?;
    client.test_connection().await?;
    tracing::info!(
        connection = %client.connection_string_safe(),
        "Target connection verified"
    );

    Ok(Arc::new(PostgreSQLLoader::new(client)) as Arc<dyn TableLoader>)
}

/// [`TargetConnector`] for the configured sync target
#[derive(Debug, Clone)]
pub struct PostgreSQLTargetConnector {
    config: SyncTargetConfig,
}

impl PostgreSQLTargetConnector {
    pub fn new(config: SyncTargetConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TargetConnector for PostgreSQLTargetConnector {
    async fn connect(&self) -> Result<Arc<dyn TableLoader>> {
        create_table_loader(&self.config).await
    }
}
