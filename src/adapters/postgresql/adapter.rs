//! PostgreSQL adapter implementing [`SourceClient`]

use crate::adapters::database::traits::SourceClient;
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::models::{
    is_supported, param_refs, quote_ident, row_to_cells, text_param, Param,
};
use crate::config::schema::is_identifier;
use crate::domain::{PorterError, Result, ResultSet};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::path::Path;
use std::sync::Arc;
use tokio_postgres::types::Type;
use tokio_postgres::Statement;

/// PostgreSQL implementation of [`SourceClient`]
pub struct PostgreSQLAdapter {
    client: Arc<PostgreSQLClient>,
}

impl PostgreSQLAdapter {
    /// Create a new PostgreSQL adapter
    pub fn new(client: PostgreSQLClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    fn qualified(&self, name: &str) -> Result<String> {
        if !is_identifier(name) {
            return Err(PorterError::Validation(format!(
                "'{name}' is not a valid procedure or view name"
            )));
        }
        Ok(format!("{}.{}", self.client.schema(), name))
    }

    async fn fetch(&self, statement: &Statement, params: &[Param]) -> Result<ResultSet> {
        let columns = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        let rows = self.client.query(statement, &param_refs(params)).await?;
        let rows = rows
            .iter()
            .map(row_to_cells)
            .collect::<Result<Vec<_>>>()?;
        Ok(ResultSet::new(columns, rows))
    }
}

/// Bind a window bound to whatever date type the procedure declares
fn date_param(ty: &Type, value: Option<NaiveDateTime>) -> Param {
    match *ty {
        Type::DATE => Box::new(value.map(|v| v.date())) as Param,
        Type::TIMESTAMPTZ => Box::new(value.map(|v| v.and_utc())) as Param,
        Type::TEXT | Type::VARCHAR => Box::new(value.map(|v| v.to_string())) as Param,
        _ => Box::new(value) as Param,
    }
}

#[async_trait]
impl SourceClient for PostgreSQLAdapter {
    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn call_procedure(
        &self,
        name: &str,
        output_path: &Path,
        from: Option<NaiveDateTime>,
        to: Option<NaiveDateTime>,
    ) -> Result<ResultSet> {
        let sql = format!("CALL {}($1, $2, $3)", self.qualified(name)?);
        let statement = self.client.prepare(&sql).await?;

        let types = statement.params();
        let [path_ty, from_ty, to_ty] = types else {
            return Err(PorterError::Database(format!(
                "Procedure {name} must take 3 parameters, found {}",
                types.len()
            )));
        };

        let path: Param = match *path_ty {
            Type::TEXT | Type::VARCHAR | Type::BPCHAR => {
                Box::new(output_path.to_string_lossy().into_owned())
            }
            ref other => {
                return Err(PorterError::Database(format!(
                    "Procedure {name} output path parameter has unsupported type {other}"
                )))
            }
        };
        let params = vec![path, date_param(from_ty, from), date_param(to_ty, to)];

        tracing::debug!(procedure = %name, sql = %sql, "Calling procedure");
        self.fetch(&statement, &params).await
    }

    async fn query_view(&self, name: &str) -> Result<ResultSet> {
        let qualified = self.qualified(name)?;
        let sql = format!("SELECT * FROM {qualified}");
        let mut statement = self.client.prepare(&sql).await?;

        // Columns the driver cannot decode are read back as text instead.
        if statement.columns().iter().any(|c| !is_supported(c.type_())) {
            let select_list = statement
                .columns()
                .iter()
                .map(|c| {
                    let ident = quote_ident(c.name());
                    if is_supported(c.type_()) {
                        ident
                    } else {
                        format!("{ident}::text AS {ident}")
                    }
                })
                .collect::<Vec<_>>()
                .join(", ");
            let cast_sql = format!("SELECT {select_list} FROM {qualified}");
            tracing::debug!(view = %name, sql = %cast_sql, "Reading view with text casts");
            statement = self.client.prepare(&cast_sql).await?;
        } else {
            tracing::debug!(view = %name, sql = %sql, "Reading view");
        }

        self.fetch(&statement, &[]).await
    }

    async fn call_with_arguments(&self, name: &str, arguments: &[String]) -> Result<ResultSet> {
        let placeholders = (1..=arguments.len())
            .map(|i| format!("${i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("CALL {}({placeholders})", self.qualified(name)?);
        let statement = self.client.prepare(&sql).await?;

        let params = statement
            .params()
            .iter()
            .zip(arguments)
            .map(|(ty, value)| text_param(ty, value))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(procedure = %name, sql = %sql, "Calling procedure with arguments");
        self.fetch(&statement, &params).await
    }
}
