//! PostgreSQL sync target implementing [`TableLoader`]
//!
//! A load creates the table from the result set's columns when it is
//! missing, truncates it and inserts every row, all inside one transaction.
//! Values travel as text and are cast server-side to the column type, so a
//! single prepared insert covers every row.

use crate::adapters::database::traits::TableLoader;
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::models::{param_refs, quote_ident, text_param};
use crate::config::schema::is_identifier;
use crate::domain::{CellValue, PorterError, Result, ResultSet};
use async_trait::async_trait;
use tokio_postgres::types::ToSql;

/// Column type of a created table, inferred from the loaded values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Boolean,
    BigInt,
    Double,
    Timestamp,
    Date,
    Text,
}

impl ColumnType {
    pub fn sql(self) -> &'static str {
        match self {
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Double => "DOUBLE PRECISION",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::Date => "DATE",
            ColumnType::Text => "TEXT",
        }
    }

    /// Narrowest type that holds every non-null value; `TEXT` when all are null
    pub fn infer<'a>(cells: impl IntoIterator<Item = &'a CellValue>) -> Self {
        cells
            .into_iter()
            .filter_map(Self::of)
            .reduce(Self::widen)
            .unwrap_or(ColumnType::Text)
    }

    fn of(cell: &CellValue) -> Option<Self> {
        match cell {
            CellValue::Null => None,
            CellValue::Bool(_) => Some(ColumnType::Boolean),
            CellValue::Integer(_) => Some(ColumnType::BigInt),
            CellValue::Float(_) => Some(ColumnType::Double),
            CellValue::Timestamp(_) => Some(ColumnType::Timestamp),
            CellValue::Date(_) => Some(ColumnType::Date),
            CellValue::Text(_) => Some(ColumnType::Text),
        }
    }

    fn widen(self, other: Self) -> Self {
        use ColumnType::*;
        match (self, other) {
            (a, b) if a == b => a,
            (BigInt, Double) | (Double, BigInt) => Double,
            (Date, Timestamp) | (Timestamp, Date) => Timestamp,
            _ => Text,
        }
    }
}

/// Statements that replace one table's contents, in execution order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLoadPlan {
    pub create: String,
    pub truncate: String,
    pub insert: String,
}

impl TableLoadPlan {
    /// Build the statements for loading `data` into `schema.table`
    ///
    /// # Errors
    ///
    /// Returns a validation error for a result set without columns.
    pub fn new(schema: &str, table: &str, data: &ResultSet) -> Result<Self> {
        if data.columns.is_empty() {
            return Err(PorterError::Validation(format!(
                "Cannot load {table}: the result has no columns"
            )));
        }

        let qualified = format!("{}.{}", quote_ident(schema), quote_ident(table));
        let types: Vec<ColumnType> = (0..data.columns.len())
            .map(|idx| ColumnType::infer(data.rows.iter().filter_map(|row| row.get(idx))))
            .collect();

        let definitions = data
            .columns
            .iter()
            .zip(&types)
            .map(|(name, ty)| format!("{} {}", quote_ident(name), ty.sql()))
            .collect::<Vec<_>>()
            .join(", ");
        let column_list = data
            .columns
            .iter()
            .map(|name| quote_ident(name))
            .collect::<Vec<_>>()
            .join(", ");
        let values = types
            .iter()
            .enumerate()
            .map(|(idx, ty)| match ty {
                ColumnType::Text => format!("${}::text", idx + 1),
                other => format!("${}::text::{}", idx + 1, other.sql()),
            })
            .collect::<Vec<_>>()
            .join(", ");

        Ok(Self {
            create: format!("CREATE TABLE IF NOT EXISTS {qualified} ({definitions})"),
            truncate: format!("TRUNCATE TABLE {qualified}"),
            insert: format!("INSERT INTO {qualified} ({column_list}) VALUES ({values})"),
        })
    }
}

/// Text form of a cell as the insert binds it; `None` for NULL
pub fn cell_text(cell: &CellValue) -> Option<String> {
    match cell {
        CellValue::Null => None,
        CellValue::Timestamp(ts) => Some(ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        CellValue::Float(v) if v.is_infinite() => {
            Some(if *v > 0.0 { "Infinity" } else { "-Infinity" }.to_string())
        }
        other => Some(other.to_string()),
    }
}

/// PostgreSQL implementation of [`TableLoader`]
pub struct PostgreSQLLoader {
    client: PostgreSQLClient,
}

impl PostgreSQLLoader {
    pub fn new(client: PostgreSQLClient) -> Self {
        Self { client }
    }

    async fn load(&self, plan: &TableLoadPlan, data: &ResultSet) -> Result<u64> {
        self.client.batch_execute(&plan.create).await?;
        self.client.batch_execute(&plan.truncate).await?;

        let statement = self.client.prepare(&plan.insert).await?;
        let mut inserted = 0;
        for row in &data.rows {
            let values: Vec<Option<String>> = row.iter().map(cell_text).collect();
            let refs: Vec<&(dyn ToSql + Sync)> = values
                .iter()
                .map(|v| v as &(dyn ToSql + Sync))
                .collect();
            inserted += self.client.execute(&statement, &refs).await?;
        }
        Ok(inserted)
    }
}

#[async_trait]
impl TableLoader for PostgreSQLLoader {
    async fn replace_table(&self, table: &str, data: &ResultSet) -> Result<u64> {
        let plan = TableLoadPlan::new(self.client.schema(), table, data)?;
        tracing::debug!(table = %table, create = %plan.create, "Loading table");

        self.client.batch_execute("BEGIN").await?;
        match self.load(&plan, data).await {
            Ok(inserted) => {
                self.client.batch_execute("COMMIT").await?;
                Ok(inserted)
            }
            Err(e) => {
                if let Err(rollback) = self.client.batch_execute("ROLLBACK").await {
                    tracing::warn!(table = %table, error = %rollback, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn index_names(&self, table: &str) -> Result<Vec<String>> {
        let statement = self
            .client
            .prepare("SELECT indexname FROM pg_indexes WHERE schemaname = $1 AND tablename = $2")
            .await?;
        let schema = self.client.schema().to_string();
        let table = table.to_string();
        let rows = self.client.query(&statement, &[&schema, &table]).await?;
        rows.iter()
            .map(|row| {
                row.try_get::<_, String>(0)
                    .map_err(|e| PorterError::Database(format!("Failed to read index name: {e}")))
            })
            .collect()
    }

    async fn create_index(&self, table: &str, index: &str, column: &str) -> Result<()> {
        let sql = format!(
            "CREATE INDEX {} ON {}.{} ({})",
            quote_ident(index),
            quote_ident(self.client.schema()),
            quote_ident(table),
            quote_ident(column)
        );
        tracing::debug!(sql = %sql, "Creating index");
        self.client.batch_execute(&sql).await
    }

    async fn call_procedure(&self, schema: &str, name: &str, arguments: &[String]) -> Result<()> {
        if !is_identifier(schema) || !is_identifier(name) {
            return Err(PorterError::Validation(format!(
                "'{schema}.{name}' is not a valid procedure name"
            )));
        }
        let placeholders = (1..=arguments.len())
            .map(|i| format!("${i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("CALL {schema}.{name}({placeholders})");
        let statement = self.client.prepare(&sql).await?;

        let params = statement
            .params()
            .iter()
            .zip(arguments)
            .map(|(ty, value)| text_param(ty, value))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(procedure = %name, sql = %sql, "Calling target procedure");
        self.client.execute(&statement, &param_refs(&params)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use test_case::test_case;

    fn stock() -> ResultSet {
        ResultSet::new(
            vec!["sku".to_string(), "qty".to_string(), "counted_at".to_string()],
            vec![
                vec![
                    CellValue::from("A-1"),
                    CellValue::Integer(4),
                    CellValue::Null,
                ],
                vec![
                    CellValue::from("B-2"),
                    CellValue::Float(2.5),
                    CellValue::Date(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()),
                ],
            ],
        )
    }

    #[test_case(&[CellValue::Integer(1), CellValue::Null], ColumnType::BigInt; "nulls ignored")]
    #[test_case(&[CellValue::Integer(1), CellValue::Float(0.5)], ColumnType::Double; "ints widen")]
    #[test_case(&[CellValue::Bool(true), CellValue::Integer(1)], ColumnType::Text; "mixed is text")]
    #[test_case(&[CellValue::Null, CellValue::Null], ColumnType::Text; "all null is text")]
    fn test_column_type_inference(cells: &[CellValue], expected: ColumnType) {
        assert_eq!(ColumnType::infer(cells), expected);
    }

    #[test]
    fn test_plan_creates_then_truncates_then_inserts() {
        let plan = TableLoadPlan::new("public", "stock", &stock()).unwrap();

        assert_eq!(
            plan.create,
            "CREATE TABLE IF NOT EXISTS \"public\".\"stock\" \
             (\"sku\" TEXT, \"qty\" DOUBLE PRECISION, \"counted_at\" DATE)"
        );
        assert_eq!(plan.truncate, "TRUNCATE TABLE \"public\".\"stock\"");
        assert_eq!(
            plan.insert,
            "INSERT INTO \"public\".\"stock\" (\"sku\", \"qty\", \"counted_at\") \
             VALUES ($1::text, $2::text::DOUBLE PRECISION, $3::text::DATE)"
        );
    }

    #[test]
    fn test_plan_requires_columns() {
        let err = TableLoadPlan::new("public", "stock", &ResultSet::default()).unwrap_err();
        assert!(err.to_string().contains("no columns"));
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&CellValue::Null), None);
        assert_eq!(cell_text(&CellValue::Integer(7)).as_deref(), Some("7"));
        assert_eq!(
            cell_text(&CellValue::Float(f64::NEG_INFINITY)).as_deref(),
            Some("-Infinity")
        );
        let ts = NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_milli_opt(8, 30, 0, 250)
            .unwrap();
        assert_eq!(
            cell_text(&CellValue::Timestamp(ts)).as_deref(),
            Some("2025-03-10 08:30:00.250")
        );
    }
}
