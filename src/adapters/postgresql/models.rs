//! Conversion between PostgreSQL values and [`CellValue`]s

use crate::domain::{CellValue, PorterError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::fmt::Display;
use tokio_postgres::types::{FromSql, ToSql, Type};
use tokio_postgres::Row;

/// Owned statement parameter
pub type Param = Box<dyn ToSql + Sync + Send>;

/// Borrow owned parameters in the shape the driver expects
pub fn param_refs(params: &[Param]) -> Vec<&(dyn ToSql + Sync)> {
    params
        .iter()
        .map(|p| &**p as &(dyn ToSql + Sync))
        .collect()
}

/// Quote an identifier, doubling embedded quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Bind a configured argument as the type the statement declares for it
///
/// # Errors
///
/// Returns a validation error if the value does not parse as the declared
/// type or the type has no text form Porter can bind.
pub fn text_param(ty: &Type, value: &str) -> Result<Param> {
    let param: Param = match *ty {
        Type::BOOL => Box::new(parse::<bool>(ty, value)?),
        Type::INT2 => Box::new(parse::<i16>(ty, value)?),
        Type::INT4 => Box::new(parse::<i32>(ty, value)?),
        Type::INT8 => Box::new(parse::<i64>(ty, value)?),
        Type::FLOAT4 => Box::new(parse::<f32>(ty, value)?),
        Type::FLOAT8 => Box::new(parse::<f64>(ty, value)?),
        Type::DATE => Box::new(
            NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
                .map_err(|e| invalid_argument(ty, value, e))?,
        ),
        Type::TIMESTAMP => Box::new(
            NaiveDateTime::parse_from_str(value.trim(), "%Y-%m-%d %H:%M:%S")
                .map_err(|e| invalid_argument(ty, value, e))?,
        ),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            Box::new(value.to_string())
        }
        ref other => {
            return Err(PorterError::Validation(format!(
                "Argument '{value}' targets a parameter of unsupported type {other}"
            )))
        }
    };
    Ok(param)
}

fn parse<T>(ty: &Type, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| invalid_argument(ty, value, e))
}

fn invalid_argument(ty: &Type, value: &str, error: impl Display) -> PorterError {
    PorterError::Validation(format!("Argument '{value}' is not a valid {ty}: {error}"))
}

/// Whether values of this column type can be read into a [`CellValue`]
pub fn is_supported(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::BOOL
            | Type::INT2
            | Type::INT4
            | Type::INT8
            | Type::OID
            | Type::FLOAT4
            | Type::FLOAT8
            | Type::TIMESTAMP
            | Type::TIMESTAMPTZ
            | Type::DATE
    ) || <String as FromSql>::accepts(ty)
}

/// Convert every column of a row
///
/// # Errors
///
/// Returns a database error for a column whose type is not supported or
/// whose value fails to decode.
pub fn row_to_cells(row: &Row) -> Result<Vec<CellValue>> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            cell_at(row, idx, column.type_()).map_err(|e| {
                PorterError::Database(format!(
                    "Failed to read column '{}' ({}): {e}",
                    column.name(),
                    column.type_()
                ))
            })
        })
        .collect()
}

fn cell_at(row: &Row, idx: usize, ty: &Type) -> std::result::Result<CellValue, String> {
    let value = match *ty {
        Type::BOOL => get::<bool>(row, idx)?.map(CellValue::Bool),
        Type::INT2 => get::<i16>(row, idx)?.map(|v| CellValue::Integer(v.into())),
        Type::INT4 => get::<i32>(row, idx)?.map(|v| CellValue::Integer(v.into())),
        Type::INT8 => get::<i64>(row, idx)?.map(CellValue::Integer),
        Type::OID => get::<u32>(row, idx)?.map(|v| CellValue::Integer(v.into())),
        Type::FLOAT4 => get::<f32>(row, idx)?.map(|v| CellValue::Float(v.into())),
        Type::FLOAT8 => get::<f64>(row, idx)?.map(CellValue::Float),
        Type::TIMESTAMP => get::<NaiveDateTime>(row, idx)?.map(CellValue::Timestamp),
        Type::TIMESTAMPTZ => {
            get::<DateTime<Utc>>(row, idx)?.map(|v| CellValue::Timestamp(v.naive_utc()))
        }
        Type::DATE => get::<NaiveDate>(row, idx)?.map(CellValue::Date),
        _ if <String as FromSql>::accepts(ty) => get::<String>(row, idx)?.map(CellValue::Text),
        _ => return Err("unsupported column type".to_string()),
    };
    Ok(value.unwrap_or(CellValue::Null))
}

fn get<'a, T: FromSql<'a>>(row: &'a Row, idx: usize) -> std::result::Result<Option<T>, String> {
    row.try_get::<_, Option<T>>(idx).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_types() {
        assert!(is_supported(&Type::INT4));
        assert!(is_supported(&Type::VARCHAR));
        assert!(is_supported(&Type::TEXT));
        assert!(is_supported(&Type::TIMESTAMPTZ));
        assert!(!is_supported(&Type::NUMERIC));
        assert!(!is_supported(&Type::JSONB));
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("amount"), "\"amount\"");
        assert_eq!(quote_ident("odd\"name"), "\"odd\"\"name\"");
    }

    #[test]
    fn test_text_param_parses_declared_type() {
        assert!(format!("{:?}", text_param(&Type::INT4, " 42").unwrap()).contains("42"));
        assert!(format!("{:?}", text_param(&Type::DATE, "2025-03-10").unwrap())
            .contains("2025-03-10"));
        assert!(format!("{:?}", text_param(&Type::TEXT, "EU").unwrap()).contains("EU"));
    }

    #[test]
    fn test_text_param_rejects_bad_values() {
        let err = text_param(&Type::INT8, "twelve").unwrap_err();
        assert!(matches!(err, PorterError::Validation(_)));
        assert!(err.to_string().contains("twelve"));

        assert!(text_param(&Type::BOOL, "maybe").is_err());
        assert!(text_param(&Type::JSONB, "{}").is_err());
    }
}
