//! Result set materialization
//!
//! Writes a [`ResultSet`] to disk as delimited text (`csv`, `txt`) or as a
//! spreadsheet (`xlsx`). Failures never escape [`export_to_file`]; they come
//! back as [`ExportOutcome::Failed`] so the unit runner decides how to count
//! them.

use crate::config::ExportConfig;
use crate::domain::{CellValue, FileFormat, PorterError, Result, ResultSet};
use rust_xlsxwriter::{Format, Workbook};
use std::fs;
use std::path::Path;

const ESCAPE: char = '\\';

/// Field quoting for delimited output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    /// Quote every field (`"`)
    All,

    /// Quote nothing; escape separators, quotes and `\` with `\` (`'`)
    None,
}

impl QuoteStyle {
    /// Map the configured quote character
    pub fn from_config(value: &str) -> Self {
        if value == "\"" {
            QuoteStyle::All
        } else {
            QuoteStyle::None
        }
    }
}

/// Formatting rules applied to every exported file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    /// Target extension, parsed per file
    pub extension: String,

    pub quote_style: QuoteStyle,

    /// Explicit column separator; falls back per format when unset
    pub separator: Option<u8>,

    /// Write a header-only file for empty results
    pub allow_empty_export: bool,
}

impl WriteOptions {
    pub fn from_config(config: &ExportConfig) -> Self {
        Self {
            extension: config.file_extension(),
            quote_style: QuoteStyle::from_config(&config.quote_style),
            separator: config
                .separator
                .as_deref()
                .and_then(|s| s.as_bytes().first().copied()),
            allow_empty_export: config.allow_empty_export,
        }
    }

    fn delimiter(&self, format: FileFormat) -> u8 {
        match (self.separator, format) {
            (Some(sep), _) => sep,
            (None, FileFormat::Txt) => b'\t',
            (None, _) => b',',
        }
    }
}

/// Result of materializing one result set
#[derive(Debug)]
pub enum ExportOutcome {
    /// A file was written with this many data rows
    Written { rows: usize },

    /// The result was empty and empty exports are not allowed; no file exists
    Empty,

    /// Nothing usable was written
    Failed(PorterError),
}

impl ExportOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExportOutcome::Written { .. })
    }
}

/// Write `result` to `path` using `options`
pub fn export_to_file(result: &ResultSet, path: &Path, options: &WriteOptions) -> ExportOutcome {
    if result.columns.is_empty() {
        tracing::error!(path = %path.display(), "No columns found in the query result");
        return ExportOutcome::Failed(PorterError::Export(format!(
            "No columns found in the query result for {}",
            path.display()
        )));
    }

    if result.is_empty() {
        if !options.allow_empty_export {
            tracing::info!(
                path = %path.display(),
                "Query returned 0 rows, skipping export"
            );
            return ExportOutcome::Empty;
        }
        tracing::info!(
            path = %path.display(),
            "Query returned 0 rows, exporting headers only"
        );
    }

    match write_file(result, path, options) {
        Ok(()) => ExportOutcome::Written {
            rows: result.row_count(),
        },
        Err(e) => {
            // A partial file would make the next run skip this unit.
            if path.exists() {
                if let Err(remove_err) = fs::remove_file(path) {
                    tracing::warn!(
                        path = %path.display(),
                        error = %remove_err,
                        "Failed to remove partially written file"
                    );
                }
            }
            ExportOutcome::Failed(e)
        }
    }
}

fn write_file(result: &ResultSet, path: &Path, options: &WriteOptions) -> Result<()> {
    let format: FileFormat = options.extension.parse()?;
    match format {
        FileFormat::Xlsx => write_spreadsheet(result, path),
        FileFormat::Csv | FileFormat::Txt => {
            write_delimited(result, path, options.delimiter(format), options.quote_style)
        }
    }
}

fn write_delimited(
    result: &ResultSet,
    path: &Path,
    delimiter: u8,
    quote_style: QuoteStyle,
) -> Result<()> {
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(delimiter)
        .terminator(csv::Terminator::Any(b'\n'))
        .quote_style(match quote_style {
            QuoteStyle::All => csv::QuoteStyle::Always,
            QuoteStyle::None => csv::QuoteStyle::Never,
        });
    let mut writer = builder.from_path(path)?;

    let render = |text: String| match quote_style {
        QuoteStyle::All => text,
        QuoteStyle::None => escape_field(&text, delimiter as char),
    };

    writer.write_record(result.columns.iter().map(|c| render(c.clone())))?;
    for row in &result.rows {
        writer.write_record(row.iter().map(|cell| render(cell.to_string())))?;
    }
    writer.flush()?;
    Ok(())
}

/// Escape a field for unquoted output
fn escape_field(field: &str, delimiter: char) -> String {
    let mut out = String::with_capacity(field.len());
    for ch in field.chars() {
        match ch {
            '\n' | '\r' | '"' | ESCAPE => {
                out.push(ESCAPE);
                out.push(ch);
            }
            c if c == delimiter => {
                out.push(ESCAPE);
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

fn write_spreadsheet(result: &ResultSet, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();

    for (col, name) in result.columns.iter().enumerate() {
        worksheet.write_string_with_format(0, column_index(col)?, name, &header)?;
    }

    for (idx, row) in result.rows.iter().enumerate() {
        let row_num = u32::try_from(idx + 1)
            .map_err(|_| PorterError::Export("Too many rows for a spreadsheet".to_string()))?;
        for (col, cell) in row.iter().enumerate() {
            let col = column_index(col)?;
            match cell {
                CellValue::Null => {}
                CellValue::Bool(b) => {
                    worksheet.write_boolean(row_num, col, *b)?;
                }
                CellValue::Integer(i) => {
                    worksheet.write_number(row_num, col, *i as f64)?;
                }
                CellValue::Float(f) => {
                    worksheet.write_number(row_num, col, *f)?;
                }
                other => {
                    worksheet.write_string(row_num, col, other.to_string())?;
                }
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}

fn column_index(col: usize) -> Result<u16> {
    u16::try_from(col)
        .map_err(|_| PorterError::Export("Too many columns for a spreadsheet".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn options(extension: &str, quote_style: QuoteStyle, allow_empty: bool) -> WriteOptions {
        WriteOptions {
            extension: extension.to_string(),
            quote_style,
            separator: None,
            allow_empty_export: allow_empty,
        }
    }

    fn orders() -> ResultSet {
        ResultSet::new(
            vec!["id".to_string(), "customer".to_string()],
            vec![
                vec![CellValue::Integer(1), CellValue::from("Acme, Inc")],
                vec![CellValue::Integer(2), CellValue::from("Said \"hi\"")],
                vec![CellValue::Integer(3), CellValue::Null],
            ],
        )
    }

    #[test]
    fn test_csv_unquoted_escapes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("orders.csv");

        let outcome = export_to_file(&orders(), &path, &options("csv", QuoteStyle::None, false));
        assert!(matches!(outcome, ExportOutcome::Written { rows: 3 }));

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "id,customer\n1,Acme\\, Inc\n2,Said \\\"hi\\\"\n3,\n"
        );
    }

    #[test]
    fn test_csv_quote_all() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("orders.csv");

        let outcome = export_to_file(&orders(), &path, &options("csv", QuoteStyle::All, false));
        assert!(outcome.is_success());

        let contents = fs::read_to_string(&path).unwrap();
        let first_lines: Vec<&str> = contents.lines().take(2).collect();
        assert_eq!(first_lines, vec!["\"id\",\"customer\"", "\"1\",\"Acme, Inc\""]);
    }

    #[test]
    fn test_txt_defaults_to_tab() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("orders.txt");

        export_to_file(&orders(), &path, &options("txt", QuoteStyle::None, false));
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("id\tcustomer\n1\tAcme, Inc\n"));
    }

    #[test]
    fn test_explicit_separator() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("orders.csv");
        let mut opts = options("csv", QuoteStyle::None, false);
        opts.separator = Some(b'|');

        export_to_file(&orders(), &path, &opts);
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("id|customer\n1|Acme, Inc\n"));
    }

    #[test]
    fn test_empty_result_allowed_writes_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.csv");
        let empty = ResultSet::empty(vec!["id".to_string(), "name".to_string()]);

        let outcome = export_to_file(&empty, &path, &options("csv", QuoteStyle::None, true));
        assert!(matches!(outcome, ExportOutcome::Written { rows: 0 }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "id,name\n");
    }

    #[test]
    fn test_empty_result_disallowed_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.csv");
        let empty = ResultSet::empty(vec!["id".to_string()]);

        let outcome = export_to_file(&empty, &path, &options("csv", QuoteStyle::None, false));
        assert!(matches!(outcome, ExportOutcome::Empty));
        assert!(!outcome.is_success());
        assert!(!path.exists());
    }

    #[test]
    fn test_zero_columns_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.csv");
        let outcome = export_to_file(
            &ResultSet::new(vec![], vec![]),
            &path,
            &options("csv", QuoteStyle::None, true),
        );
        assert!(matches!(outcome, ExportOutcome::Failed(PorterError::Export(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_unsupported_extension_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("orders.json");
        let outcome = export_to_file(&orders(), &path, &options("json", QuoteStyle::None, false));
        match outcome {
            ExportOutcome::Failed(e) => assert!(e.to_string().contains("Unsupported file format")),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_xlsx_written() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("orders.xlsx");
        let outcome = export_to_file(&orders(), &path, &options("xlsx", QuoteStyle::All, false));
        assert!(matches!(outcome, ExportOutcome::Written { rows: 3 }));
        let bytes = fs::read(&path).unwrap();
        // xlsx is a zip container
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_quote_style_from_config() {
        assert_eq!(QuoteStyle::from_config("\""), QuoteStyle::All);
        assert_eq!(QuoteStyle::from_config("'"), QuoteStyle::None);
    }
}
