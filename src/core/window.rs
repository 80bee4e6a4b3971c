//! Run window resolution
//!
//! A run window is a pair of date expressions resolved once per run. An
//! expression is either empty (no bound), the token `today` with an optional
//! `+ N` / `- N` day offset, or an absolute date in the configured format.
//! A window that fails to resolve aborts the run before any unit executes.

use crate::config::ExportConfig;
use crate::domain::{PorterError, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt::Write;

const TODAY: &str = "today";

/// A resolved window bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedDate {
    /// Concrete point in time
    pub at: NaiveDateTime,

    /// Whether the expression was a bare `today` with no offset
    pub is_today: bool,
}

impl ResolvedDate {
    /// A bound at a fixed point in time
    pub fn at(at: NaiveDateTime) -> Self {
        Self {
            at,
            is_today: false,
        }
    }

    /// The bare `today` bound
    pub fn today(now: NaiveDateTime) -> Self {
        Self { at: now, is_today: true }
    }
}

/// Resolve one date expression against `now`
///
/// Returns `Ok(None)` for an empty expression.
///
/// # Errors
///
/// Returns [`PorterError::DateParse`] when the expression is neither a
/// `today` form nor a date matching `format`.
pub fn resolve_date(
    expression: &str,
    format: &str,
    now: NaiveDateTime,
) -> Result<Option<ResolvedDate>> {
    let trimmed = expression.trim();
    let expr = trimmed.to_lowercase();
    if expr.is_empty() {
        return Ok(None);
    }

    let parse_error = || PorterError::DateParse {
        expression: expression.to_string(),
        format: format.to_string(),
    };

    if let Some(rest) = expr.strip_prefix(TODAY) {
        let rest = rest.trim();
        if rest.is_empty() {
            return Ok(Some(ResolvedDate::today(now)));
        }

        let (sign, digits) = if let Some(d) = rest.strip_prefix('+') {
            (1, d)
        } else if let Some(d) = rest.strip_prefix('-') {
            (-1, d)
        } else {
            return Err(parse_error());
        };

        let days: i64 = digits.trim().parse().map_err(|_| parse_error())?;
        let offset = Duration::try_days(sign * days).ok_or_else(parse_error)?;
        let at = now.checked_add_signed(offset).ok_or_else(parse_error)?;
        return Ok(Some(ResolvedDate::at(at)));
    }

    // Format literals match case-sensitively, so parse the expression as given
    NaiveDateTime::parse_from_str(trimmed, format)
        .or_else(|_| {
            NaiveDate::parse_from_str(trimmed, format).map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
        .map(|at| Some(ResolvedDate::at(at)))
        .map_err(|_| parse_error())
}

/// Render a point in time through a strftime format
///
/// # Errors
///
/// Returns a configuration error if the format contains invalid items.
pub fn render_date(at: &NaiveDateTime, format: &str) -> Result<String> {
    let mut out = String::new();
    write!(out, "{}", at.format(format)).map_err(|_| {
        PorterError::Configuration(format!("Invalid date format '{format}'"))
    })?;
    Ok(out)
}

/// Configured window expressions plus naming rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunWindow {
    /// Lower bound expression
    pub from_expr: String,

    /// Upper bound expression
    pub to_expr: String,

    /// Format used for parsing and rendering dates
    pub date_format: String,

    /// Separator used between file name parts
    pub separator: String,
}

impl RunWindow {
    /// Create a window from its expressions and naming rules
    pub fn new(
        from_expr: impl Into<String>,
        to_expr: impl Into<String>,
        date_format: impl Into<String>,
        separator: impl Into<String>,
    ) -> Self {
        Self {
            from_expr: from_expr.into(),
            to_expr: to_expr.into(),
            date_format: date_format.into(),
            separator: separator.into(),
        }
    }

    /// Resolve both bounds against `now`
    ///
    /// An empty upper bound resolves to `now`.
    ///
    /// # Errors
    ///
    /// Fails if either expression cannot be parsed; this is fatal for the run.
    pub fn resolve(&self, now: NaiveDateTime) -> Result<ResolvedWindow> {
        let from = resolve_date(&self.from_expr, &self.date_format, now)?;
        let to = resolve_date(&self.to_expr, &self.date_format, now)?
            .unwrap_or_else(|| ResolvedDate::today(now));

        // Surface format problems here rather than at the first file name.
        render_date(&to.at, &self.date_format)?;

        Ok(ResolvedWindow {
            from,
            to,
            date_format: self.date_format.clone(),
            separator: self.separator.clone(),
        })
    }
}

impl From<&ExportConfig> for RunWindow {
    fn from(export: &ExportConfig) -> Self {
        Self::new(
            export.from_date.clone(),
            export.to_date.clone(),
            export.date_format.clone(),
            export.file_name_separator.clone(),
        )
    }
}

/// A window with concrete bounds
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedWindow {
    /// Lower bound; `None` means unbounded
    pub from: Option<ResolvedDate>,

    /// Upper bound
    pub to: ResolvedDate,

    /// Format used for rendering dates
    pub date_format: String,

    /// Separator used between file name parts
    pub separator: String,
}

impl ResolvedWindow {
    /// Lower bound as a query parameter
    pub fn from_param(&self) -> Option<NaiveDateTime> {
        self.from.map(|d| d.at)
    }

    /// Upper bound as a query parameter
    pub fn to_param(&self) -> Option<NaiveDateTime> {
        Some(self.to.at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_empty_expression_is_unbounded() {
        assert_eq!(resolve_date("", "%m%d%Y", now()).unwrap(), None);
        assert_eq!(resolve_date("   ", "%m%d%Y", now()).unwrap(), None);
    }

    #[test]
    fn test_bare_today_is_sentinel() {
        let resolved = resolve_date("Today", "%m%d%Y", now()).unwrap().unwrap();
        assert!(resolved.is_today);
        assert_eq!(resolved.at, now());
    }

    #[test_case("today-1", 9; "minus one")]
    #[test_case("TODAY - 7", 3; "minus seven with spaces")]
    #[test_case("today+ 2", 12; "plus two")]
    #[test_case("today-0", 10; "minus zero")]
    fn test_today_offsets(expr: &str, expected_day: u32) {
        let resolved = resolve_date(expr, "%m%d%Y", now()).unwrap().unwrap();
        assert!(!resolved.is_today);
        assert_eq!(
            resolved.at,
            NaiveDate::from_ymd_opt(2025, 3, expected_day)
                .unwrap()
                .and_hms_opt(8, 30, 0)
                .unwrap()
        );
    }

    #[test_case("today-x"; "non numeric offset")]
    #[test_case("todays"; "trailing garbage")]
    #[test_case("2025-03-01"; "wrong format")]
    #[test_case("13452025"; "out of range")]
    fn test_invalid_expressions(expr: &str) {
        let err = resolve_date(expr, "%m%d%Y", now()).unwrap_err();
        assert!(matches!(err, PorterError::DateParse { .. }));
    }

    #[test]
    fn test_absolute_date_only_format() {
        let resolved = resolve_date("01152025", "%m%d%Y", now()).unwrap().unwrap();
        assert_eq!(
            resolved.at,
            NaiveDate::from_ymd_opt(2025, 1, 15)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
        assert!(!resolved.is_today);
    }

    #[test]
    fn test_absolute_datetime_format() {
        let resolved = resolve_date("2025-01-15 13:45", "%Y-%m-%d %H:%M", now())
            .unwrap()
            .unwrap();
        assert_eq!(resolved.at.format("%H%M").to_string(), "1345");
    }

    #[test_case("2025-01-15T13:45", "%Y-%m-%dT%H:%M", 13, 45; "uppercase literal")]
    #[test_case("15Jan2025", "%d%b%Y", 0, 0; "month name")]
    #[test_case(" 2025-01-15 ", "%Y-%m-%d", 0, 0; "surrounding whitespace")]
    fn test_absolute_date_keeps_case(expr: &str, format: &str, hour: u32, minute: u32) {
        let resolved = resolve_date(expr, format, now()).unwrap().unwrap();
        assert_eq!(
            resolved.at,
            NaiveDate::from_ymd_opt(2025, 1, 15)
                .unwrap()
                .and_hms_opt(hour, minute, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_window_resolve_defaults_upper_bound_to_now() {
        let window = RunWindow::new("", "", "%m%d%Y", "_");
        let resolved = window.resolve(now()).unwrap();
        assert!(resolved.from.is_none());
        assert_eq!(resolved.to.at, now());
        assert_eq!(resolved.from_param(), None);
        assert_eq!(resolved.to_param(), Some(now()));
    }

    #[test]
    fn test_window_resolve_fails_fast() {
        let window = RunWindow::new("yesterday", "today", "%m%d%Y", "_");
        assert!(window.resolve(now()).is_err());
    }

    #[test]
    fn test_render_date() {
        assert_eq!(render_date(&now(), "%m%d%Y").unwrap(), "03102025");
        assert!(render_date(&now(), "%Q").is_err());
    }
}
