//! Output file naming
//!
//! File names are a pure function of the unit prefix, the resolved window,
//! the extension and the separator. Because the same window always yields
//! the same name, the presence of that name on disk is what makes repeated
//! runs skip completed units.

use crate::core::window::{render_date, ResolvedDate, ResolvedWindow};
use crate::domain::Result;

/// Build a file name from explicit parts
///
/// - with a lower bound that is not the bare `today` sentinel:
///   `prefix SEP from SEP to.ext` (or `from SEP to.ext` without a prefix)
/// - otherwise: `prefix SEP to.ext` (or `to.ext`)
///
/// # Errors
///
/// Fails only if `date_format` cannot render a date.
pub fn file_name(
    prefix: &str,
    from: Option<&ResolvedDate>,
    to: &ResolvedDate,
    extension: &str,
    separator: &str,
    date_format: &str,
) -> Result<String> {
    let to = render_date(&to.at, date_format)?;
    let extension = extension.trim_start_matches('.');

    let stem = match from.filter(|f| !f.is_today) {
        Some(from) => {
            let from = render_date(&from.at, date_format)?;
            if prefix.is_empty() {
                format!("{from}{separator}{to}")
            } else {
                format!("{prefix}{separator}{from}{separator}{to}")
            }
        }
        None if prefix.is_empty() => to,
        None => format!("{prefix}{separator}{to}"),
    };

    Ok(format!("{stem}.{extension}"))
}

/// Build the file name for a unit prefix within a resolved window
///
/// # Errors
///
/// Fails only if the window's date format cannot render a date.
pub fn unit_file_name(prefix: &str, window: &ResolvedWindow, extension: &str) -> Result<String> {
    file_name(
        prefix,
        window.from.as_ref(),
        &window.to,
        extension,
        &window.separator,
        &window.date_format,
    )
}
