//! Working and backup directory helpers

use crate::domain::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Regular files in `dir` accepted by `keep`, sorted by name
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be read.
pub fn list_files<F>(dir: &Path, keep: F) -> Result<Vec<(String, PathBuf)>>
where
    F: Fn(&str) -> bool,
{
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if keep(&name) {
            files.push((name, entry.path()));
        }
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

/// Whether a file name carries `.extension`
pub fn has_extension(file_name: &str, extension: &str) -> bool {
    let extension = extension.trim_start_matches('.');
    file_name
        .strip_suffix(extension)
        .is_some_and(|stem| stem.ends_with('.') && stem.len() > 1)
}

/// Move `source` into `dir`, keeping its file name
///
/// Falls back to copy and remove when a rename is not possible, for example
/// across file systems.
///
/// # Errors
///
/// Returns an I/O error if neither strategy succeeds.
pub fn relocate(source: &Path, dir: &Path) -> Result<PathBuf> {
    let name = source.file_name().ok_or_else(|| {
        crate::domain::PorterError::Io(format!("{} has no file name", source.display()))
    })?;
    let destination = dir.join(name);

    if fs::rename(source, &destination).is_err() {
        fs::copy(source, &destination)?;
        fs::remove_file(source)?;
    }
    Ok(destination)
}
