use std::path::Path;

use crate::error::MergeError;
use crate::model::Table;

/// Canonical code: the part before the first `_`, trimmed and upper-cased.
///
/// Returns `None` when nothing is left (empty input or a leading `_`).
pub fn canonical_code(raw: &str) -> Option<String> {
    let head = raw.trim().split('_').next().unwrap_or("").trim();
    if head.is_empty() {
        None
    } else {
        Some(head.to_uppercase())
    }
}

/// Embedded-column strategy: first non-null value of `column`.
pub fn code_from_column(file: &str, table: &Table, column: &str) -> Result<String, MergeError> {
    let ci = table.column_index(column).ok_or_else(|| MergeError::Extraction {
        file: file.into(),
        detail: format!("column '{column}' not found"),
    })?;

    let raw = table
        .column_values(ci)
        .filter_map(|v| v.as_key_str())
        .find(|s| !s.trim().is_empty())
        .ok_or_else(|| MergeError::Extraction {
            file: file.into(),
            detail: format!("column '{column}' has no values"),
        })?;

    canonical_code(&raw).ok_or_else(|| MergeError::Extraction {
        file: file.into(),
        detail: format!("'{raw}' in column '{column}' does not start with a code"),
    })
}

/// Filename strategy: base name without directories or extension.
pub fn code_from_file_name(file: &str) -> Result<String, MergeError> {
    let base = Path::new(file)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file);
    canonical_code(strip_extension(base)).ok_or_else(|| MergeError::Extraction {
        file: file.into(),
        detail: "file name does not start with a code".into(),
    })
}

/// `name.xlsx` → `name`. Dotfiles and names without an extension pass through.
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(i) if i > 0 => &name[..i],
        _ => name,
    }
}
