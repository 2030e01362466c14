//! Rejects inputs that are themselves the output of an earlier merge.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::GuardConfig;
use crate::error::MergeError;
use crate::extract::strip_extension;
use crate::model::{SourceFile, Workbook};

/// Trailing ` (N)` / `(N)` copy counter, as added to duplicate output names
/// and by browsers re-downloading a file.
static COPY_COUNTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\(\d+\)$").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessedEvidence {
    FileName { suffix: String },
    MarkerSheet { sheet: String, hidden: bool },
}

impl std::fmt::Display for ProcessedEvidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FileName { suffix } => {
                write!(f, "file name ends with '{suffix}', the naming used for merge output")
            }
            Self::MarkerSheet { sheet, hidden } => write!(
                f,
                "workbook carries the {}processed marker sheet '{sheet}'",
                if *hidden { "hidden " } else { "" }
            ),
        }
    }
}

/// Filename heuristic: stem (case-insensitive, extension and copy counter
/// stripped) ends with a processed suffix.
pub fn check_file_name(name: &str, config: &GuardConfig) -> Option<ProcessedEvidence> {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(name);
    let stem = strip_extension(base).trim().to_lowercase();
    let stem = COPY_COUNTER.replace(&stem, "");
    config
        .processed_suffixes
        .iter()
        .find(|s| stem.ends_with(&s.to_lowercase()))
        .map(|s| ProcessedEvidence::FileName { suffix: s.clone() })
}

/// Marker-sheet heuristic: the reserved sheet exists, visible or not.
pub fn check_marker_sheet(workbook: &Workbook, config: &GuardConfig) -> Option<ProcessedEvidence> {
    let marker = config.marker_sheet.trim();
    workbook
        .sheets
        .iter()
        .find(|s| s.name.trim().eq_ignore_ascii_case(marker))
        .map(|s| ProcessedEvidence::MarkerSheet { sheet: s.name.clone(), hidden: s.hidden })
}

/// Run both heuristics. A file that failed to decode is only judged by name.
pub fn inspect(source: &SourceFile, config: &GuardConfig) -> Option<ProcessedEvidence> {
    if let Some(ev) = check_file_name(&source.name, config) {
        return Some(ev);
    }
    match &source.workbook {
        Ok(wb) => check_marker_sheet(wb, config),
        Err(_) => None,
    }
}

/// Guard one input, naming its role in the rejection message.
pub fn ensure_unprocessed(source: &SourceFile, role: &str, config: &GuardConfig) -> Result<(), MergeError> {
    match inspect(source, config) {
        Some(evidence) => {
            log::debug!("{role} '{}' looks pre-processed: {evidence}", source.name);
            Err(MergeError::processed(
                &source.name,
                format!("{role} looks like an already merged file ({evidence})"),
            ))
        }
        None => Ok(()),
    }
}
