use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::error::Diagnostic;

// ---------------------------------------------------------------------------
// Cells + tables
// ---------------------------------------------------------------------------

/// A single cell as handed over by the storage layer.
///
/// `Empty` is the null value. Marks and names pass through as whatever
/// variant the source format produced; the engine never coerces them.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// String view used for keys and codes. `None` for null cells.
    pub fn as_key_str(&self) -> Option<String> {
        match self {
            Self::Empty => None,
            Self::Text(s) => Some(s.clone()),
            Self::Number(n) => Some(format_number(*n)),
            Self::Bool(b) => Some(if *b { "TRUE".into() } else { "FALSE".into() }),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Text(s) => write!(f, "{s}"),
            Self::Number(n) => write!(f, "{}", format_number(*n)),
            Self::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
        }
    }
}

/// Integers without a trailing `.0`; everything else as-is.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Header + rows. `Table::new` pads or truncates every row to the header
/// width; tables built from the public fields may be ragged, so read through
/// `cell`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut r| {
                r.resize(width, Value::Empty);
                r
            })
            .collect();
        Self { columns, rows }
    }

    /// Index of the column whose trimmed header equals `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.trim() == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn cell(&self, row: usize, col: usize) -> &Value {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&Value::Empty)
    }

    /// Iterate one column top to bottom.
    pub fn column_values(&self, col: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().map(move |r| r.get(col).unwrap_or(&Value::Empty))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sheet {
    pub name: String,
    pub table: Table,
    pub hidden: bool,
}

impl Sheet {
    pub fn new(name: impl Into<String>, table: Table) -> Self {
        Self { name: name.into(), table, hidden: false }
    }
}

/// A decoded file: its submitted name plus sheets in file order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Workbook {
    pub name: String,
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(name: impl Into<String>, sheets: Vec<Sheet>) -> Self {
        Self { name: name.into(), sheets }
    }

    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.iter().map(|s| s.name.as_str())
    }
}

/// One submitted file. Decode failures are carried, not raised, so the
/// engine can still apply the filename guard and skip the file with a warning.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub workbook: Result<Workbook, String>,
}

impl SourceFile {
    pub fn decoded(workbook: Workbook) -> Self {
        Self { name: workbook.name.clone(), workbook: Ok(workbook) }
    }

    pub fn failed(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self { name: name.into(), workbook: Err(error.into()) }
    }
}

/// Everything one run consumes.
#[derive(Debug, Clone)]
pub struct MergeInput {
    pub roster: SourceFile,
    pub templates: Vec<SourceFile>,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Fixed output schema, in order.
pub const OUTPUT_COLUMNS: [&str; 5] = ["Class", "RollNumber", "FullName", "Mark", "Note"];

/// One row of a merged subject table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRecord {
    pub class: Value,
    pub roll_number: Value,
    pub full_name: Value,
    pub mark: Value,
    pub note: Value,
}

impl MergedRecord {
    pub fn into_row(self) -> Vec<Value> {
        vec![self.class, self.roll_number, self.full_name, self.mark, self.note]
    }
}

/// Codes required by the roster vs codes found in templates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoverageReport {
    pub missing: BTreeSet<String>,
    pub extra: BTreeSet<String>,
}

impl CoverageReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }
}

/// A finished subject table, named and marked, ready for the storage layer.
#[derive(Debug, Clone, Serialize)]
pub struct NamedOutput {
    pub file_name: String,
    pub code: String,
    pub source: String,
    pub rows: usize,
    pub matched: usize,
    #[serde(skip)]
    pub workbook: Workbook,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeSummary {
    pub templates_submitted: usize,
    pub templates_merged: usize,
    pub templates_skipped: usize,
    pub rows_written: usize,
    pub rows_matched: usize,
    pub warnings: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeMeta {
    pub roster: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeResult {
    pub meta: MergeMeta,
    pub summary: MergeSummary,
    pub coverage: CoverageReport,
    pub outputs: Vec<NamedOutput>,
    pub diagnostics: Vec<Diagnostic>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_padded_to_header_width() {
        let t = Table::new(
            vec!["A".into(), "B".into()],
            vec![vec![Value::text("x")], vec![Value::text("1"), Value::text("2"), Value::text("3")]],
        );
        assert_eq!(t.rows[0], vec![Value::text("x"), Value::Empty]);
        assert_eq!(t.rows[1].len(), 2);
    }

    #[test]
    fn column_lookup_trims_headers() {
        let t = Table::new(vec![" Login ".into(), "Mark(10)".into()], vec![]);
        assert_eq!(t.column_index("Login"), Some(0));
        assert_eq!(t.column_index("login"), None);
    }

    #[test]
    fn numeric_keys_render_without_fraction() {
        assert_eq!(Value::Number(101.0).as_key_str().as_deref(), Some("101"));
        assert_eq!(Value::Number(8.5).to_string(), "8.5");
        assert_eq!(Value::Empty.as_key_str(), None);
    }
}
