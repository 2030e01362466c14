use crate::model::{Table, Value};

/// Canonical join key: trimmed, upper-cased. `None` for null or blank cells.
pub fn canonical_key(value: &Value) -> Option<String> {
    let s = value.as_key_str()?;
    let key = s.trim().to_uppercase();
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

/// Return a copy of `table` with `columns` trimmed and upper-cased.
///
/// Null cells stay null. Columns the table does not carry are ignored.
pub fn normalize_columns(table: &Table, columns: &[&str]) -> Table {
    let indices: Vec<usize> = columns.iter().filter_map(|c| table.column_index(c)).collect();
    let mut out = table.clone();
    for row in &mut out.rows {
        for &ci in &indices {
            if let Some(cell) = row.get_mut(ci) {
                *cell = match canonical_key(cell) {
                    Some(key) => Value::Text(key),
                    None => Value::Empty,
                };
            }
        }
    }
    out
}

/// Rename a column in place (first trimmed match wins). No-op when absent.
pub fn rename_column(table: &mut Table, from: &str, to: &str) {
    if table.has_column(to) {
        return;
    }
    if let Some(ci) = table.column_index(from) {
        table.columns[ci] = to.to_string();
    }
}

/// Ensure `column` exists and replace nulls in it with `default`.
pub fn default_column(table: &mut Table, column: &str, default: &str) {
    let ci = match table.column_index(column) {
        Some(ci) => ci,
        None => {
            table.columns.push(column.to_string());
            table.columns.len() - 1
        }
    };
    let width = table.columns.len();
    for row in &mut table.rows {
        row.resize(width, Value::Empty);
        if row[ci].is_empty() {
            row[ci] = Value::text(default);
        }
    }
}
