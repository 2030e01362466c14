use std::collections::{BTreeSet, HashMap};

use crate::config::{RosterColumns, TemplateColumns};
use crate::error::MergeError;
use crate::extract::canonical_code;
use crate::model::{MergedRecord, Table, Value, OUTPUT_COLUMNS};
use crate::normalize::{canonical_key, default_column, normalize_columns, rename_column};

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// Roster fields the merge needs for one student in one subject.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub class: Value,
    pub roll_number: String,
    pub full_name: Value,
    pub slot_type: String,
}

/// Roster rows for a single subject code, keyed by canonical RollNumber.
#[derive(Debug, Clone, Default)]
pub struct RosterSubset {
    entries: HashMap<String, RosterEntry>,
}

impl RosterSubset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the key is already taken. Returns false on a duplicate.
    pub fn insert(&mut self, entry: RosterEntry) -> bool {
        if self.entries.contains_key(&entry.roll_number) {
            return false;
        }
        self.entries.insert(entry.roll_number.clone(), entry);
        true
    }

    pub fn get(&self, key: &str) -> Option<&RosterEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The whole roster, normalized and split by subject. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct RosterIndex {
    by_code: HashMap<String, RosterSubset>,
    /// Roster carries its own FullName column.
    pub has_full_name: bool,
    /// `(code, roll_number)` pairs seen more than once; first row kept.
    pub duplicates: Vec<(String, String)>,
    /// Rows dropped because RollNumber or SubjectCode was blank.
    pub skipped_rows: usize,
}

impl RosterIndex {
    /// Normalize the roster table and index it.
    ///
    /// `RollNumber` and `SubjectCode` must exist; `GroupName` becomes `Class`,
    /// a missing `SlotType` defaults to empty.
    pub fn build(file: &str, table: &Table, cols: &RosterColumns) -> Result<Self, MergeError> {
        for required in [&cols.roll_number, &cols.subject_code] {
            if !table.has_column(required) {
                return Err(MergeError::rejected(
                    file,
                    format!("roster has no '{required}' column"),
                ));
            }
        }

        let mut t = normalize_columns(table, &[cols.roll_number.as_str(), cols.subject_code.as_str()]);
        rename_column(&mut t, &cols.class, "Class");
        default_column(&mut t, &cols.slot_type, "");

        let roll_ci = t.column_index(&cols.roll_number);
        let code_ci = t.column_index(&cols.subject_code);
        let (Some(roll_ci), Some(code_ci)) = (roll_ci, code_ci) else {
            return Err(MergeError::rejected(file, "roster key columns vanished during normalization"));
        };
        let class_ci = t.column_index("Class");
        let slot_ci = t.column_index(&cols.slot_type);
        let name_ci = t.column_index(&cols.full_name);

        let mut index = RosterIndex { has_full_name: name_ci.is_some(), ..Default::default() };

        for r in 0..t.row_count() {
            let roll = canonical_key(t.cell(r, roll_ci));
            let code = t.cell(r, code_ci).as_key_str().and_then(|c| canonical_code(&c));
            let (Some(roll), Some(code)) = (roll, code) else {
                index.skipped_rows += 1;
                continue;
            };

            let slot_type = slot_ci
                .and_then(|ci| t.cell(r, ci).as_key_str())
                .map(|s| s.trim().to_string())
                .unwrap_or_default();

            let entry = RosterEntry {
                class: class_ci.map(|ci| t.cell(r, ci).clone()).unwrap_or_default(),
                roll_number: roll.clone(),
                full_name: name_ci.map(|ci| t.cell(r, ci).clone()).unwrap_or_default(),
                slot_type,
            };

            if !index.by_code.entry(code.clone()).or_default().insert(entry) {
                index.duplicates.push((code, roll));
            }
        }

        Ok(index)
    }

    pub fn subset(&self, code: &str) -> Option<&RosterSubset> {
        self.by_code.get(code)
    }

    pub fn codes(&self) -> BTreeSet<String> {
        self.by_code.keys().cloned().collect()
    }

    pub fn student_count(&self) -> usize {
        self.by_code.values().map(RosterSubset::len).sum()
    }
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub table: Table,
    pub matched: usize,
}

/// Join one template against one roster subset, keeping every template row.
///
/// Output has exactly one row per template row, in template order, with the
/// fixed `Class, RollNumber, FullName, Mark, Note` schema. The mark is copied
/// verbatim. `Note` is the roster SlotType, or null when that is blank.
pub fn merge(
    file: &str,
    subset: &RosterSubset,
    template: &Table,
    cols: &TemplateColumns,
) -> Result<MergeOutcome, MergeError> {
    let login_ci = template.column_index(&cols.login).ok_or_else(|| MergeError::Schema {
        file: file.into(),
        detail: format!("template has no '{}' column", cols.login),
    })?;
    let mark_ci = template.column_index(&cols.mark).ok_or_else(|| MergeError::Schema {
        file: file.into(),
        detail: format!("template has no '{}' column", cols.mark),
    })?;
    let name_ci = template.column_index(&cols.full_name);

    let mut rows = Vec::with_capacity(template.row_count());
    let mut matched = 0;

    for r in 0..template.row_count() {
        let login = canonical_key(template.cell(r, login_ci));
        let mark = template.cell(r, mark_ci).clone();

        let record = match login.as_deref().and_then(|k| subset.get(k)) {
            Some(entry) => {
                matched += 1;
                let full_name = match name_ci {
                    Some(ci) => template.cell(r, ci).clone(),
                    None if !entry.full_name.is_empty() => entry.full_name.clone(),
                    None => Value::text(entry.roll_number.clone()),
                };
                MergedRecord {
                    class: entry.class.clone(),
                    roll_number: Value::text(entry.roll_number.clone()),
                    full_name,
                    mark,
                    note: if entry.slot_type.is_empty() {
                        Value::Empty
                    } else {
                        Value::text(entry.slot_type.clone())
                    },
                }
            }
            // Unmatched: only the key and the mark survive
            None => MergedRecord {
                class: Value::Empty,
                roll_number: login.map(Value::Text).unwrap_or_default(),
                full_name: Value::Empty,
                mark,
                note: Value::Empty,
            },
        };
        rows.push(record.into_row());
    }

    let table = Table::new(OUTPUT_COLUMNS.iter().map(|c| c.to_string()).collect(), rows);
    debug_assert_eq!(table.row_count(), template.row_count());
    Ok(MergeOutcome { table, matched })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Table {
        Table::new(
            vec![
                "RollNumber".into(),
                "SubjectCode".into(),
                "GroupName".into(),
                "SlotType".into(),
            ],
            vec![
                vec![Value::text("S001"), Value::text("CS101"), Value::text("K1"), Value::text("Retake")],
                vec![Value::text(" s002"), Value::text("cs101"), Value::text("K1"), Value::Empty],
                vec![Value::text("S003"), Value::text("MA201"), Value::text("K2"), Value::text("")],
                vec![Value::Empty, Value::text("CS101"), Value::text("K9"), Value::Empty],
            ],
        )
    }

    fn template(rows: Vec<(&str, Value)>) -> Table {
        Table::new(
            vec!["Login".into(), "Mark(10)".into()],
            rows.into_iter()
                .map(|(l, m)| vec![if l.is_empty() { Value::Empty } else { Value::text(l) }, m])
                .collect(),
        )
    }

    fn index() -> RosterIndex {
        RosterIndex::build("roster.xlsx", &roster(), &RosterColumns::default()).unwrap()
    }

    #[test]
    fn index_groups_by_canonical_code() {
        let idx = index();
        assert_eq!(idx.codes().into_iter().collect::<Vec<_>>(), vec!["CS101", "MA201"]);
        assert_eq!(idx.subset("CS101").unwrap().len(), 2);
        assert_eq!(idx.skipped_rows, 1);
        assert!(!idx.has_full_name);
    }

    #[test]
    fn roster_without_key_column_is_rejected() {
        let t = Table::new(vec!["RollNumber".into()], vec![]);
        let err = RosterIndex::build("r.xlsx", &t, &RosterColumns::default()).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("SubjectCode"));
    }

    #[test]
    fn duplicate_roll_numbers_keep_first() {
        let t = Table::new(
            vec!["RollNumber".into(), "SubjectCode".into(), "GroupName".into()],
            vec![
                vec![Value::text("S1"), Value::text("A"), Value::text("first")],
                vec![Value::text("s1 "), Value::text("A"), Value::text("second")],
            ],
        );
        let idx = RosterIndex::build("r.xlsx", &t, &RosterColumns::default()).unwrap();
        assert_eq!(idx.duplicates, vec![("A".to_string(), "S1".to_string())]);
        assert_eq!(idx.subset("A").unwrap().get("S1").unwrap().class, Value::text("first"));
    }

    #[test]
    fn matched_row_takes_roster_fields() {
        let idx = index();
        let tpl = template(vec![("s001", Value::Number(8.5))]);
        let out = merge("CS101_tpl.xlsx", idx.subset("CS101").unwrap(), &tpl, &TemplateColumns::default()).unwrap();
        assert_eq!(out.matched, 1);
        assert_eq!(out.table.columns, OUTPUT_COLUMNS);
        assert_eq!(
            out.table.rows[0],
            vec![
                Value::text("K1"),
                Value::text("S001"),
                Value::text("S001"),
                Value::Number(8.5),
                Value::text("Retake"),
            ]
        );
    }

    #[test]
    fn empty_slot_type_gives_null_note() {
        let idx = index();
        let tpl = template(vec![("S002", Value::Number(7.0))]);
        let out = merge("t", idx.subset("CS101").unwrap(), &tpl, &TemplateColumns::default()).unwrap();
        assert_eq!(out.table.rows[0][4], Value::Empty);
    }

    #[test]
    fn unmatched_rows_are_kept() {
        let idx = index();
        let tpl = template(vec![
            ("S001", Value::Number(9.0)),
            ("nobody", Value::text("absent")),
            ("", Value::Number(3.0)),
        ]);
        let out = merge("t", idx.subset("CS101").unwrap(), &tpl, &TemplateColumns::default()).unwrap();
        assert_eq!(out.table.row_count(), 3);
        assert_eq!(out.matched, 1);
        assert_eq!(
            out.table.rows[1],
            vec![Value::Empty, Value::text("NOBODY"), Value::Empty, Value::text("absent"), Value::Empty]
        );
        assert_eq!(out.table.rows[2][1], Value::Empty);
        assert_eq!(out.table.rows[2][3], Value::Number(3.0));
    }

    #[test]
    fn empty_subset_still_emits_every_row() {
        let tpl = template(vec![("S001", Value::Number(1.0)), ("S002", Value::Number(2.0))]);
        let out = merge("t", &RosterSubset::new(), &tpl, &TemplateColumns::default()).unwrap();
        assert_eq!(out.table.row_count(), 2);
        assert_eq!(out.matched, 0);
        for row in &out.table.rows {
            assert_eq!(row[0], Value::Empty);
            assert_eq!(row[4], Value::Empty);
        }
    }

    #[test]
    fn template_full_name_wins() {
        let idx = index();
        let tpl = Table::new(
            vec!["Login".into(), "FullName".into(), "Mark(10)".into()],
            vec![
                vec![Value::text("S001"), Value::text("Nguyen Van A"), Value::Number(6.0)],
                vec![Value::text("X9"), Value::text("Walk In"), Value::Number(4.0)],
            ],
        );
        let out = merge("t", idx.subset("CS101").unwrap(), &tpl, &TemplateColumns::default()).unwrap();
        assert_eq!(out.table.rows[0][2], Value::text("Nguyen Van A"));
    }

    #[test]
    fn unmatched_row_drops_template_full_name() {
        let tpl = Table::new(
            vec!["Login".into(), "FullName".into(), "Mark(10)".into()],
            vec![vec![Value::text("X9"), Value::text("Walk In"), Value::Number(4.0)]],
        );
        let out = merge("t", &RosterSubset::new(), &tpl, &TemplateColumns::default()).unwrap();
        assert_eq!(
            out.table.rows[0],
            vec![Value::Empty, Value::text("X9"), Value::Empty, Value::Number(4.0), Value::Empty]
        );
    }

    #[test]
    fn short_rows_in_hand_built_table_read_as_null() {
        let idx = index();
        let tpl = Table {
            columns: vec!["Login".into(), "Mark(10)".into()],
            rows: vec![vec![Value::text("S001")], vec![]],
        };
        let out = merge("t", idx.subset("CS101").unwrap(), &tpl, &TemplateColumns::default()).unwrap();
        assert_eq!(out.table.row_count(), 2);
        assert_eq!(out.table.rows[0][1], Value::text("S001"));
        assert_eq!(out.table.rows[0][3], Value::Empty);
        assert_eq!(out.table.rows[1], vec![Value::Empty; 5]);
    }

    #[test]
    fn roster_full_name_used_when_template_has_none() {
        let t = Table::new(
            vec!["RollNumber".into(), "SubjectCode".into(), "FullName".into()],
            vec![vec![Value::text("S1"), Value::text("A"), Value::text("Tran B")]],
        );
        let idx = RosterIndex::build("r", &t, &RosterColumns::default()).unwrap();
        assert!(idx.has_full_name);
        let tpl = template(vec![("s1", Value::Number(5.0))]);
        let out = merge("t", idx.subset("A").unwrap(), &tpl, &TemplateColumns::default()).unwrap();
        assert_eq!(out.table.rows[0][2], Value::text("Tran B"));
    }

    #[test]
    fn marks_pass_through_unvalidated() {
        let idx = index();
        let tpl = template(vec![("S001", Value::Number(42.0)), ("S002", Value::text("N/A"))]);
        let out = merge("t", idx.subset("CS101").unwrap(), &tpl, &TemplateColumns::default()).unwrap();
        assert_eq!(out.table.rows[0][3], Value::Number(42.0));
        assert_eq!(out.table.rows[1][3], Value::text("N/A"));
    }

    #[test]
    fn missing_mark_column_is_schema_error() {
        let tpl = Table::new(vec!["Login".into()], vec![vec![Value::text("S1")]]);
        let err = merge("t.xlsx", &RosterSubset::new(), &tpl, &TemplateColumns::default()).unwrap_err();
        assert!(matches!(err, MergeError::Schema { .. }));
    }
}
