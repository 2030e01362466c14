// Excel import (xlsx, xlsm, xls, xlsb, ods) and xlsx export

use std::io::{Cursor, Read, Seek};
use std::path::Path;
use std::time::Instant;

use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Reader, SheetType, SheetVisible, Sheets};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook, Worksheet};

use markmerge_recon::model::{Sheet, Table, Value, Workbook};

use crate::csv::file_name;

/// Import an Excel file from disk (xlsx, xlsm, xls, xlsb, ods).
pub fn import(path: &Path) -> Result<Workbook, String> {
    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open Excel file: {}", e))?;
    read_sheets(&file_name(path), &mut workbook)
}

/// Import an Excel file already held in memory (e.g. an upload).
pub fn import_from_bytes(name: &str, bytes: Vec<u8>) -> Result<Workbook, String> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| format!("Failed to open Excel file: {}", e))?;
    read_sheets(name, &mut workbook)
}

/// Decode every sheet in file order. The first row of each sheet's used
/// range is its header; fully blank rows below it are dropped.
fn read_sheets<RS: Read + Seek>(name: &str, workbook: &mut Sheets<RS>) -> Result<Workbook, String> {
    let start_time = Instant::now();
    let metadata: Vec<calamine::Sheet> = workbook.sheets_metadata().to_vec();

    if metadata.is_empty() {
        return Err("Excel file contains no sheets".to_string());
    }

    let mut sheets = Vec::with_capacity(metadata.len());
    for meta in &metadata {
        let hidden = !matches!(meta.visible, SheetVisible::Visible);

        let range = match workbook.worksheet_range(&meta.name) {
            Ok(range) => range,
            // Chart and dialog sheets have no cell range but still count as sheets
            Err(_) if meta.typ != SheetType::WorkSheet => {
                sheets.push(Sheet { name: meta.name.clone(), table: Table::default(), hidden });
                continue;
            }
            Err(e) => return Err(format!("Failed to read sheet '{}': {}", meta.name, e)),
        };

        let mut rows = range.rows();
        let columns: Vec<String> = rows
            .next()
            .map(|header| header.iter().map(|c| cell_to_value(c).to_string()).collect())
            .unwrap_or_default();

        let body: Vec<Vec<Value>> = rows
            .map(|r| r.iter().map(cell_to_value).collect::<Vec<_>>())
            .filter(|r| r.iter().any(|v| !v.is_empty()))
            .collect();

        sheets.push(Sheet { name: meta.name.clone(), table: Table::new(columns, body), hidden });
    }

    log::debug!(
        "imported '{}': {} sheet(s) in {}ms",
        name,
        sheets.len(),
        start_time.elapsed().as_millis()
    );
    Ok(Workbook::new(name, sheets))
}

fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Empty,
        Data::String(s) if s.is_empty() => Value::Empty,
        Data::String(s) => Value::Text(s.clone()),
        Data::Float(n) => Value::Number(*n),
        Data::Int(n) => Value::Number(*n as f64),
        Data::Bool(b) => Value::Bool(*b),
        Data::Error(e) => Value::Text(format!("#{:?}", e)),
        // Dates stay serial numbers; marks and keys are never dates
        Data::DateTime(dt) => Value::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::Text(s.clone()),
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ExportResult {
    pub sheets_exported: usize,
    pub hidden_sheets: usize,
    pub cells_exported: usize,
    pub export_duration_ms: u128,
}

/// Write a workbook to disk as xlsx, preserving sheet order and visibility.
pub fn export(workbook: &Workbook, path: &Path) -> Result<ExportResult, String> {
    let start_time = Instant::now();
    let (mut xlsx, mut result) = build(workbook)?;
    xlsx.save(path)
        .map_err(|e| format!("Failed to save XLSX file: {}", e))?;
    result.export_duration_ms = start_time.elapsed().as_millis();
    Ok(result)
}

/// Serialize a workbook to xlsx bytes (for bundling).
pub fn export_to_buffer(workbook: &Workbook) -> Result<Vec<u8>, String> {
    let (mut xlsx, _) = build(workbook)?;
    xlsx.save_to_buffer()
        .map_err(|e| format!("Failed to serialize XLSX '{}': {}", workbook.name, e))
}

fn build(workbook: &Workbook) -> Result<(XlsxWorkbook, ExportResult), String> {
    if workbook.sheets.iter().all(|s| s.hidden) {
        return Err(format!("'{}' needs at least one visible sheet", workbook.name));
    }

    let mut xlsx = XlsxWorkbook::new();
    let mut result = ExportResult::default();
    let header_format = Format::new().set_bold();

    for sheet in &workbook.sheets {
        let worksheet = xlsx
            .add_worksheet()
            .set_name(&sheet.name)
            .map_err(|e| format!("Failed to create sheet '{}': {}", sheet.name, e))?;

        result.cells_exported += export_table(worksheet, &sheet.table, &header_format)?;

        if sheet.hidden {
            worksheet.set_hidden(true);
            result.hidden_sheets += 1;
        } else {
            worksheet.autofit();
        }
        result.sheets_exported += 1;
    }

    Ok((xlsx, result))
}

fn export_table(worksheet: &mut Worksheet, table: &Table, header_format: &Format) -> Result<usize, String> {
    let mut cells = 0;
    let err = |e: rust_xlsxwriter::XlsxError| format!("Failed to write cell: {}", e);

    for (col, name) in table.columns.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, name, header_format)
            .map_err(err)?;
        cells += 1;
    }

    for (r, row) in table.rows.iter().enumerate() {
        let row_num = (r + 1) as u32;
        for (c, value) in row.iter().enumerate() {
            let col = c as u16;
            match value {
                Value::Empty => continue,
                Value::Text(s) => worksheet.write_string(row_num, col, s).map_err(err)?,
                Value::Number(n) => worksheet.write_number(row_num, col, *n).map_err(err)?,
                Value::Bool(b) => worksheet.write_boolean(row_num, col, *b).map_err(err)?,
            };
            cells += 1;
        }
    }

    Ok(cells)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Workbook {
        let data = Table::new(
            vec!["Class".into(), "RollNumber".into(), "FullName".into(), "Mark".into(), "Note".into()],
            vec![
                vec![Value::text("K1"), Value::text("S001"), Value::text("An"), Value::Number(8.5), Value::text("Retake")],
                vec![Value::Empty, Value::text("X9"), Value::Empty, Value::text("N/A"), Value::Empty],
            ],
        );
        let marker = Table::new(vec!["processed_by".into()], vec![vec![Value::text("markmerge")]]);
        Workbook::new(
            "CS101_filled.xlsx",
            vec![
                Sheet::new("Sheet1", data),
                Sheet { name: "__markmerge_processed".into(), table: marker, hidden: true },
            ],
        )
    }

    #[test]
    fn test_export_then_import_keeps_values_and_visibility() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("CS101_filled.xlsx");

        let result = export(&sample(), &path).unwrap();
        assert_eq!(result.sheets_exported, 2);
        assert_eq!(result.hidden_sheets, 1);
        // data: 5 headers + 5 + 2 values; marker: 1 header + 1 value
        assert_eq!(result.cells_exported, 14);

        let wb = import(&path).unwrap();
        assert_eq!(wb.name, "CS101_filled.xlsx");
        assert_eq!(wb.sheet_names().collect::<Vec<_>>(), vec!["Sheet1", "__markmerge_processed"]);
        assert!(!wb.sheets[0].hidden);
        assert!(wb.sheets[1].hidden);

        let t = &wb.sheets[0].table;
        assert_eq!(t.columns, vec!["Class", "RollNumber", "FullName", "Mark", "Note"]);
        assert_eq!(t.rows[0][3], Value::Number(8.5));
        assert_eq!(t.rows[1][0], Value::Empty);
        assert_eq!(t.rows[1][3], Value::text("N/A"));
        assert_eq!(t.rows[1][4], Value::Empty);
    }

    #[test]
    fn test_buffer_import() {
        let bytes = export_to_buffer(&sample()).unwrap();
        assert!(bytes.len() > 100);
        let wb = import_from_bytes("upload.xlsx", bytes).unwrap();
        assert_eq!(wb.name, "upload.xlsx");
        assert_eq!(wb.sheets.len(), 2);
    }

    #[test]
    fn test_all_hidden_rejected() {
        let mut wb = sample();
        wb.sheets.remove(0);
        assert!(export_to_buffer(&wb).is_err());
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        let err = import_from_bytes("x.xlsx", b"not a spreadsheet".to_vec()).unwrap_err();
        assert!(err.contains("Failed to open Excel file"));
    }

    #[test]
    fn test_blank_rows_dropped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("t.xlsx");
        let mut xlsx = XlsxWorkbook::new();
        let ws = xlsx.add_worksheet();
        ws.write_string(0, 0, "Login").unwrap();
        ws.write_string(0, 1, "Mark(10)").unwrap();
        ws.write_string(1, 0, "s1").unwrap();
        ws.write_number(1, 1, 7).unwrap();
        ws.write_string(3, 0, "s2").unwrap();
        xlsx.save(&path).unwrap();

        let wb = import(&path).unwrap();
        let t = &wb.sheets[0].table;
        assert_eq!(t.row_count(), 2);
        assert_eq!(t.rows[1], vec![Value::text("s2"), Value::Empty]);
    }
}
