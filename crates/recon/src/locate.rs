use std::collections::HashSet;

use crate::config::TemplateColumns;
use crate::model::{Sheet, Workbook};

/// Which required-column set a template sheet satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateSignature {
    /// `{Exam Code, Login, Mark(10)}`: code comes from the embedded column.
    CodeBearing,
    /// `{Login, Mark(10)}`: code comes from the file name.
    Minimal,
}

/// First sheet, in file order, whose trimmed headers cover `required`.
pub fn locate_sheet<'a>(workbook: &'a Workbook, required: &[&str]) -> Option<&'a Sheet> {
    workbook.sheets.iter().find(|sheet| {
        let headers: HashSet<&str> = sheet.table.columns.iter().map(|c| c.trim()).collect();
        required.iter().all(|r| headers.contains(r.trim()))
    })
}

/// Find the template data sheet and the signature it matched.
///
/// The code-bearing signature is tried across the whole workbook first, so a
/// later sheet with `Exam Code` beats an earlier minimal one.
pub fn locate_template<'a>(
    workbook: &'a Workbook,
    columns: &TemplateColumns,
) -> Option<(&'a Sheet, TemplateSignature)> {
    let code_bearing = [columns.exam_code.as_str(), columns.login.as_str(), columns.mark.as_str()];
    if let Some(sheet) = locate_sheet(workbook, &code_bearing) {
        return Some((sheet, TemplateSignature::CodeBearing));
    }
    let minimal = [columns.login.as_str(), columns.mark.as_str()];
    locate_sheet(workbook, &minimal).map(|sheet| (sheet, TemplateSignature::Minimal))
}
