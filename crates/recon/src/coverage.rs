use std::collections::BTreeSet;

use crate::error::Diagnostic;
use crate::model::CoverageReport;

/// `missing = roster − templates`, `extra = templates − roster`.
pub fn audit(roster_codes: &BTreeSet<String>, template_codes: &BTreeSet<String>) -> CoverageReport {
    CoverageReport {
        missing: roster_codes.difference(template_codes).cloned().collect(),
        extra: template_codes.difference(roster_codes).cloned().collect(),
    }
}

/// Both gaps as non-fatal warnings; nothing when coverage is complete.
pub fn coverage_warnings(report: &CoverageReport) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    if !report.missing.is_empty() {
        out.push(Diagnostic::warning(
            None,
            format!("no template for subject(s): {}", join(&report.missing)),
        ));
    }
    if !report.extra.is_empty() {
        out.push(Diagnostic::warning(
            None,
            format!("template subject(s) not in roster: {}", join(&report.extra)),
        ));
    }
    out
}

fn join(codes: &BTreeSet<String>) -> String {
    codes.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}
