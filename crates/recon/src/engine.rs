use std::collections::BTreeSet;

use rayon::prelude::*;

use crate::config::MergeConfig;
use crate::coverage::{audit, coverage_warnings};
use crate::emit::{emit, OUTPUT_EXTENSION};
use crate::error::{Diagnostic, MergeError};
use crate::extract::{code_from_column, code_from_file_name};
use crate::guard::ensure_unprocessed;
use crate::locate::{locate_sheet, locate_template, TemplateSignature};
use crate::merge::{merge, MergeOutcome, RosterIndex, RosterSubset};
use crate::model::{MergeInput, MergeMeta, MergeResult, MergeSummary, SourceFile};
use crate::naming::NameRegistry;
use crate::normalize::normalize_columns;

/// A template that made it through schema location, extraction and merge.
struct PreparedTemplate {
    source: String,
    code: String,
    outcome: MergeOutcome,
    has_roster: bool,
}

/// Run one merge. Returns outputs plus warnings, or a single fatal error.
///
/// Guards run on every input before anything else; a pre-processed file
/// aborts the run. Templates are then merged in parallel and named in
/// submission order.
pub fn run(config: &MergeConfig, input: &MergeInput) -> Result<MergeResult, MergeError> {
    if input.templates.is_empty() {
        return Err(MergeError::rejected(&input.roster.name, "no template files supplied"));
    }

    ensure_unprocessed(&input.roster, "roster", &config.guard)?;
    for template in &input.templates {
        ensure_unprocessed(template, "template", &config.guard)?;
    }

    let mut diagnostics = Vec::new();
    let index = load_roster(&input.roster, config, &mut diagnostics)?;
    log::info!(
        "roster '{}': {} student-subject rows across {} subject(s)",
        input.roster.name,
        index.student_count(),
        index.codes().len()
    );

    let empty = RosterSubset::new();
    let prepared: Vec<Result<PreparedTemplate, MergeError>> = input
        .templates
        .par_iter()
        .map(|src| prepare_template(src, &index, &empty, config))
        .collect();

    let registry = NameRegistry::new(&config.output.suffix, OUTPUT_EXTENSION);
    let mut template_codes = BTreeSet::new();
    let mut outputs = Vec::new();
    let mut skipped = 0;

    for result in prepared {
        match result {
            Ok(p) => {
                template_codes.insert(p.code.clone());
                if !p.has_roster {
                    diagnostics.push(Diagnostic::warning(
                        Some(&p.source),
                        format!("no roster data for subject {}; Class and Note left empty", p.code),
                    ));
                }
                outputs.push(emit(&p.code, &p.source, p.outcome, &registry, config));
            }
            Err(err) => {
                log::debug!("skipping template: {err}");
                skipped += 1;
                diagnostics.push(Diagnostic::from(&err));
            }
        }
    }

    if outputs.is_empty() {
        return Err(MergeError::rejected(
            &input.templates[0].name,
            format!(
                "none of the {} template file(s) could be used: {}",
                input.templates.len(),
                diagnostics.iter().map(|d| d.message.as_str()).collect::<Vec<_>>().join("; ")
            ),
        ));
    }

    let coverage = audit(&index.codes(), &template_codes);
    diagnostics.extend(coverage_warnings(&coverage));

    let summary = MergeSummary {
        templates_submitted: input.templates.len(),
        templates_merged: outputs.len(),
        templates_skipped: skipped,
        rows_written: outputs.iter().map(|o| o.rows).sum(),
        rows_matched: outputs.iter().map(|o| o.matched).sum(),
        warnings: diagnostics.len(),
    };

    Ok(MergeResult {
        meta: MergeMeta {
            roster: input.roster.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        coverage,
        outputs,
        diagnostics,
    })
}

/// Decode, locate and index the roster. Any failure here is fatal.
fn load_roster(
    source: &SourceFile,
    config: &MergeConfig,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<RosterIndex, MergeError> {
    let workbook = source
        .workbook
        .as_ref()
        .map_err(|e| MergeError::rejected(&source.name, format!("cannot decode roster: {e}")))?;

    let cols = &config.roster;
    let sheet = locate_sheet(workbook, &[cols.roll_number.as_str(), cols.subject_code.as_str()]).ok_or_else(|| {
        MergeError::rejected(
            &source.name,
            format!("no sheet with '{}' and '{}' columns", cols.roll_number, cols.subject_code),
        )
    })?;
    log::debug!("roster sheet '{}' in '{}'", sheet.name, source.name);

    let index = RosterIndex::build(&source.name, &sheet.table, cols)?;
    if index.student_count() == 0 {
        return Err(MergeError::rejected(&source.name, "roster has no rows with a RollNumber and SubjectCode"));
    }

    if index.skipped_rows > 0 {
        diagnostics.push(Diagnostic::warning(
            Some(&source.name),
            format!("{} roster row(s) without RollNumber or SubjectCode ignored", index.skipped_rows),
        ));
    }
    for (code, roll) in &index.duplicates {
        diagnostics.push(Diagnostic::warning(
            Some(&source.name),
            format!("duplicate roster row for {roll} in {code}; first occurrence used"),
        ));
    }

    Ok(index)
}

fn prepare_template(
    source: &SourceFile,
    index: &RosterIndex,
    empty: &RosterSubset,
    config: &MergeConfig,
) -> Result<PreparedTemplate, MergeError> {
    let workbook = source.workbook.as_ref().map_err(|e| MergeError::Decode {
        file: source.name.clone(),
        detail: e.clone(),
    })?;

    let cols = &config.template;
    let (sheet, signature) = locate_template(workbook, cols).ok_or_else(|| MergeError::Schema {
        file: source.name.clone(),
        detail: format!("no sheet with '{}' and '{}' columns", cols.login, cols.mark),
    })?;

    let code = match signature {
        TemplateSignature::CodeBearing => code_from_column(&source.name, &sheet.table, &cols.exam_code)?,
        TemplateSignature::Minimal => code_from_file_name(&source.name)?,
    };
    log::debug!("template '{}': sheet '{}', code {code} ({signature:?})", source.name, sheet.name);

    let table = normalize_columns(&sheet.table, &[cols.login.as_str()]);
    let subset = index.subset(&code);
    let outcome = merge(&source.name, subset.unwrap_or(empty), &table, cols)?;

    Ok(PreparedTemplate {
        source: source.name.clone(),
        code,
        outcome,
        has_roster: subset.is_some_and(|s| !s.is_empty()),
    })
}
