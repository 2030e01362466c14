//! `markmerge merge`, `check` and `validate-config`.

use std::path::{Path, PathBuf};

use serde::Serialize;

use markmerge_recon::guard;
use markmerge_recon::{MergeConfig, MergeInput, MergeResult};

use crate::exit_codes::{EXIT_ALREADY_PROCESSED, EXIT_COVERAGE_GAPS, EXIT_ERROR, EXIT_INVALID_CONFIG};
use crate::CliError;

pub struct MergeArgs {
    pub roster: PathBuf,
    pub templates: Vec<PathBuf>,
    pub out: PathBuf,
    pub zip: bool,
    pub json: bool,
    pub output: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub strict: bool,
    pub quiet: bool,
}

/// JSON report: the engine result plus the paths actually written.
#[derive(Serialize)]
struct MergeReport<'a> {
    #[serde(flatten)]
    result: &'a MergeResult,
    written: Vec<String>,
}

#[derive(Serialize)]
struct CheckEntry {
    file: String,
    processed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    evidence: Option<String>,
    /// False when only the file name could be judged.
    decoded: bool,
}

fn load_config(path: Option<&Path>) -> Result<MergeConfig, CliError> {
    let Some(path) = path else {
        return Ok(MergeConfig::default());
    };
    let config_str = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read config {}: {e}", path.display())))?;
    let config =
        MergeConfig::from_toml(&config_str).map_err(|e| CliError::new(EXIT_INVALID_CONFIG, e.to_string()))?;
    log::debug!("loaded config from {}", path.display());
    Ok(config)
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

// ============================================================================
// merge
// ============================================================================

pub fn cmd_merge(args: MergeArgs) -> Result<(), CliError> {
    if args.templates.iter().any(|t| t == &args.roster) {
        return Err(CliError::args(format!(
            "{} given as both roster and template",
            args.roster.display()
        )));
    }

    let config = load_config(args.config.as_deref())?;

    let input = MergeInput {
        roster: markmerge_io::load_source(&args.roster),
        templates: args.templates.iter().map(|p| markmerge_io::load_source(p)).collect(),
    };

    log::debug!("loaded roster {} and {} template(s)", args.roster.display(), input.templates.len());

    let result = markmerge_recon::run(&config, &input).map_err(|e| CliError::merge(&e))?;

    let written = if args.zip {
        let path = args.out.join(&config.output.bundle_name);
        markmerge_io::bundle::write_bundle(&result.outputs, &path).map_err(CliError::io)?;
        vec![display(&path)]
    } else {
        markmerge_io::bundle::write_outputs(&result.outputs, &args.out)
            .map_err(CliError::io)?
            .iter()
            .map(|p| display(p))
            .collect()
    };
    for path in &written {
        log::debug!("wrote {path}");
    }

    let report = MergeReport { result: &result, written };
    let json_str = serde_json::to_string_pretty(&report)
        .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
        if !args.quiet {
            eprintln!("wrote {}", path.display());
        }
    }

    if args.json {
        println!("{json_str}");
    }

    if !args.quiet {
        print_summary(&result, &report.written, args.zip);
    }

    if args.strict && !result.coverage.is_complete() {
        return Err(CliError::new(
            EXIT_COVERAGE_GAPS,
            format!(
                "coverage gaps: {} subject(s) without template, {} template subject(s) not in roster",
                result.coverage.missing.len(),
                result.coverage.extra.len()
            ),
        )
        .with_hint("outputs were still written; drop --strict to accept gaps"));
    }

    Ok(())
}

/// Human summary to stderr.
fn print_summary(result: &MergeResult, written: &[String], zipped: bool) {
    let s = &result.summary;
    eprintln!(
        "merged {} of {} template(s) against {}: {} row(s), {} matched",
        s.templates_merged, s.templates_submitted, result.meta.roster, s.rows_written, s.rows_matched,
    );

    for d in &result.diagnostics {
        eprintln!("  {d}");
    }

    if zipped {
        if let Some(path) = written.first() {
            eprintln!("bundled {} file(s) into {path}", result.outputs.len());
        }
    } else {
        for path in written {
            eprintln!("wrote {path}");
        }
    }
}

// ============================================================================
// check
// ============================================================================

pub fn cmd_check(files: Vec<PathBuf>, json: bool, config: Option<PathBuf>) -> Result<(), CliError> {
    let config = load_config(config.as_deref())?;

    let entries: Vec<CheckEntry> = files
        .iter()
        .map(|path| {
            let source = markmerge_io::load_source(path);
            let evidence = guard::inspect(&source, &config.guard);
            CheckEntry {
                file: display(path),
                processed: evidence.is_some(),
                evidence: evidence.map(|e| e.to_string()),
                decoded: source.workbook.is_ok(),
            }
        })
        .collect();

    if json {
        let json_str = serde_json::to_string_pretty(&entries)
            .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    } else {
        for entry in &entries {
            match (&entry.evidence, entry.decoded) {
                (Some(ev), _) => eprintln!("processed  {}: {ev}", entry.file),
                (None, true) => eprintln!("ok         {}", entry.file),
                (None, false) => eprintln!("ok         {} (not decodable, judged by name only)", entry.file),
            }
        }
    }

    let processed = entries.iter().filter(|e| e.processed).count();
    if processed > 0 {
        return Err(CliError::new(
            EXIT_ALREADY_PROCESSED,
            format!("{processed} of {} file(s) look like merge output", entries.len()),
        ));
    }
    Ok(())
}

// ============================================================================
// validate-config
// ============================================================================

pub fn cmd_validate_config(path: PathBuf) -> Result<(), CliError> {
    let config = load_config(Some(&path))?;
    eprintln!(
        "valid: roster keys '{}'/'{}', template columns '{}'/'{}', outputs '{{code}}{}.xlsx'",
        config.roster.roll_number,
        config.roster.subject_code,
        config.template.login,
        config.template.mark,
        config.output.suffix,
    );
    Ok(())
}
