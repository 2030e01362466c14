// markmerge CLI - fill per-subject mark templates from a student roster

mod exit_codes;
mod merge;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::{merge_exit_code, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};
use markmerge_recon::{MergeError, Rejection};

#[derive(Parser)]
#[command(name = "markmerge")]
#[command(about = "Merge per-subject mark templates with a student roster")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge templates with the roster and write one filled workbook per template
    #[command(after_help = "\
Exit codes: 0 ok, 3 an input is already merge output, 4 nothing usable, \
5 read/write failure, 6 bad config, 7 coverage gaps with --strict.

Examples:
  markmerge merge roster.xlsx CS101_tpl.xlsx SWD392_tpl.xlsx
  markmerge merge roster.xlsx templates/*.xlsx --out filled/
  markmerge merge roster.xlsx templates/*.xlsx --zip --out dist/
  markmerge merge roster.xlsx templates/*.xlsx --json -q | jq .coverage
  markmerge merge roster.csv CS101.csv --config merge.toml --strict")]
    Merge {
        /// Roster workbook (.xlsx, .xls, .xlsb, .ods or .csv)
        roster: PathBuf,

        /// Template workbooks, one or more, merged in the order given
        #[arg(required = true)]
        templates: Vec<PathBuf>,

        /// Directory for output workbooks (or the bundle with --zip)
        #[arg(long, short = 'o', default_value = ".")]
        out: PathBuf,

        /// Pack every output into a single zip bundle
        #[arg(long)]
        zip: bool,

        /// Output JSON report to stdout
        #[arg(long)]
        json: bool,

        /// Write JSON report to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// TOML config overriding column names, suffixes and output naming
        #[arg(long, env = "MARKMERGE_CONFIG")]
        config: Option<PathBuf>,

        /// Exit non-zero when roster subjects and templates do not line up
        #[arg(long)]
        strict: bool,

        /// Quiet mode - only print errors
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Report which files already look like merge output
    #[command(after_help = "\
Exit code 3 if any file looks pre-processed.

Examples:
  markmerge check roster.xlsx CS101_tpl.xlsx
  markmerge check downloads/*.xlsx --json")]
    Check {
        /// Files to inspect
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output JSON to stdout instead of a human summary
        #[arg(long)]
        json: bool,

        /// TOML config (processed suffixes and marker sheet name)
        #[arg(long, env = "MARKMERGE_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Validate a merge config without running
    #[command(after_help = "\
Examples:
  markmerge validate-config merge.toml")]
    ValidateConfig {
        /// Path to the TOML config file
        path: PathBuf,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  markmerge-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

/// Log to stderr. `MARKMERGE_LOG` wins over `RUST_LOG`; quiet runs only show errors.
fn init_logging(quiet: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if quiet { "markmerge=error" } else { "markmerge=info" };
    let filter = EnvFilter::try_from_env("MARKMERGE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let quiet = matches!(cli.command, Commands::Merge { quiet: true, .. });
    init_logging(quiet);

    let result = match cli.command {
        Commands::Merge { roster, templates, out, zip, json, output, config, strict, quiet } => {
            merge::cmd_merge(merge::MergeArgs {
                roster,
                templates,
                out,
                zip,
                json,
                output,
                config,
                strict,
                quiet,
            })
        }
        Commands::Check { files, json, config } => merge::cmd_check(files, json, config),
        Commands::ValidateConfig { path } => merge::cmd_validate_config(path),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_IO, msg)
    }

    /// Create error from a fatal engine error with the matching exit code.
    pub fn merge(err: &MergeError) -> Self {
        let code = merge_exit_code(err);
        let hint = match err.rejection() {
            Some(Rejection::AlreadyProcessed) => {
                Some("pass the original roster and templates, not files markmerge produced".to_string())
            }
            Some(Rejection::Unusable) => Some("set MARKMERGE_LOG=debug for per-file detail".to_string()),
            None => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
