//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                                        |
//! |------|----------------------------------------------------------------|
//! | 0    | Success                                                        |
//! | 1    | General error (unspecified)                                    |
//! | 2    | CLI usage error (bad args)                                     |
//! | 3    | An input is already merge output (name suffix or marker sheet) |
//! | 4    | Nothing usable: no templates, bad roster, every template skipped |
//! | 5    | Reading inputs or writing outputs failed                       |
//! | 6    | Config file invalid                                            |
//! | 7    | Merge completed with coverage gaps and `--strict` was given    |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use markmerge_recon::{MergeError, Rejection};

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// An input carries the processed suffix or marker sheet.
pub const EXIT_ALREADY_PROCESSED: u8 = 3;

/// The run had nothing to merge.
pub const EXIT_NOTHING_USABLE: u8 = 4;

/// Filesystem failure reading config or writing outputs.
pub const EXIT_IO: u8 = 5;

/// Config parse or validation failure.
pub const EXIT_INVALID_CONFIG: u8 = 6;

/// Coverage gaps found under `--strict`. Outputs are still written.
pub const EXIT_COVERAGE_GAPS: u8 = 7;

/// Map a fatal engine error to its exit code.
pub fn merge_exit_code(err: &MergeError) -> u8 {
    match err {
        MergeError::InputRejected { kind: Rejection::AlreadyProcessed, .. } => EXIT_ALREADY_PROCESSED,
        MergeError::InputRejected { kind: Rejection::Unusable, .. } => EXIT_NOTHING_USABLE,
        MergeError::ConfigParse(_) | MergeError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        // File-scoped errors never escape the engine as fatal
        MergeError::Schema { .. } | MergeError::Extraction { .. } | MergeError::Decode { .. } => EXIT_ERROR,
    }
}
