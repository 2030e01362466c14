//! `markmerge-recon`: roster/template reconciliation and idempotent merge engine.
//!
//! Pure engine crate: receives pre-loaded workbooks, returns merged tables,
//! coverage and diagnostics. No CLI or IO dependencies.

pub mod config;
pub mod coverage;
pub mod emit;
pub mod engine;
pub mod error;
pub mod extract;
pub mod guard;
pub mod locate;
pub mod merge;
pub mod model;
pub mod naming;
pub mod normalize;

pub use config::MergeConfig;
pub use engine::run;
pub use error::{Diagnostic, MergeError, Rejection, Severity};
pub use model::{MergeInput, MergeResult, NamedOutput, Sheet, SourceFile, Table, Value, Workbook};
