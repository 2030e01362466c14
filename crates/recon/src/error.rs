use std::fmt;

use serde::Serialize;

/// Why an input aborted the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// The file is itself merge output.
    AlreadyProcessed,
    /// Nothing usable was supplied (no templates, bad roster, every template skipped).
    Unusable,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MergeError {
    /// Fatal: the run aborts before any output is produced.
    InputRejected { file: String, reason: String, kind: Rejection },
    /// Required columns absent in every sheet of a file.
    Schema { file: String, detail: String },
    /// Code column present but holds no usable value.
    Extraction { file: String, detail: String },
    /// Storage layer could not decode the file.
    Decode { file: String, detail: String },
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty column name, bad suffix, etc.).
    ConfigValidation(String),
}

impl MergeError {
    pub fn rejected(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InputRejected { file: file.into(), reason: reason.into(), kind: Rejection::Unusable }
    }

    pub fn processed(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InputRejected { file: file.into(), reason: reason.into(), kind: Rejection::AlreadyProcessed }
    }

    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Self::InputRejected { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// True for errors that abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InputRejected { .. } | Self::ConfigParse(_) | Self::ConfigValidation(_)
        )
    }

    /// File the error is scoped to, if any.
    pub fn file(&self) -> Option<&str> {
        match self {
            Self::InputRejected { file, .. }
            | Self::Schema { file, .. }
            | Self::Extraction { file, .. }
            | Self::Decode { file, .. } => Some(file),
            Self::ConfigParse(_) | Self::ConfigValidation(_) => None,
        }
    }
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InputRejected { file, reason, .. } => {
                write!(f, "input rejected: '{file}': {reason}")
            }
            Self::Schema { file, detail } => write!(f, "'{file}': {detail}"),
            Self::Extraction { file, detail } => {
                write!(f, "'{file}': cannot extract subject code: {detail}")
            }
            Self::Decode { file, detail } => write!(f, "'{file}': cannot decode: {detail}"),
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
        }
    }
}

impl std::error::Error for MergeError {}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Non-fatal, run continues.
    Warning,
    /// Fatal, run aborts.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A (severity, message) pair surfaced to the caller alongside outputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(file: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            file: file.map(str::to_string),
            message: message.into(),
        }
    }
}

impl From<&MergeError> for Diagnostic {
    fn from(err: &MergeError) -> Self {
        Self {
            severity: if err.is_fatal() { Severity::Error } else { Severity::Warning },
            file: err.file().map(str::to_string),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}
