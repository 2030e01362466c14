use serde::Deserialize;

use crate::error::MergeError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Column names, guard tokens and output naming for one run.
///
/// Every field has a default, so an empty TOML document is a valid config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergeConfig {
    #[serde(default)]
    pub roster: RosterColumns,
    #[serde(default)]
    pub template: TemplateColumns,
    #[serde(default)]
    pub guard: GuardConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RosterColumns {
    pub roll_number: String,
    pub subject_code: String,
    /// Source column renamed to `Class` in the output.
    pub class: String,
    pub slot_type: String,
    pub full_name: String,
}

impl Default for RosterColumns {
    fn default() -> Self {
        Self {
            roll_number: "RollNumber".into(),
            subject_code: "SubjectCode".into(),
            class: "GroupName".into(),
            slot_type: "SlotType".into(),
            full_name: "FullName".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Template
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplateColumns {
    pub login: String,
    pub mark: String,
    pub exam_code: String,
    pub full_name: String,
}

impl Default for TemplateColumns {
    fn default() -> Self {
        Self {
            login: "Login".into(),
            mark: "Mark(10)".into(),
            exam_code: "Exam Code".into(),
            full_name: "FullName".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Guard + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GuardConfig {
    /// File stems ending in one of these (case-insensitive) are merge output.
    pub processed_suffixes: Vec<String>,
    /// Reserved sheet whose presence marks a workbook as merge output.
    pub marker_sheet: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            processed_suffixes: vec!["_filled".into(), "_merged".into()],
            marker_sheet: "__markmerge_processed".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Appended to the subject code: `{code}{suffix}.xlsx`.
    pub suffix: String,
    pub data_sheet: String,
    pub bundle_name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            suffix: "_filled".into(),
            data_sheet: "Sheet1".into(),
            bundle_name: "FE_Merge.zip".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

const SHEET_NAME_FORBIDDEN: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

impl MergeConfig {
    pub fn from_toml(input: &str) -> Result<Self, MergeError> {
        let config: MergeConfig =
            toml::from_str(input).map_err(|e| MergeError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MergeError> {
        let columns = [
            ("roster.roll_number", &self.roster.roll_number),
            ("roster.subject_code", &self.roster.subject_code),
            ("roster.class", &self.roster.class),
            ("roster.slot_type", &self.roster.slot_type),
            ("roster.full_name", &self.roster.full_name),
            ("template.login", &self.template.login),
            ("template.mark", &self.template.mark),
            ("template.exam_code", &self.template.exam_code),
            ("template.full_name", &self.template.full_name),
        ];
        for (key, value) in columns {
            if value.trim().is_empty() {
                return Err(MergeError::ConfigValidation(format!("{key} must not be empty")));
            }
        }

        if self.guard.processed_suffixes.is_empty() {
            return Err(MergeError::ConfigValidation(
                "guard.processed_suffixes needs at least one suffix".into(),
            ));
        }
        for suffix in &self.guard.processed_suffixes {
            if !suffix.starts_with('_') || suffix.len() < 2 {
                return Err(MergeError::ConfigValidation(format!(
                    "processed suffix '{suffix}' must start with '_' and name a token"
                )));
            }
        }

        let marker = &self.guard.marker_sheet;
        if marker.is_empty() || marker.chars().count() > 31 || marker.contains(SHEET_NAME_FORBIDDEN) {
            return Err(MergeError::ConfigValidation(format!(
                "marker sheet '{marker}' is not a valid sheet name"
            )));
        }
        if marker.trim() == self.output.data_sheet.trim() {
            return Err(MergeError::ConfigValidation(
                "marker sheet and output data sheet must differ".into(),
            ));
        }

        // Output names must trip the filename guard.
        let out = self.output.suffix.to_lowercase();
        if !self.guard.processed_suffixes.iter().any(|s| s.to_lowercase() == out) {
            return Err(MergeError::ConfigValidation(format!(
                "output suffix '{}' is not listed in guard.processed_suffixes",
                self.output.suffix
            )));
        }

        if self.output.bundle_name.trim().is_empty() {
            return Err(MergeError::ConfigValidation("output.bundle_name must not be empty".into()));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
