// File I/O: spreadsheet and CSV loading, xlsx output, zip bundling

pub mod bundle;
pub mod csv;
pub mod xlsx;

use std::path::Path;

use markmerge_recon::model::{SourceFile, Workbook};

/// Input formats the loader understands, keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Excel,
    Delimited,
}

impl SourceKind {
    pub fn from_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Some(Self::Excel),
            "csv" | "tsv" => Some(Self::Delimited),
            _ => None,
        }
    }
}

/// Load one submitted file. Failures are carried in the returned
/// [`SourceFile`] so the engine can still guard and report it.
pub fn load_source(path: &Path) -> SourceFile {
    let name = csv::file_name(path);
    into_source(&name, load_workbook(&name, path))
}

/// Same as [`load_source`], for an in-memory upload.
pub fn load_source_bytes(name: &str, bytes: Vec<u8>) -> SourceFile {
    let result = match SourceKind::from_name(name) {
        Some(SourceKind::Excel) => xlsx::import_from_bytes(name, bytes),
        Some(SourceKind::Delimited) => csv::import_from_bytes(name, &bytes),
        None => Err(unsupported(name)),
    };
    into_source(name, result)
}

fn load_workbook(name: &str, path: &Path) -> Result<Workbook, String> {
    match SourceKind::from_name(name) {
        Some(SourceKind::Excel) => xlsx::import(path),
        Some(SourceKind::Delimited) => csv::import(path),
        None => Err(unsupported(name)),
    }
}

fn into_source(name: &str, result: Result<Workbook, String>) -> SourceFile {
    match result {
        Ok(workbook) => SourceFile::decoded(workbook),
        Err(e) => {
            log::debug!("could not load '{name}': {e}");
            SourceFile::failed(name, e)
        }
    }
}

fn unsupported(name: &str) -> String {
    format!("unsupported file type '{name}' (expected .xlsx, .xls, .xlsb, .ods or .csv)")
}
