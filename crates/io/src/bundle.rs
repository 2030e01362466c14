// Output writing: one xlsx per subject, optionally packed into a zip bundle

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use markmerge_recon::model::NamedOutput;

use crate::xlsx;

/// Write each output as `<dir>/<file_name>`. Returns the paths written.
pub fn write_outputs(outputs: &[NamedOutput], dir: &Path) -> Result<Vec<PathBuf>, String> {
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("cannot create {}: {}", dir.display(), e))?;

    let mut written = Vec::with_capacity(outputs.len());
    for output in outputs {
        let path = dir.join(&output.file_name);
        xlsx::export(&output.workbook, &path)?;
        log::debug!("wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}

/// Pack every output into a single deflated zip at `path`.
pub fn write_bundle(outputs: &[NamedOutput], path: &Path) -> Result<usize, String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("cannot create {}: {}", parent.display(), e))?;
    }

    let file = File::create(path).map_err(|e| format!("cannot create {}: {}", path.display(), e))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for output in outputs {
        let bytes = xlsx::export_to_buffer(&output.workbook)?;
        zip.start_file(output.file_name.as_str(), options)
            .map_err(|e| format!("zip entry '{}': {}", output.file_name, e))?;
        zip.write_all(&bytes)
            .map_err(|e| format!("zip entry '{}': {}", output.file_name, e))?;
    }

    zip.finish()
        .map_err(|e| format!("cannot finish {}: {}", path.display(), e))?;
    log::info!("bundled {} file(s) into {}", outputs.len(), path.display());
    Ok(outputs.len())
}
