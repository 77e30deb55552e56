//! Input discovery: files are taken as given, directories are walked for
//! files the frontend understands.

use std::fs;
use std::path::{Path, PathBuf};

use bx_core::source::SourceFile;
use bx_core::span::FileId;
use bx_lang::SourceFrontend;
use walkdir::WalkDir;

use crate::{CliError, Result};

/// Expands `inputs` into a sorted, de-duplicated list of source files.
pub fn collect_sources(inputs: &[PathBuf], frontend: &dyn SourceFrontend) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for entry in WalkDir::new(input).follow_links(true) {
                let entry = entry.map_err(|err| {
                    CliError::InvalidInput(format!("cannot walk {}: {}", input.display(), err))
                })?;
                if entry.file_type().is_file() && has_source_extension(entry.path(), frontend) {
                    files.push(entry.into_path());
                }
            }
        } else if input.is_file() {
            files.push(input.clone());
        } else {
            return Err(CliError::InvalidInput(format!(
                "{} does not exist",
                input.display()
            )));
        }
    }
    files.sort();
    files.dedup();
    tracing::debug!(inputs = inputs.len(), files = files.len(), "collected sources");
    Ok(files)
}

fn has_source_extension(path: &Path, frontend: &dyn SourceFrontend) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            frontend
                .extensions()
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

pub fn read_source(id: FileId, path: &Path) -> Result<SourceFile> {
    let text = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(SourceFile::new(id, path.display().to_string(), text))
}
