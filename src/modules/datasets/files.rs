use crate::log_info;
use crate::shared::errors::AppResult;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// `<output>/<name>`, created if missing.
pub fn stage_dir(output: &Path, name: &str) -> AppResult<PathBuf> {
    let dir = output.join(name);
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Files under `dir` (recursively) with the given extension, with their
/// byte sizes, sorted by path.
pub fn find_files(dir: &Path, extension: &str) -> AppResult<Vec<(PathBuf, u64)>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if matches {
            let size = entry.metadata()?.len();
            files.push((entry.into_path(), size));
        }
    }

    files.sort();
    Ok(files)
}

pub fn remove_stage_dir(dir: &Path) -> AppResult<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
        log_info!("Deleted data directory {}", dir.display());
    }
    Ok(())
}
