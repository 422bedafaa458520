use std::path::{Path, PathBuf};

use crate::JobError;
use crate::config::FilePattern;

use super::helpers::display_path;

/// Regular files directly inside `source_dir` whose names match `pattern`,
/// sorted by name. Subdirectories are never descended into.
pub(super) fn enumerate_candidates(
    source_dir: &Path,
    pattern: &FilePattern,
) -> Result<Vec<PathBuf>, JobError> {
    let rd = std::fs::read_dir(source_dir).map_err(|e| {
        JobError::Validation(format!("cannot read {}: {}", display_path(source_dir), e))
    })?;
    let mut files: Vec<(String, PathBuf)> = Vec::new();
    for ent in rd {
        let ent = match ent {
            Ok(ent) => ent,
            Err(e) => {
                tracing::warn!(dir = %display_path(source_dir), "skipping unreadable entry: {}", e);
                continue;
            }
        };
        let Some(name) = ent.file_name().to_str().map(str::to_string) else {
            tracing::warn!(entry = ?ent.file_name(), "skipping file with non UTF-8 name");
            continue;
        };
        if !pattern.matches(&name) {
            continue;
        }
        let full = ent.path();
        // follows symlinks, so a link to a regular file counts as a file
        match std::fs::metadata(&full) {
            Ok(md) if md.is_file() => files.push((name, full)),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(file = %display_path(&full), "skipping, stat failed: {}", e);
            }
        }
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files.into_iter().map(|(_, p)| p).collect())
}
