use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::TransferError;

use super::helpers::display_path;

/// Move `src` into `dest_dir` under the same name. Never replaces an existing
/// file: a name collision is reported and the source stays where it is.
///
/// The new name is created with `hard_link`, which fails atomically when the
/// destination exists; only then is the source name removed. Where links are
/// not possible (another device, no link support) the content is copied into a
/// freshly created file instead.
pub(super) fn relocate(src: &Path, dest_dir: &Path) -> Result<PathBuf, TransferError> {
    let name = src.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    let dest = dest_dir.join(&name);
    match std::fs::hard_link(src, &dest) {
        Ok(()) => {
            if let Err(e) = std::fs::remove_file(src) {
                // leave exactly one name behind
                let _ = std::fs::remove_file(&dest);
                return Err(TransferError::RelocateFailed {
                    file: name,
                    reason: format!("removing the source failed: {}", e),
                });
            }
            Ok(dest)
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(TransferError::DestinationExists {
            file: name,
            dest: display_path(&dest).to_string(),
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(TransferError::RelocateFailed { file: name, reason: e.to_string() })
        }
        Err(e) => {
            tracing::debug!(file = %name, "hard link failed ({}), copying instead", e);
            copy_then_delete(src, &dest, &name)?;
            Ok(dest)
        }
    }
}

fn copy_then_delete(src: &Path, dest: &Path, name: &str) -> Result<(), TransferError> {
    let failed = |reason: String| TransferError::RelocateFailed { file: name.to_string(), reason };

    let mut input = File::open(src).map_err(|e| failed(format!("open source: {}", e)))?;
    let mut output = match OpenOptions::new().write(true).create_new(true).open(dest) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Err(TransferError::DestinationExists {
                file: name.to_string(),
                dest: display_path(dest).to_string(),
            });
        }
        Err(e) => return Err(failed(format!("create destination: {}", e))),
    };
    let copied = std::io::copy(&mut input, &mut output).and_then(|_| output.sync_all());
    if let Err(e) = copied {
        drop(output);
        let _ = std::fs::remove_file(dest);
        return Err(failed(format!("copy: {}", e)));
    }
    std::fs::remove_file(src).map_err(|e| {
        failed(format!("copied to {} but removing the source failed: {}", display_path(dest), e))
    })
}
