use std::fs::create_dir_all;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;
use tracing::error;

use crate::PersistError;

fn io_error(
    path: &Path,
    source: std::io::Error,
) -> PersistError {
    PersistError::Io {
        path: path.to_path_buf(),
        source,
    }
}

pub fn create_parent_dir_if_not_exist(path: &Path) -> Result<(), PersistError> {
    if let Some(parent_dir) = path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            if let Err(e) = create_dir_all(parent_dir) {
                error!("Failed to create directory {:?}: {:?}", parent_dir, e);
                return Err(io_error(parent_dir, e));
            }
            debug!("created successfully: {:?}", parent_dir);
        }
    }
    Ok(())
}

/// Replaces `path` with `content` so readers only ever see a complete file.
///
/// The content goes to a temporary file in the same directory, is synced, and
/// is then renamed over `path`. An existing file's permissions are kept; a new
/// file is world-readable.
pub fn replace_file_atomically(
    path: &Path,
    content: &[u8],
) -> Result<(), PersistError> {
    create_parent_dir_if_not_exist(path)?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| io_error(dir, e))?;
    tmp.write_all(content).map_err(|e| io_error(tmp.path(), e))?;

    let permissions = match std::fs::metadata(path) {
        Ok(meta) => Some(meta.permissions()),
        Err(_) => default_permissions(),
    };
    if let Some(permissions) = permissions {
        tmp.as_file()
            .set_permissions(permissions)
            .map_err(|e| io_error(tmp.path(), e))?;
    }
    tmp.as_file().sync_all().map_err(|e| io_error(tmp.path(), e))?;

    tmp.persist(path).map_err(|e| io_error(path, e.error))?;
    Ok(())
}

#[cfg(unix)]
fn default_permissions() -> Option<std::fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(std::fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<std::fs::Permissions> {
    None
}
