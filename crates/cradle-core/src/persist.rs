//! JSON save files for the carrying subsystem.
//!
//! A save is a single [`CarrySnapshot`] serialized as pretty JSON. Writes
//! go to a sibling temp file first and are renamed into place, so a crash
//! mid-write leaves the previous save intact.

use std::path::{Path, PathBuf};

use cradle_types::CarrySnapshot;
use tracing::info;

/// Errors from reading or writing save files.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// Filesystem failure.
    #[error("save file I/O failed for {path}: {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not a valid snapshot.
    #[error("save file {path} is malformed: {source}")]
    Json {
        /// The file involved.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },
}

/// Write `snapshot` to `path`, replacing any previous save.
///
/// # Errors
///
/// Returns [`PersistError`] if serialization or any filesystem step fails.
pub fn save_snapshot(path: &Path, snapshot: &CarrySnapshot) -> Result<(), PersistError> {
    let json = serde_json::to_vec_pretty(snapshot).map_err(|source| PersistError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| PersistError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(|source| PersistError::Io {
        path: tmp.clone(),
        source,
    })?;
    std::fs::rename(&tmp, path).map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    info!(
        path = %path.display(),
        tick = snapshot.saved_at_tick,
        relationships = snapshot.relationships.len(),
        cooldowns = snapshot.cooldowns.len(),
        "Snapshot saved"
    );
    Ok(())
}

/// Read the snapshot at `path`. Returns `Ok(None)` if there is no file.
///
/// # Errors
///
/// Returns [`PersistError`] if the file exists but cannot be read or
/// parsed.
pub fn load_snapshot(path: &Path) -> Result<Option<CarrySnapshot>, PersistError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(PersistError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let snapshot = serde_json::from_slice(&bytes).map_err(|source| PersistError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(snapshot))
}
