//! Load/save/delete of a single settings document
//!
//! Documents are never cached: every load re-reads and every save rewrites
//! the whole file. Saves go through a temporary file in the target
//! directory followed by a rename, so a failed save leaves the previous
//! content in place. Saved files get mode 0666 minus the process umask,
//! the same as any other newly created file.

use log::{debug, error};
use std::fs::{DirBuilder, Permissions};
use std::io::{ErrorKind, Write};
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::Path;
use tempfile::Builder;

use crate::constants::{DIR_MODE, FILE_MODE};
use crate::keyfile::Document;
use crate::models::StorageError;

/// Read and parse the document at `path`.
///
/// A missing or unparsable file is reported as `NotFound`.
pub fn load(path: &Path) -> Result<Document, StorageError> {
    debug!("Loading {}", path.display());

    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            debug!("Unable to load {}: {}", path.display(), e);
            return Err(StorageError::NotFound(path.to_path_buf()));
        }
    };

    Document::parse(&text).map_err(|e| {
        debug!("Unable to parse {}: {}", path.display(), e);
        StorageError::NotFound(path.to_path_buf())
    })
}

/// Serialize `document` and atomically replace the file at `path`
pub fn save(document: &Document, path: &Path) -> Result<(), StorageError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    create_entry_dir(parent)?;

    let data = document.to_data();

    // The mode is passed to open(2), so the umask still applies
    let mut file = Builder::new()
        .prefix(".settings")
        .permissions(Permissions::from_mode(FILE_MODE))
        .tempfile_in(parent)
        .map_err(|e| StorageError::io(parent, e))?;
    file.write_all(data.as_bytes())
        .and_then(|_| file.as_file().sync_all())
        .map_err(|e| StorageError::io(path, e))?;
    file.persist(path).map_err(|e| StorageError::io(path, e.error))?;

    debug!("Stored {} ({} bytes)", path.display(), data.len());
    Ok(())
}

/// Remove the file at `path`; failures are logged only
pub fn delete(path: &Path) {
    debug!("file path {}", path.display());

    if let Err(e) = std::fs::remove_file(path) {
        error!("Failed to remove {}: {}", path.display(), e);
    }
}

/// Create a single per-entity directory with mode rwxr-xr-x.
///
/// An already existing directory counts as success.
pub fn create_entry_dir(path: &Path) -> Result<(), StorageError> {
    if path.is_dir() {
        return Ok(());
    }

    match DirBuilder::new().mode(DIR_MODE).create(path) {
        Ok(()) => {
            debug!("Created directory {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(StorageError::io(path, e)),
    }
}
