//! Data models module
//!
//! Defines core data structures:
//! - SubdirRecord: cached metadata for one storage sub-directory
//! - WatchEvent: a change notification scoped to one watched directory
//! - MirrorStatus: summary of the directory mirror for status queries
//! - StorageError: error taxonomy shared by persistence and the mirror

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Cached state of one immediate child directory of the storage root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubdirRecord {
    /// Directory name, unique within the mirror
    pub name: String,
    /// Whether `<root>/<name>/settings` currently exists as a file
    pub has_settings: bool,
}

/// Kind of change reported for a watched directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatchEventKind {
    Created,
    Deleted,
    RenamedFrom,
    RenamedTo,
    /// The watched directory itself was removed
    SelfDeleted,
}

/// A single change notification.
///
/// `watch` is the directory the registration was made for and `name` the
/// affected entry relative to it. For `SelfDeleted` the name is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub watch: PathBuf,
    pub kind: WatchEventKind,
    pub name: String,
    pub is_dir: bool,
}

impl WatchEvent {
    pub fn new(watch: impl Into<PathBuf>, kind: WatchEventKind, name: impl Into<String>, is_dir: bool) -> Self {
        Self {
            watch: watch.into(),
            kind,
            name: name.into(),
            is_dir,
        }
    }

    /// Event signalling that `watch` itself disappeared
    pub fn self_deleted(watch: impl Into<PathBuf>) -> Self {
        Self::new(watch, WatchEventKind::SelfDeleted, String::new(), true)
    }

    /// Created or moved into the watched directory
    pub fn is_appearance(&self) -> bool {
        matches!(self.kind, WatchEventKind::Created | WatchEventKind::RenamedTo)
    }

    /// Deleted or moved out of the watched directory
    pub fn is_disappearance(&self) -> bool {
        matches!(self.kind, WatchEventKind::Deleted | WatchEventKind::RenamedFrom)
    }
}

/// Snapshot of the directory mirror reported by the status query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorStatus {
    /// Storage root the mirror tracks
    pub storage_dir: PathBuf,
    /// Whether the initial scan has completed
    pub initialized: bool,
    /// Number of tracked sub-directories
    pub subdirs: usize,
    /// Number of tracked sub-directories holding a settings file
    pub with_settings: usize,
}

/// Errors raised by the storage layer
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid identifier: '{0}'")]
    InvalidIdentifier(String),

    #[error("Settings document not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage root unavailable: {}: {source}", path.display())]
    RootUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to watch {}: {message}", path.display())]
    Watch { path: PathBuf, message: String },
}

impl StorageError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}
