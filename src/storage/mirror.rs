//! Directory mirror and change-event synchronizer
//!
//! Keeps an in-memory record of every sub-directory of the storage root and
//! whether it currently holds a `settings` file. The mirror is built lazily
//! on the first query, then kept current from change notifications: one
//! watch on the root reports sub-directories appearing and disappearing,
//! and one watch per sub-directory reports its `settings` file coming and
//! going.
//!
//! Every record owns exactly one sub-directory watch. Records are only
//! inserted after their watch was registered and watches are unregistered
//! before their record is dropped.

use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::SETTINGS_FILE;
use crate::models::{MirrorStatus, StorageError, SubdirRecord, WatchEvent, WatchEventKind};
use crate::storage::watch::Watcher;

pub struct DirectoryMirror<W: Watcher> {
    root: PathBuf,
    watcher: W,
    initialized: bool,
    subdirs: Vec<SubdirRecord>,
}

impl<W: Watcher> DirectoryMirror<W> {
    pub fn new(root: impl Into<PathBuf>, watcher: W) -> Self {
        Self {
            root: root.into(),
            watcher,
            initialized: false,
            subdirs: Vec::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn watcher(&self) -> &W {
        &self.watcher
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn records(&self) -> &[SubdirRecord] {
        &self.subdirs
    }

    pub fn record(&self, name: &str) -> Option<&SubdirRecord> {
        self.subdirs.iter().find(|r| r.name == name)
    }

    /// Scan the storage root and start watching it, unless already done.
    ///
    /// An unreadable root leaves the mirror uninitialized; the next call
    /// tries again.
    pub fn ensure_initialized(&mut self) -> Result<(), StorageError> {
        if self.initialized {
            return Ok(());
        }

        debug!("Initializing storage directories.");

        let entries = fs::read_dir(&self.root).map_err(|e| StorageError::RootUnavailable {
            path: self.root.clone(),
            source: e,
        })?;

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable entry in {}: {}", self.root.display(), e);
                    continue;
                }
            };

            let is_dir = match entry.file_type() {
                Ok(file_type) if file_type.is_dir() => true,
                Ok(file_type) if file_type.is_file() => false,
                // Symlinks and unknown types are resolved with stat
                _ => fs::metadata(entry.path()).map(|m| m.is_dir()).unwrap_or(false),
            };

            if is_dir {
                self.append(&entry.file_name().to_string_lossy());
            }
        }

        if let Err(e) = self.watcher.register(&self.root) {
            warn!("Cannot watch storage root: {}", e);
            self.drop_records();
            return Err(e);
        }

        self.initialized = true;
        debug!("Initialization done, {} directories tracked.", self.subdirs.len());
        Ok(())
    }

    /// Stop watching and forget every record
    pub fn cleanup(&mut self) {
        if !self.initialized {
            return;
        }

        debug!("Cleaning up storage directories.");

        self.watcher.unregister(&self.root);
        self.drop_records();
        self.initialized = false;

        debug!("Cleanup done.");
    }

    /// Apply one change notification
    pub fn handle_event(&mut self, event: &WatchEvent) {
        if !self.initialized {
            debug!("Ignoring event for {} while uninitialized", event.watch.display());
            return;
        }

        if event.watch == self.root {
            self.handle_root_event(event);
            return;
        }

        let index = event
            .watch
            .strip_prefix(&self.root)
            .ok()
            .and_then(|rel| rel.to_str())
            .and_then(|name| self.subdirs.iter().position(|r| r.name == name));

        match index {
            Some(index) => self.handle_subdir_event(index, event),
            None => debug!("No record for {}, event dropped", event.watch.display()),
        }
    }

    /// Names of records holding a settings file and accepted by `predicate`
    pub fn list_names(&self, predicate: impl Fn(&str) -> bool) -> Vec<String> {
        self.subdirs
            .iter()
            .filter(|r| r.has_settings && predicate(&r.name))
            .map(|r| r.name.clone())
            .collect()
    }

    pub fn status(&self) -> MirrorStatus {
        MirrorStatus {
            storage_dir: self.root.clone(),
            initialized: self.initialized,
            subdirs: self.subdirs.len(),
            with_settings: self.subdirs.iter().filter(|r| r.has_settings).count(),
        }
    }

    fn handle_root_event(&mut self, event: &WatchEvent) {
        if event.kind == WatchEventKind::SelfDeleted {
            debug!("delete self");
            self.cleanup();
            return;
        }

        // Only interested in subdirectories here
        if !event.is_dir {
            return;
        }

        if event.is_disappearance() {
            debug!("delete/move-from {}", event.name);
            self.remove(&event.name);
        } else if event.is_appearance() {
            debug!("create/move-to {}", event.name);
            self.append(&event.name);
        }
    }

    fn handle_subdir_event(&mut self, index: usize, event: &WatchEvent) {
        // Only interested in files here
        if event.is_dir || event.name != SETTINGS_FILE {
            return;
        }

        let path = self.root.join(&self.subdirs[index].name).join(SETTINGS_FILE);
        let record = &mut self.subdirs[index];

        if event.is_disappearance() {
            debug!("{}: settings removed", record.name);
            record.has_settings = false;
        } else if event.is_appearance() {
            match fs::metadata(&path) {
                Ok(meta) if meta.is_file() => {
                    debug!("{}: settings created", record.name);
                    record.has_settings = true;
                }
                Ok(_) => debug!("{} is not a regular file", path.display()),
                Err(e) => debug!("stat {}: {}", path.display(), e),
            }
        }
    }

    fn append(&mut self, name: &str) {
        let path = self.root.join(name);

        if let Some(record) = self.subdirs.iter_mut().find(|r| r.name == name) {
            record.has_settings = is_settings_file(&path);
            return;
        }

        // Watch first so a settings file created right after the scan is not missed
        if let Err(e) = self.watcher.register(&path) {
            warn!("Not tracking {}: {}", name, e);
            return;
        }

        let has_settings = is_settings_file(&path);
        debug!("{} tracked, has_settings {}", name, has_settings);

        self.subdirs.push(SubdirRecord {
            name: name.to_string(),
            has_settings,
        });
    }

    fn remove(&mut self, name: &str) {
        if let Some(pos) = self.subdirs.iter().position(|r| r.name == name) {
            self.watcher.unregister(&self.root.join(name));
            let record = self.subdirs.remove(pos);
            debug!("{} no longer tracked", record.name);
        }
    }

    fn drop_records(&mut self) {
        for record in self.subdirs.drain(..) {
            self.watcher.unregister(&self.root.join(&record.name));
        }
    }
}

/// `<dir>/settings` exists and is a regular file, following symlinks
fn is_settings_file(dir: &Path) -> bool {
    fs::metadata(dir.join(SETTINGS_FILE))
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}
