//! Storage module
//!
//! Ties the directory mirror to the per-entity document store:
//! - `paths`: path composition per document class
//! - `persistence`: load/save/delete of a single document
//! - `settings`: per-entity document API (global, service, provider)
//! - `mirror`: directory mirror driven by change notifications
//! - `watch`: notification source abstraction and its `notify` backend

pub mod mirror;
pub mod paths;
pub mod persistence;
pub mod settings;
pub mod watch;

use log::debug;

use crate::identifier::{is_provider_dir_name, is_service_dir_name};
use crate::models::{MirrorStatus, StorageError, WatchEvent};
use mirror::DirectoryMirror;
use paths::StoragePaths;
use settings::SettingsStore;
use watch::Watcher;

/// Storage context: one per storage root, owned by the event-loop task
pub struct Storage<W: Watcher> {
    settings: SettingsStore,
    mirror: DirectoryMirror<W>,
}

impl<W: Watcher> Storage<W> {
    pub fn new(paths: StoragePaths, watcher: W) -> Self {
        let mirror = DirectoryMirror::new(paths.storage_dir(), watcher);
        Self {
            settings: SettingsStore::new(paths),
            mirror,
        }
    }

    /// Document operations; they never consult the mirror
    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn mirror(&self) -> &DirectoryMirror<W> {
        &self.mirror
    }

    /// Identifiers of services with a settings document
    pub fn list_services(&mut self) -> Vec<String> {
        self.list(is_service_dir_name)
    }

    /// Directory names (`provider_<ident>`) of providers with a settings document
    pub fn list_providers(&mut self) -> Vec<String> {
        self.list(is_provider_dir_name)
    }

    /// Scan the storage root now instead of on the first listing
    pub fn initialize(&mut self) -> Result<(), StorageError> {
        self.mirror.ensure_initialized()
    }

    pub fn handle_event(&mut self, event: &WatchEvent) {
        self.mirror.handle_event(event);
    }

    pub fn status(&self) -> MirrorStatus {
        self.mirror.status()
    }

    /// Explicit teardown: releases every watch
    pub fn shutdown(&mut self) {
        self.mirror.cleanup();
    }

    fn list(&mut self, predicate: fn(&str) -> bool) -> Vec<String> {
        if let Err(e) = self.mirror.ensure_initialized() {
            debug!("{}", e);
            return Vec::new();
        }
        self.mirror.list_names(predicate)
    }
}
