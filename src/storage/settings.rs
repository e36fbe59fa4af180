//! Per-entity settings documents
//!
//! `SettingsStore` only composes paths and performs file I/O; it never
//! touches the directory mirror, so it can be cloned onto blocking worker
//! threads while the event loop keeps running.

use log::{debug, error};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::constants::{DATA_FILE, SETTINGS_FILE};
use crate::identifier::{is_valid_provider_ident, is_valid_service_id};
use crate::keyfile::Document;
use crate::models::StorageError;
use crate::storage::paths::{provider_entry, vpn_entry, StoragePaths};
use crate::storage::persistence;

#[derive(Debug, Clone)]
pub struct SettingsStore {
    paths: StoragePaths,
}

impl SettingsStore {
    pub fn new(paths: StoragePaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    pub fn load_global(&self) -> Result<Document, StorageError> {
        persistence::load(&self.paths.global_settings())
    }

    pub fn save_global(&self, document: &Document) -> Result<(), StorageError> {
        persistence::save(document, &self.paths.global_settings())
    }

    pub fn delete_global(&self) {
        persistence::delete(&self.paths.global_settings());
    }

    /// Read-only static configuration `<root>/<ident>.config`
    pub fn load_config(&self, ident: &str) -> Result<Document, StorageError> {
        persistence::load(&self.paths.config(ident))
    }

    /// Read-only provider configuration `<vpn root>/<ident>.config`
    pub fn load_provider_config(&self, ident: &str) -> Result<Document, StorageError> {
        persistence::load(&self.paths.provider_config(ident))
    }

    /// Load a service document, or start an empty one when none exists yet.
    ///
    /// The first save of the returned document creates the record.
    pub fn open_service(&self, service_id: &str) -> Result<Document, StorageError> {
        match self.load_service(service_id) {
            Ok(document) => Ok(document),
            Err(StorageError::NotFound(_)) => Ok(Document::new()),
            Err(e) => Err(e),
        }
    }

    pub fn load_service(&self, service_id: &str) -> Result<Document, StorageError> {
        check_service_id(service_id)?;
        persistence::load(&self.paths.service_settings(service_id))
    }

    pub fn save_service(&self, document: &Document, service_id: &str) -> Result<(), StorageError> {
        check_service_id(service_id)?;
        persistence::save(document, &self.paths.service_settings(service_id))
    }

    /// Remove the settings file, the statistics file and the directory of a
    /// service. Stops at the first step that fails for a reason other than
    /// the target already being gone.
    pub fn remove_service(&self, service_id: &str) -> bool {
        if !is_valid_service_id(service_id) {
            return false;
        }

        if !self.remove_file(service_id, SETTINGS_FILE) {
            return false;
        }

        if !self.remove_file(service_id, DATA_FILE) {
            return false;
        }

        if !self.remove_dir(service_id) {
            return false;
        }

        debug!("Removed service dir {}", self.paths.entry_dir(service_id).display());
        true
    }

    pub fn load_provider(&self, ident: &str) -> Result<Document, StorageError> {
        check_provider_ident(ident)?;
        persistence::load(&self.paths.provider_settings(ident))
    }

    pub fn save_provider(&self, document: &Document, ident: &str) -> Result<(), StorageError> {
        check_provider_ident(ident)?;
        persistence::save(document, &self.paths.provider_settings(ident))
    }

    /// Remove both the `provider_<ident>` and the `vpn_<ident>` directory.
    ///
    /// Both removals always run; the result is the one of the `vpn_` entry.
    pub fn remove_provider(&self, ident: &str) -> bool {
        if !is_valid_provider_ident(ident) {
            debug!("Provider identifier '{}' is not valid", ident);
            return false;
        }

        let id = provider_entry(ident);
        if self.remove_all(&id) {
            debug!("Removed provider dir {}", self.paths.entry_dir(&id).display());
        }

        let id = vpn_entry(ident);
        let removed = self.remove_all(&id);
        if removed {
            debug!("Removed vpn dir {}", self.paths.entry_dir(&id).display());
        }

        removed
    }

    fn remove_all(&self, entry: &str) -> bool {
        self.remove_file(entry, SETTINGS_FILE);
        self.remove_file(entry, DATA_FILE);
        self.remove_dir(entry)
    }

    fn remove_file(&self, entry: &str, file: &str) -> bool {
        let path = self.paths.entry_file(entry, file);
        remove_path(&path, |meta| meta.is_file(), |p| fs::remove_file(p))
    }

    fn remove_dir(&self, entry: &str) -> bool {
        let path = self.paths.entry_dir(entry);
        remove_path(&path, |meta| meta.is_dir(), |p| fs::remove_dir(p))
    }
}

/// Remove `path` when it has the expected type; absence is success
fn remove_path(
    path: &Path,
    expected: impl Fn(&fs::Metadata) -> bool,
    remove: impl Fn(&Path) -> std::io::Result<()>,
) -> bool {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return true,
        Err(e) => {
            error!("Failed to inspect {}: {}", path.display(), e);
            return false;
        }
    };

    if !expected(&meta) {
        debug!("Refusing to remove {}: unexpected file type", path.display());
        return false;
    }

    match remove(path) {
        Ok(()) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => true,
        Err(e) => {
            error!("Failed to remove {}: {}", path.display(), e);
            false
        }
    }
}

fn check_service_id(service_id: &str) -> Result<(), StorageError> {
    if is_valid_service_id(service_id) {
        Ok(())
    } else {
        Err(StorageError::InvalidIdentifier(service_id.to_string()))
    }
}

fn check_provider_ident(ident: &str) -> Result<(), StorageError> {
    if is_valid_provider_ident(ident) {
        Ok(())
    } else {
        Err(StorageError::InvalidIdentifier(ident.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    fn store() -> (TempDir, TempDir, SettingsStore) {
        let root = tempdir().unwrap();
        let vpn = tempdir().unwrap();
        let store = SettingsStore::new(StoragePaths::new(root.path(), vpn.path()));
        (root, vpn, store)
    }

    fn document(value: &str) -> Document {
        let mut doc = Document::new();
        doc.set("section", "Key", value).unwrap();
        doc
    }

    #[test]
    fn test_global_round_trip_and_delete() {
        let (root, _vpn, store) = store();
        assert!(matches!(store.load_global(), Err(StorageError::NotFound(_))));

        store.save_global(&document("on")).unwrap();
        assert_eq!(store.load_global().unwrap(), document("on"));
        assert!(root.path().join("settings").is_file());

        store.delete_global();
        assert!(!root.path().join("settings").exists());
        // Deleting again only logs
        store.delete_global();
    }

    #[test]
    fn test_open_service_returns_empty_document_when_missing() {
        let (_root, _vpn, store) = store();
        let doc = store.open_service("wifi_abc").unwrap();
        assert!(doc.is_empty());
    }

    #[test]
    fn test_open_service_rejects_invalid_id() {
        let (_root, _vpn, store) = store();
        let result = store.open_service("../escape");
        assert!(matches!(result, Err(StorageError::InvalidIdentifier(_))));
    }

    #[test]
    fn test_save_service_creates_directory() {
        let (root, _vpn, store) = store();
        store.save_service(&document("x"), "wifi_abc").unwrap();
        assert!(root.path().join("wifi_abc").is_dir());
        assert_eq!(store.load_service("wifi_abc").unwrap(), document("x"));
        assert_eq!(store.open_service("wifi_abc").unwrap(), document("x"));
    }

    #[test]
    fn test_save_service_invalid_id_touches_nothing() {
        let (root, _vpn, store) = store();
        let result = store.save_service(&document("x"), "bad-id");
        assert!(matches!(result, Err(StorageError::InvalidIdentifier(_))));
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_load_service_distinguishes_invalid_from_missing() {
        let (_root, _vpn, store) = store();
        assert!(matches!(store.load_service("bad-id"), Err(StorageError::InvalidIdentifier(_))));
        assert!(matches!(store.load_service("wifi_abc"), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_config_documents_are_read_from_their_roots() {
        let (root, vpn, store) = store();
        fs::write(root.path().join("office.config"), "[service_office]\nType=wifi\n").unwrap();
        fs::write(vpn.path().join("office.config"), "[provider_office]\nType=OpenVPN\n").unwrap();

        assert_eq!(store.load_config("office").unwrap().get("service_office", "Type"), Some("wifi"));
        assert_eq!(
            store.load_provider_config("office").unwrap().get("provider_office", "Type"),
            Some("OpenVPN")
        );
        assert!(matches!(store.load_config("missing"), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_remove_service_is_idempotent() {
        let (root, _vpn, store) = store();
        store.save_service(&document("x"), "wifi_abc").unwrap();
        fs::write(root.path().join("wifi_abc").join("data"), b"stats").unwrap();

        assert!(store.remove_service("wifi_abc"));
        assert!(!root.path().join("wifi_abc").exists());
        assert!(store.remove_service("wifi_abc"));
    }

    #[test]
    fn test_remove_service_aborts_on_unexpected_type() {
        let (root, _vpn, store) = store();
        let dir = root.path().join("wifi_abc");
        fs::create_dir_all(dir.join("settings")).unwrap();
        fs::write(dir.join("data"), b"stats").unwrap();

        assert!(!store.remove_service("wifi_abc"));
        // Partial state is left as is
        assert!(dir.join("data").exists());
    }

    #[test]
    fn test_remove_service_fails_on_non_empty_directory() {
        let (root, _vpn, store) = store();
        store.save_service(&document("x"), "wifi_abc").unwrap();
        fs::write(root.path().join("wifi_abc").join("other"), b"keep").unwrap();

        assert!(!store.remove_service("wifi_abc"));
        assert!(!root.path().join("wifi_abc").join("settings").exists());
        assert!(root.path().join("wifi_abc").join("other").exists());
    }

    #[test]
    fn test_provider_round_trip() {
        let (root, _vpn, store) = store();
        store.save_provider(&document("vpn"), "vpn1").unwrap();
        assert!(root.path().join("provider_vpn1").join("settings").is_file());
        assert_eq!(store.load_provider("vpn1").unwrap(), document("vpn"));
    }

    #[test]
    fn test_remove_provider_removes_both_eras() {
        let (root, _vpn, store) = store();
        store.save_provider(&document("a"), "vpn1").unwrap();
        fs::create_dir(root.path().join("vpn_vpn1")).unwrap();
        fs::write(root.path().join("vpn_vpn1").join("settings"), "[a]\nb=c\n").unwrap();

        assert!(store.remove_provider("vpn1"));
        assert!(!root.path().join("provider_vpn1").exists());
        assert!(!root.path().join("vpn_vpn1").exists());
    }

    #[test]
    fn test_remove_provider_result_follows_vpn_entry() {
        let (root, _vpn, store) = store();
        // provider_ entry cannot be removed, vpn_ entry is absent
        let provider_dir = root.path().join("provider_vpn1");
        fs::create_dir(&provider_dir).unwrap();
        fs::write(provider_dir.join("keep"), b"x").unwrap();

        assert!(store.remove_provider("vpn1"));
        assert!(provider_dir.exists());
    }

    #[test]
    fn test_remove_provider_rejects_path_escapes() {
        let (_root, _vpn, store) = store();
        assert!(!store.remove_provider(""));
        assert!(!store.remove_provider("a/b"));
    }
}
