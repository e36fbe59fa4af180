//! Path composition for every settings document class

use std::path::{Path, PathBuf};
use crate::constants::{CONFIG_SUFFIX, PROVIDER_PREFIX, SETTINGS_FILE, VPN_PREFIX};

/// Storage roots all document paths are derived from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePaths {
    storage_dir: PathBuf,
    vpn_storage_dir: PathBuf,
}

impl StoragePaths {
    pub fn new(storage_dir: impl Into<PathBuf>, vpn_storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            vpn_storage_dir: vpn_storage_dir.into(),
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn vpn_storage_dir(&self) -> &Path {
        &self.vpn_storage_dir
    }

    /// `<root>/settings`
    pub fn global_settings(&self) -> PathBuf {
        self.storage_dir.join(SETTINGS_FILE)
    }

    /// `<root>/<entry>`
    pub fn entry_dir(&self, entry: &str) -> PathBuf {
        self.storage_dir.join(entry)
    }

    /// `<root>/<entry>/<file>`
    pub fn entry_file(&self, entry: &str, file: &str) -> PathBuf {
        self.entry_dir(entry).join(file)
    }

    /// `<root>/<service_id>/settings`
    pub fn service_settings(&self, service_id: &str) -> PathBuf {
        self.entry_file(service_id, SETTINGS_FILE)
    }

    /// `<root>/<ident>.config`
    pub fn config(&self, ident: &str) -> PathBuf {
        self.storage_dir.join(format!("{}{}", ident, CONFIG_SUFFIX))
    }

    /// `<vpn root>/<ident>.config`
    pub fn provider_config(&self, ident: &str) -> PathBuf {
        self.vpn_storage_dir.join(format!("{}{}", ident, CONFIG_SUFFIX))
    }

    /// `<root>/provider_<ident>/settings`
    pub fn provider_settings(&self, ident: &str) -> PathBuf {
        self.entry_file(&provider_entry(ident), SETTINGS_FILE)
    }
}

/// Directory name of a provider: `provider_<ident>`
pub fn provider_entry(ident: &str) -> String {
    format!("{}{}", PROVIDER_PREFIX, ident)
}

/// Directory name of a provider written by the VPN daemon: `vpn_<ident>`
pub fn vpn_entry(ident: &str) -> String {
    format!("{}{}", VPN_PREFIX, ident)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> StoragePaths {
        StoragePaths::new("/var/lib/connman", "/var/lib/connman-vpn")
    }

    #[test]
    fn test_global_settings_path() {
        assert_eq!(paths().global_settings(), PathBuf::from("/var/lib/connman/settings"));
    }

    #[test]
    fn test_service_paths() {
        let p = paths();
        assert_eq!(
            p.service_settings("wifi_abc"),
            PathBuf::from("/var/lib/connman/wifi_abc/settings")
        );
        assert_eq!(p.entry_file("wifi_abc", "data"), PathBuf::from("/var/lib/connman/wifi_abc/data"));
        assert_eq!(p.entry_dir("wifi_abc"), PathBuf::from("/var/lib/connman/wifi_abc"));
    }

    #[test]
    fn test_config_paths() {
        let p = paths();
        assert_eq!(p.config("office"), PathBuf::from("/var/lib/connman/office.config"));
        assert_eq!(p.provider_config("office"), PathBuf::from("/var/lib/connman-vpn/office.config"));
    }

    #[test]
    fn test_provider_paths() {
        assert_eq!(
            paths().provider_settings("vpn1"),
            PathBuf::from("/var/lib/connman/provider_vpn1/settings")
        );
        assert_eq!(provider_entry("vpn1"), "provider_vpn1");
        assert_eq!(vpn_entry("vpn1"), "vpn_vpn1");
    }
}
