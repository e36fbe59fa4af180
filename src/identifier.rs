//! Identifier validation
//!
//! Classifies storage directory names as services or providers and checks
//! that service identifiers form valid D-Bus object paths. All predicates
//! are pure; the service and provider predicates are independent and a
//! name may satisfy neither.

use log::debug;
use crate::constants::{PROVIDER_PREFIX, SERVICE_PATH_ROOT};

/// Check whether `path` is a syntactically valid D-Bus object path
pub fn is_valid_object_path(path: &str) -> bool {
    let Some(rest) = path.strip_prefix('/') else {
        return false;
    };

    if rest.is_empty() {
        return true;
    }

    rest.split('/').all(|element| {
        !element.is_empty()
            && element.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
    })
}

/// Check whether `id` can be published as `/net/connman/service/<id>`
pub fn is_valid_service_id(id: &str) -> bool {
    let valid = is_valid_object_path(&format!("{}/{}", SERVICE_PATH_ROOT, id));
    if !valid {
        debug!("Service ID '{}' is not valid", id);
    }
    valid
}

/// Directory name belongs to a service
pub fn is_service_dir_name(name: &str) -> bool {
    !name.starts_with(PROVIDER_PREFIX) && is_valid_service_id(name)
}

/// Directory name belongs to a provider
pub fn is_provider_dir_name(name: &str) -> bool {
    name.starts_with(PROVIDER_PREFIX)
}

/// Provider identifiers are embedded in a single path component
pub fn is_valid_provider_ident(ident: &str) -> bool {
    !ident.is_empty()
        && ident != "."
        && ident != ".."
        && !ident.contains('/')
        && !ident.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_path_root() {
        assert!(is_valid_object_path("/"));
    }

    #[test]
    fn test_object_path_rules() {
        assert!(is_valid_object_path("/net/connman/service/wifi_abc"));
        assert!(!is_valid_object_path(""));
        assert!(!is_valid_object_path("net/connman"));
        assert!(!is_valid_object_path("/net/connman/"));
        assert!(!is_valid_object_path("/net//connman"));
        assert!(!is_valid_object_path("/net/conn-man"));
        assert!(!is_valid_object_path("/net/conn.man"));
    }

    #[test]
    fn test_service_ids() {
        assert!(is_valid_service_id("wifi_001122334455_6e6574_managed_psk"));
        assert!(is_valid_service_id("ethernet_0800277a1b2c_cable"));
        assert!(!is_valid_service_id(""));
        assert!(!is_valid_service_id("wifi/abc"));
        assert!(!is_valid_service_id("wifi-abc"));
        assert!(!is_valid_service_id("vpn.example.com"));
    }

    #[test]
    fn test_provider_prefix_never_a_service() {
        for name in ["provider_vpn1", "provider_", "provider_a_b_c"] {
            assert!(is_provider_dir_name(name));
            assert!(!is_service_dir_name(name), "{} must not classify as a service", name);
        }
    }

    #[test]
    fn test_predicates_are_not_complements() {
        // Malformed non-provider names satisfy neither predicate
        let name = "not-a-service";
        assert!(!is_provider_dir_name(name));
        assert!(!is_service_dir_name(name));
    }

    #[test]
    fn test_vpn_prefix_is_a_service_name() {
        // Only the provider_ prefix is reserved
        assert!(is_service_dir_name("vpn_example_com"));
        assert!(!is_provider_dir_name("vpn_example_com"));
    }

    #[test]
    fn test_provider_idents() {
        assert!(is_valid_provider_ident("example_com"));
        assert!(is_valid_provider_ident("vpn.example.com"));
        assert!(!is_valid_provider_ident(""));
        assert!(!is_valid_provider_ident(".."));
        assert!(!is_valid_provider_ident("a/b"));
    }
}
