//! Global constants for connstore
//!
//! Centralized location for file names, naming prefixes and default paths

/// Application identifier used in structured log events
pub const APP_SUBSYSTEM: &str = "net.connman.storage";

/// Default daemon category for structured logging
pub const DAEMON_CATEGORY: &str = "daemon";

/// File holding an entity's settings document
pub const SETTINGS_FILE: &str = "settings";

/// Per-service statistics file removed alongside the settings
pub const DATA_FILE: &str = "data";

/// Suffix of read-only static configuration templates
pub const CONFIG_SUFFIX: &str = ".config";

/// Prefix of provider directories under the storage root
pub const PROVIDER_PREFIX: &str = "provider_";

/// Prefix of provider directories written by the VPN daemon
pub const VPN_PREFIX: &str = "vpn_";

/// D-Bus object path under which services are published
pub const SERVICE_PATH_ROOT: &str = "/net/connman/service";

/// Mode for per-entity directories: rwxr-xr-x
pub const DIR_MODE: u32 = 0o755;

/// Mode requested for settings files, before the umask is applied
pub const FILE_MODE: u32 = 0o666;

/// Default storage root
pub const DEFAULT_STORAGE_DIR: &str = "/var/lib/connman";

/// Default root of the VPN provider configuration files
pub const DEFAULT_VPN_STORAGE_DIR: &str = "/var/lib/connman-vpn";

/// Default IPC socket path
pub const DEFAULT_SOCKET_PATH: &str = "/run/connstore/connstore.sock";

/// Default daemon configuration file
pub const DEFAULT_CONFIG_PATH: &str = "/etc/connstore/daemon.toml";

/// Daemon subcommand name
pub const DAEMON_SUBCOMMAND: &str = "daemon";
