//! Structured logging for daemon lifecycle events
//!
//! Events are rendered as a message followed by a JSON payload and sent
//! through the `log` facade; `env_logger` is the backend.

use anyhow::{anyhow, Result};
use env_logger::Env;
use log::{error, info, LevelFilter};
use serde_json::json;
use std::path::Path;

use crate::models::MirrorStatus;

/// Daemon logger emitting structured events
#[derive(Debug, Clone)]
pub struct DaemonLogger {
    subsystem: String,
    category: String,
    level: LogLevel,
}

/// Log levels for daemon operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Info,
}

impl DaemonLogger {
    pub fn new(subsystem: String, category: String, level: LogLevel) -> Result<Self> {
        // Validate subsystem format (should be reverse DNS)
        if !subsystem.contains('.') {
            anyhow::bail!("Subsystem must be in reverse DNS format (e.g., 'net.example.app')");
        }

        Ok(Self {
            subsystem,
            category,
            level,
        })
    }

    /// Install the `env_logger` backend. `RUST_LOG` overrides `filter`.
    pub fn install(filter: LevelFilter) -> Result<()> {
        env_logger::Builder::from_env(Env::default().default_filter_or(filter.to_string()))
            .format_timestamp_millis()
            .try_init()
            .map_err(|e| anyhow!("Failed to set logger: {}", e))
    }

    pub fn log_startup(&self, config_path: &Path, storage_dir: &Path, pid: u32) -> Result<()> {
        let message = json!({
            "event": "daemon_startup",
            "pid": pid,
            "config_path": config_path.display().to_string(),
            "storage_dir": storage_dir.display().to_string(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.log_structured(LogLevel::Info, "Daemon started", &message)
    }

    pub fn log_shutdown(&self, reason: &str) -> Result<()> {
        let message = json!({
            "event": "daemon_shutdown",
            "reason": reason,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.log_structured(LogLevel::Info, "Daemon shutting down", &message)
    }

    pub fn log_mirror_initialized(&self, status: &MirrorStatus) -> Result<()> {
        let message = json!({
            "event": "mirror_initialized",
            "storage_dir": status.storage_dir.display().to_string(),
            "subdirs": status.subdirs,
            "with_settings": status.with_settings,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.log_structured(LogLevel::Info, "Storage directories scanned", &message)
    }

    pub fn log_mirror_teardown(&self, storage_dir: &Path) -> Result<()> {
        let message = json!({
            "event": "mirror_teardown",
            "storage_dir": storage_dir.display().to_string(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.log_structured(
            LogLevel::Info,
            &format!("Storage root removed: {}", storage_dir.display()),
            &message,
        )
    }

    pub fn log_request(&self, request: &str, request_id: &str, success: bool) -> Result<()> {
        let message = json!({
            "event": "request_handled",
            "request": request,
            "request_id": request_id,
            "success": success,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.log_structured(LogLevel::Info, &format!("Handled {}", request), &message)
    }

    pub fn log_error(&self, error_message: &str, context: Option<&str>) -> Result<()> {
        let message = json!({
            "event": "error",
            "message": error_message,
            "context": context,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.log_structured(LogLevel::Error, error_message, &message)
    }

    fn log_structured(&self, level: LogLevel, message: &str, data: &serde_json::Value) -> Result<()> {
        if !self.should_log(level) {
            return Ok(());
        }

        let full_message = format!("[{}:{}] {} | {}", self.subsystem, self.category, message, data);

        match level {
            LogLevel::Error => error!("{}", full_message),
            LogLevel::Info => info!("{}", full_message),
        }

        Ok(())
    }

    fn should_log(&self, level: LogLevel) -> bool {
        match (self.level, level) {
            (LogLevel::Error, LogLevel::Error) => true,
            (LogLevel::Info, LogLevel::Error | LogLevel::Info) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subsystem_must_be_reverse_dns() {
        assert!(DaemonLogger::new("connstore".into(), "daemon".into(), LogLevel::Info).is_err());
        assert!(DaemonLogger::new("net.connman.storage".into(), "daemon".into(), LogLevel::Info).is_ok());
    }

    #[test]
    fn test_level_gating() {
        let logger = DaemonLogger::new("net.connman.storage".into(), "daemon".into(), LogLevel::Error).unwrap();
        assert!(logger.should_log(LogLevel::Error));
        assert!(!logger.should_log(LogLevel::Info));

        let logger = DaemonLogger::new("net.connman.storage".into(), "daemon".into(), LogLevel::Info).unwrap();
        assert!(logger.should_log(LogLevel::Info));
        assert!(logger.should_log(LogLevel::Error));
    }

    #[test]
    fn test_events_log_without_backend() {
        let logger = DaemonLogger::new("net.connman.storage".into(), "daemon".into(), LogLevel::Info).unwrap();
        assert!(logger.log_shutdown("test").is_ok());
        assert!(logger.log_error("boom", Some("unit test")).is_ok());
    }
}
