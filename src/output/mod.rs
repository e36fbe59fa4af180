//! Output formatting module
//!
//! Handles:
//! - Human-readable rendering of daemon responses
//! - JSON output of the raw response payload

use anyhow::{bail, Result};
use serde_json::Value;

use crate::daemon::ipc::{DaemonStatus, IpcResponse};

/// How a successful response should be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rendering {
    /// One name per line
    NameList { empty: &'static str },
    /// A settings document as key-file text
    Document,
    Status,
    /// The response's message
    Message,
}

/// Print a response, or fail with the daemon's error
pub fn print_response(response: IpcResponse, rendering: Rendering, json_output: bool) -> Result<()> {
    let (data, message) = match response {
        IpcResponse::Success { data, message, .. } => (data, message),
        IpcResponse::Error {
            code, message, details, ..
        } => match details {
            Some(details) => bail!("{} (code {}): {}", message, code, details),
            None => bail!("{} (code {})", message, code),
        },
    };

    if json_output {
        let payload = data.unwrap_or_else(|| serde_json::json!({ "message": message }));
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    print!("{}", format_human(data.as_ref(), message.as_deref(), rendering)?);
    Ok(())
}

/// Render a successful payload in human-readable form
pub fn format_human(data: Option<&Value>, message: Option<&str>, rendering: Rendering) -> Result<String> {
    let mut out = String::new();

    match rendering {
        Rendering::NameList { empty } => {
            let names = data.and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]);
            if names.is_empty() {
                out.push_str(empty);
                out.push('\n');
            }
            for name in names.iter().filter_map(Value::as_str) {
                out.push_str(name);
                out.push('\n');
            }
        }
        Rendering::Document => {
            let text = data.and_then(|d| d.get("keyfile")).and_then(Value::as_str).unwrap_or("");
            out.push_str(text);
        }
        Rendering::Status => {
            let Some(data) = data else {
                bail!("Daemon returned no status");
            };
            let status: DaemonStatus = serde_json::from_value(data.clone())?;
            out.push_str("Daemon Status:\n");
            out.push_str(&format!("  PID: {}\n", status.pid));
            out.push_str(&format!("  Started: {}\n", status.started_at.to_rfc3339()));
            out.push_str(&format!("  Uptime: {}s\n", status.uptime_seconds));
            out.push_str(&format!("  Storage: {}\n", status.storage.storage_dir.display()));
            out.push_str(&format!(
                "  Mirror: {}\n",
                if status.storage.initialized {
                    "initialized"
                } else {
                    "not initialized"
                }
            ));
            out.push_str(&format!(
                "  Directories: {} ({} with settings)\n",
                status.storage.subdirs, status.storage.with_settings
            ));
        }
        Rendering::Message => {
            if let Some(message) = message {
                out.push_str(message);
                out.push('\n');
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_name_list() {
        let data = json!(["wifi_a", "ethernet_b"]);
        let text = format_human(Some(&data), None, Rendering::NameList { empty: "none" }).unwrap();
        assert_eq!(text, "wifi_a\nethernet_b\n");

        let text = format_human(Some(&json!([])), None, Rendering::NameList { empty: "none" }).unwrap();
        assert_eq!(text, "none\n");
    }

    #[test]
    fn test_document_prints_keyfile_text() {
        let data = json!({ "service_id": "wifi_a", "keyfile": "[wifi_a]\nName=home\n" });
        let text = format_human(Some(&data), None, Rendering::Document).unwrap();
        assert_eq!(text, "[wifi_a]\nName=home\n");
    }

    #[test]
    fn test_status() {
        let data = json!({
            "pid": 42,
            "started_at": "2026-01-01T00:00:00Z",
            "uptime_seconds": 7,
            "storage": {
                "storage_dir": "/var/lib/connman",
                "initialized": true,
                "subdirs": 3,
                "with_settings": 2
            }
        });
        let text = format_human(Some(&data), None, Rendering::Status).unwrap();
        assert!(text.contains("PID: 42"));
        assert!(text.contains("Directories: 3 (2 with settings)"));
    }

    #[test]
    fn test_error_response_fails() {
        let response = IpcResponse::Error {
            request_id: "r".into(),
            code: 404,
            message: "missing".into(),
            details: None,
        };
        let err = print_response(response, Rendering::Message, false).unwrap_err();
        assert!(err.to_string().contains("code 404"));
    }
}
