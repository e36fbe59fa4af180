//! Inter-process communication for daemon queries
//!
//! Newline-delimited JSON over a Unix domain socket. Mirror queries are
//! forwarded to the daemon's event loop, which owns the directory mirror;
//! document operations run on blocking worker threads.

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::daemon::logging::DaemonLogger;
use crate::models::{MirrorStatus, StorageError};
use crate::storage::settings::SettingsStore;

pub const CODE_BAD_REQUEST: u32 = 400;
pub const CODE_NOT_FOUND: u32 = 404;
pub const CODE_INTERNAL: u32 = 500;
pub const CODE_UNAVAILABLE: u32 = 503;

/// IPC message types for daemon communication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IpcMessage {
    /// Identifiers of services with stored settings
    ListServices { request_id: String },
    /// Directory names of providers with stored settings
    ListProviders { request_id: String },
    /// Stored settings document of one service
    LoadService { request_id: String, service_id: String },
    /// Remove a service's settings, statistics and directory
    RemoveService { request_id: String, service_id: String },
    /// Remove a provider under both naming conventions
    RemoveProvider { request_id: String, ident: String },
    /// Daemon and mirror status
    GetStatus { request_id: String },
    /// Shutdown daemon gracefully
    Shutdown { request_id: String },
}

impl IpcMessage {
    pub fn request_id(&self) -> &str {
        match self {
            IpcMessage::ListServices { request_id }
            | IpcMessage::ListProviders { request_id }
            | IpcMessage::LoadService { request_id, .. }
            | IpcMessage::RemoveService { request_id, .. }
            | IpcMessage::RemoveProvider { request_id, .. }
            | IpcMessage::GetStatus { request_id }
            | IpcMessage::Shutdown { request_id } => request_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            IpcMessage::ListServices { .. } => "ListServices",
            IpcMessage::ListProviders { .. } => "ListProviders",
            IpcMessage::LoadService { .. } => "LoadService",
            IpcMessage::RemoveService { .. } => "RemoveService",
            IpcMessage::RemoveProvider { .. } => "RemoveProvider",
            IpcMessage::GetStatus { .. } => "GetStatus",
            IpcMessage::Shutdown { .. } => "Shutdown",
        }
    }
}

/// IPC response types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum IpcResponse {
    Success {
        request_id: String,
        data: Option<serde_json::Value>,
        message: Option<String>,
    },
    Error {
        request_id: String,
        code: u32,
        message: String,
        details: Option<String>,
    },
}

impl IpcResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, IpcResponse::Success { .. })
    }

    fn data(request_id: String, data: serde_json::Value) -> Self {
        IpcResponse::Success {
            request_id,
            data: Some(data),
            message: None,
        }
    }

    fn error(request_id: String, code: u32, message: impl Into<String>, details: Option<String>) -> Self {
        IpcResponse::Error {
            request_id,
            code,
            message: message.into(),
            details,
        }
    }
}

/// Daemon status information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonStatus {
    pub pid: u32,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub uptime_seconds: u64,
    pub storage: MirrorStatus,
}

/// Queries answered by the event loop from the directory mirror
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorQuery {
    ListServices,
    ListProviders,
    Status,
}

/// Work handed from connection tasks to the event loop
#[derive(Debug)]
pub enum DaemonRequest {
    Mirror {
        query: MirrorQuery,
        reply: oneshot::Sender<serde_json::Value>,
    },
    Shutdown {
        reason: String,
    },
}

/// IPC server for handling client connections
pub struct IpcServer {
    socket_path: PathBuf,
    listener: UnixListener,
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        if self.socket_path.exists() {
            let _ = std::fs::remove_file(&self.socket_path);
        }
    }
}

/// Handler for individual IPC connections
#[derive(Clone)]
pub struct IpcServerHandler {
    requests: mpsc::Sender<DaemonRequest>,
    settings: SettingsStore,
    logger: DaemonLogger,
    started_at: chrono::DateTime<chrono::Utc>,
}

impl IpcServer {
    /// Bind the socket, replacing a stale one
    pub fn bind(socket_path: &Path) -> Result<Self> {
        if socket_path.exists() {
            std::fs::remove_file(socket_path)
                .with_context(|| format!("Failed to remove existing socket: {}", socket_path.display()))?;
        }

        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create socket directory: {}", parent.display()))?;
        }

        let listener = UnixListener::bind(socket_path)
            .with_context(|| format!("Failed to bind to socket: {}", socket_path.display()))?;

        debug!("IPC server listening on {}", socket_path.display());

        Ok(Self {
            socket_path: socket_path.to_path_buf(),
            listener,
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Accept connections until the listener fails
    pub async fn serve(self, handler: IpcServerHandler) -> Result<()> {
        loop {
            let (stream, _) = self
                .listener
                .accept()
                .await
                .context("Error accepting IPC connection")?;

            let handler = handler.clone();
            tokio::spawn(async move {
                if let Err(e) = handler.handle_connection(stream).await {
                    error!("Error handling IPC connection: {:#}", e);
                }
            });
        }
    }

    /// Generate unique request ID
    pub fn generate_request_id() -> String {
        Uuid::new_v4().to_string()
    }
}

impl IpcServerHandler {
    pub fn new(requests: mpsc::Sender<DaemonRequest>, settings: SettingsStore, logger: DaemonLogger) -> Self {
        Self {
            requests,
            settings,
            logger,
            started_at: chrono::Utc::now(),
        }
    }

    /// Read one request line, answer it, close
    pub async fn handle_connection(&self, stream: UnixStream) -> Result<()> {
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);
        let mut line = String::new();

        reader
            .read_line(&mut line)
            .await
            .context("Failed to read from client")?;

        let response = match serde_json::from_str::<IpcMessage>(line.trim()) {
            Ok(message) => {
                let name = message.name();
                let request_id = message.request_id().to_string();
                let response = self.process_message(message).await;
                self.logger.log_request(name, &request_id, response.is_success())?;
                response
            }
            Err(e) => IpcResponse::error(
                String::new(),
                CODE_BAD_REQUEST,
                "Failed to parse IPC message",
                Some(e.to_string()),
            ),
        };

        let response_json = serde_json::to_string(&response).context("Failed to serialize response")?;

        writer
            .write_all(response_json.as_bytes())
            .await
            .context("Failed to write response")?;
        writer.write_all(b"\n").await.context("Failed to write newline")?;

        Ok(())
    }

    /// Process an IPC message and generate the response
    pub async fn process_message(&self, message: IpcMessage) -> IpcResponse {
        match message {
            IpcMessage::ListServices { request_id } => {
                self.query_mirror(request_id, MirrorQuery::ListServices).await
            }
            IpcMessage::ListProviders { request_id } => {
                self.query_mirror(request_id, MirrorQuery::ListProviders).await
            }
            IpcMessage::GetStatus { request_id } => {
                let storage = match self.ask_mirror(MirrorQuery::Status).await {
                    Some(value) => value,
                    None => return unavailable(request_id),
                };
                let storage: MirrorStatus = match serde_json::from_value(storage) {
                    Ok(storage) => storage,
                    Err(e) => {
                        return IpcResponse::error(request_id, CODE_INTERNAL, "Malformed status", Some(e.to_string()))
                    }
                };
                let now = chrono::Utc::now();
                let status = DaemonStatus {
                    pid: std::process::id(),
                    started_at: self.started_at,
                    uptime_seconds: (now - self.started_at).num_seconds().max(0) as u64,
                    storage,
                };
                match serde_json::to_value(&status) {
                    Ok(value) => IpcResponse::data(request_id, value),
                    Err(e) => IpcResponse::error(request_id, CODE_INTERNAL, "Malformed status", Some(e.to_string())),
                }
            }
            IpcMessage::LoadService { request_id, service_id } => {
                let settings = self.settings.clone();
                let id = service_id.clone();
                let result = tokio::task::spawn_blocking(move || settings.load_service(&id)).await;
                match result {
                    Ok(Ok(document)) => IpcResponse::data(
                        request_id,
                        serde_json::json!({
                            "service_id": service_id,
                            "settings": document,
                            "keyfile": document.to_data(),
                        }),
                    ),
                    Ok(Err(e @ StorageError::InvalidIdentifier(_))) => {
                        IpcResponse::error(request_id, CODE_BAD_REQUEST, e.to_string(), None)
                    }
                    Ok(Err(e @ StorageError::NotFound(_))) => {
                        IpcResponse::error(request_id, CODE_NOT_FOUND, e.to_string(), None)
                    }
                    Ok(Err(e)) => IpcResponse::error(request_id, CODE_INTERNAL, e.to_string(), None),
                    Err(e) => IpcResponse::error(request_id, CODE_INTERNAL, "Worker failed", Some(e.to_string())),
                }
            }
            IpcMessage::RemoveService { request_id, service_id } => {
                let settings = self.settings.clone();
                let id = service_id.clone();
                let removed = tokio::task::spawn_blocking(move || settings.remove_service(&id)).await;
                removal_response(request_id, &service_id, removed)
            }
            IpcMessage::RemoveProvider { request_id, ident } => {
                let settings = self.settings.clone();
                let id = ident.clone();
                let removed = tokio::task::spawn_blocking(move || settings.remove_provider(&id)).await;
                removal_response(request_id, &ident, removed)
            }
            IpcMessage::Shutdown { request_id } => {
                let request = DaemonRequest::Shutdown {
                    reason: "Shutdown requested over IPC".to_string(),
                };
                if self.requests.send(request).await.is_err() {
                    return unavailable(request_id);
                }
                IpcResponse::Success {
                    request_id,
                    data: None,
                    message: Some("Shutting down".to_string()),
                }
            }
        }
    }

    async fn query_mirror(&self, request_id: String, query: MirrorQuery) -> IpcResponse {
        match self.ask_mirror(query).await {
            Some(value) => IpcResponse::data(request_id, value),
            None => unavailable(request_id),
        }
    }

    async fn ask_mirror(&self, query: MirrorQuery) -> Option<serde_json::Value> {
        let (reply, answer) = oneshot::channel();
        self.requests.send(DaemonRequest::Mirror { query, reply }).await.ok()?;
        answer.await.ok()
    }
}

fn unavailable(request_id: String) -> IpcResponse {
    IpcResponse::error(request_id, CODE_UNAVAILABLE, "Daemon event loop is not running", None)
}

fn removal_response(
    request_id: String,
    ident: &str,
    removed: std::result::Result<bool, tokio::task::JoinError>,
) -> IpcResponse {
    match removed {
        Ok(true) => IpcResponse::Success {
            request_id,
            data: Some(serde_json::json!({ "removed": ident })),
            message: Some(format!("Removed {}", ident)),
        },
        Ok(false) => IpcResponse::error(request_id, CODE_INTERNAL, format!("Failed to remove {}", ident), None),
        Err(e) => IpcResponse::error(request_id, CODE_INTERNAL, "Worker failed", Some(e.to_string())),
    }
}

/// Client side of the IPC protocol
pub struct IpcClient {
    socket_path: PathBuf,
}

impl IpcClient {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    /// Send one message and wait for its response
    pub async fn send(&self, message: &IpcMessage) -> Result<IpcResponse> {
        let stream = UnixStream::connect(&self.socket_path).await.with_context(|| {
            format!(
                "Failed to connect to daemon at {} (is the daemon running?)",
                self.socket_path.display()
            )
        })?;

        let (reader, mut writer) = stream.into_split();
        let request = serde_json::to_string(message).context("Failed to serialize request")?;
        writer.write_all(request.as_bytes()).await.context("Failed to send request")?;
        writer.write_all(b"\n").await.context("Failed to send request")?;

        let mut reader = BufReader::new(reader);
        let mut line = String::new();
        reader.read_line(&mut line).await.context("Failed to read response")?;

        serde_json::from_str(line.trim()).context("Failed to parse daemon response")
    }
}
