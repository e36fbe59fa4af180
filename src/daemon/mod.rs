//! Daemon module for background storage synchronization
//!
//! This module runs the storage mirror as a long-lived service:
//! - TOML configuration with defaults for every key
//! - Structured lifecycle logging
//! - A Unix-socket query interface
//!
//! A single event loop owns the directory mirror. It drains filesystem
//! notifications and answers mirror queries forwarded by IPC connection
//! tasks, so the mirror is never touched from two places at once.

pub mod config;
pub mod ipc;
pub mod logging;

use anyhow::{Context, Result};
use log::{debug, warn};
use std::path::PathBuf;
use tokio::signal;
use tokio::sync::mpsc;

use crate::constants::{APP_SUBSYSTEM, DAEMON_CATEGORY};
use crate::daemon::config::DaemonConfiguration;
use crate::daemon::ipc::{DaemonRequest, IpcServer, IpcServerHandler, MirrorQuery};
use crate::daemon::logging::{DaemonLogger, LogLevel};
use crate::models::WatchEventKind;
use crate::storage::watch::{NotifyWatcher, Watcher};
use crate::storage::Storage;

/// Run the daemon in the foreground until a signal or a Shutdown request
pub async fn run_daemon_with_config(config_path: Option<PathBuf>) -> Result<()> {
    let config = match config_path {
        Some(ref path) => DaemonConfiguration::load_from_file(path)?,
        None => {
            let default_path = DaemonConfiguration::default_config_path();
            if default_path.exists() {
                DaemonConfiguration::load_from_file(&default_path)?
            } else {
                DaemonConfiguration::default()
            }
        }
    };

    DaemonLogger::install(config.log_filter())?;
    let logger = DaemonLogger::new(APP_SUBSYSTEM.to_string(), DAEMON_CATEGORY.to_string(), LogLevel::Info)?;

    run_daemon(config, config_path, logger).await
}

async fn run_daemon(config: DaemonConfiguration, config_path: Option<PathBuf>, logger: DaemonLogger) -> Result<()> {
    config
        .ensure_directories()
        .context("Failed to create required directories")?;

    let paths = config.storage_paths();
    let (watcher, mut events) =
        NotifyWatcher::channel(paths.storage_dir()).context("Failed to start filesystem watcher")?;
    let mut storage = Storage::new(paths.clone(), watcher);

    let (requests_tx, mut requests) = mpsc::channel::<DaemonRequest>(32);
    let server = IpcServer::bind(&config.daemon.socket_path)?;
    let handler = IpcServerHandler::new(requests_tx, storage.settings().clone(), logger.clone());
    let ipc_task = tokio::spawn(async move {
        if let Err(e) = server.serve(handler).await {
            log::error!("IPC server error: {:#}", e);
        }
    });

    logger.log_startup(
        config_path
            .as_deref()
            .unwrap_or(&DaemonConfiguration::default_config_path()),
        paths.storage_dir(),
        std::process::id(),
    )?;

    match storage.initialize() {
        Ok(()) => logger.log_mirror_initialized(&storage.status())?,
        Err(e) => logger.log_error(&e.to_string(), Some("initial storage scan"))?,
    }

    let shutdown_signal = setup_signal_handlers();
    tokio::pin!(shutdown_signal);

    let reason = loop {
        tokio::select! {
            _ = &mut shutdown_signal => break "Received shutdown signal".to_string(),
            event = events.recv() => {
                let Some(event) = event else {
                    break "Watcher stopped".to_string();
                };
                let was_initialized = storage.mirror().is_initialized();
                storage.handle_event(&event);
                if event.kind == WatchEventKind::SelfDeleted && was_initialized {
                    logger.log_mirror_teardown(paths.storage_dir())?;
                }
            }
            request = requests.recv() => {
                match request {
                    Some(DaemonRequest::Mirror { query, reply }) => {
                        let was_initialized = storage.mirror().is_initialized();
                        let answer = answer_query(&mut storage, query);
                        if !was_initialized && storage.mirror().is_initialized() {
                            logger.log_mirror_initialized(&storage.status())?;
                        }
                        if reply.send(answer).is_err() {
                            debug!("Client went away before {:?} was answered", query);
                        }
                    }
                    Some(DaemonRequest::Shutdown { reason }) => break reason,
                    None => break "IPC server ended".to_string(),
                }
            }
        }
    };

    logger.log_shutdown(&reason)?;

    storage.shutdown();
    ipc_task.abort();
    if config.daemon.socket_path.exists() {
        if let Err(e) = std::fs::remove_file(&config.daemon.socket_path) {
            warn!("Failed to remove socket {}: {}", config.daemon.socket_path.display(), e);
        }
    }

    Ok(())
}

fn answer_query<W: Watcher>(storage: &mut Storage<W>, query: MirrorQuery) -> serde_json::Value {
    match query {
        MirrorQuery::ListServices => serde_json::json!(storage.list_services()),
        MirrorQuery::ListProviders => serde_json::json!(storage.list_providers()),
        MirrorQuery::Status => serde_json::to_value(storage.status()).unwrap_or(serde_json::Value::Null),
    }
}

/// Resolve on SIGINT or SIGTERM
async fn setup_signal_handlers() {
    let mut terminate = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            warn!("Failed to install SIGTERM handler: {}", e);
            let _ = signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}
