//! connstore - connection manager settings storage
//!
//! This library exposes the storage layer (identifier validation, settings
//! documents, the inotify-driven directory mirror) and the daemon that
//! serves it over a local socket.

pub mod cli;
pub mod constants;
pub mod daemon;
pub mod identifier;
pub mod keyfile;
pub mod models;
pub mod output;
pub mod storage;
