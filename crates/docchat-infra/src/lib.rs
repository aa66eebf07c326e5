//! Infrastructure layer for docchat.
//!
//! Implements the ports defined in `docchat-core`: the reqwest-backed HTTP
//! client with bearer auth and refresh-once, the typed API client
//! (`ChatBackend`), and token storage in a file or the OS keychain. Also
//! loads `config.toml` and resolves the data directory.

pub mod api;
pub mod config;
pub mod filesystem;
pub mod http;
pub mod token;

#[cfg(test)]
pub(crate) mod test_server;
