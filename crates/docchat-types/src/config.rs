//! Client configuration types for docchat.
//!
//! `ClientConfig` represents `config.toml` in the data directory. Every
//! field has a default, so an empty or missing file is valid.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Largest page size the backend accepts for message listings.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Where the client persists its two tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStoreKind {
    /// `tokens.json` in the data directory.
    #[default]
    File,
    /// The OS keychain.
    Keychain,
    /// Process memory only; nothing survives exit.
    Memory,
}

impl fmt::Display for TokenStoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenStoreKind::File => write!(f, "file"),
            TokenStoreKind::Keychain => write!(f, "keychain"),
            TokenStoreKind::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for TokenStoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" => Ok(TokenStoreKind::File),
            "keychain" => Ok(TokenStoreKind::Keychain),
            "memory" => Ok(TokenStoreKind::Memory),
            other => Err(format!("invalid token store: '{other}'")),
        }
    }
}

/// Top-level configuration for the docchat client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the REST API, including any version prefix.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Messages per history page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Whole-request timeout, generous enough for long streamed replies.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Delay between revealed characters of a streamed reply; 0 prints chunks as they arrive.
    #[serde(default = "default_typing_interval_ms")]
    pub typing_interval_ms: u64,

    #[serde(default)]
    pub token_store: TokenStoreKind,
}

fn default_base_url() -> String {
    "http://localhost:8000/api/v1".to_string()
}

fn default_page_size() -> u32 {
    20
}

fn default_request_timeout_secs() -> u64 {
    300
}

fn default_typing_interval_ms() -> u64 {
    5
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            page_size: default_page_size(),
            request_timeout_secs: default_request_timeout_secs(),
            typing_interval_ms: default_typing_interval_ms(),
            token_store: TokenStoreKind::default(),
        }
    }
}

impl ClientConfig {
    /// Page size clamped to what the backend accepts.
    pub fn effective_page_size(&self) -> u32 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    /// Base URL without a trailing slash.
    pub fn normalized_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}
