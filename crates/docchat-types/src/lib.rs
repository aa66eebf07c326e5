//! Shared domain types for docchat.
//!
//! Plain records mirrored from the document-chat backend (users, sessions,
//! messages, documents), the response envelopes they arrive in, the token pair the
//! client persists, client configuration, and the error enums shared by the
//! other crates.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror, secrecy.

pub mod auth;
pub mod chat;
pub mod config;
pub mod document;
pub mod envelope;
pub mod error;
pub mod event;
pub mod user;
