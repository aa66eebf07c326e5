//! Client-side state and chat logic for docchat.
//!
//! This crate defines the "ports" (`ChatBackend`, `TokenStore`) that the
//! infrastructure layer implements, plus everything that runs on top of them:
//! the observable auth and chat stores, transcript pagination with scroll
//! anchoring, the typewriter reveal, and the single-flight chat turn
//! controller. It depends only on `docchat-types` -- never on
//! `docchat-infra` or any HTTP crate.

pub mod backend;
pub mod event;
pub mod store;
pub mod token;
pub mod transcript;
pub mod turn;
pub mod typewriter;

#[cfg(test)]
pub(crate) mod test_support;
