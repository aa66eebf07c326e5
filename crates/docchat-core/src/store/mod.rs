//! Observable client state.
//!
//! Each store is a cheaply clonable handle onto shared state. Every mutation
//! publishes a [`StoreEvent`](docchat_types::event::StoreEvent) on the
//! store's [`EventBus`](crate::event::EventBus), so any number of views can
//! follow along without polling.

pub mod auth;
pub mod chat;

pub use auth::{AuthState, AuthStore};
pub use chat::{ChatState, ChatStore};

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Read a lock, recovering the data if a writer panicked.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
