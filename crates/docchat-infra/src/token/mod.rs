//! `TokenStore` implementations.

pub mod file;
pub mod keychain;

pub use file::FileTokenStore;
pub use keychain::KeychainTokenStore;

use std::path::Path;
use std::sync::Arc;

use docchat_core::token::{MemoryTokenStore, TokenStore};
use docchat_types::config::TokenStoreKind;

/// Build the token store selected in configuration.
pub fn open_token_store(kind: TokenStoreKind, data_dir: &Path) -> Arc<dyn TokenStore> {
    tracing::debug!(store = %kind, "opening token store");
    match kind {
        TokenStoreKind::File => Arc::new(FileTokenStore::in_data_dir(data_dir)),
        TokenStoreKind::Keychain => Arc::new(KeychainTokenStore::new()),
        TokenStoreKind::Memory => Arc::new(MemoryTokenStore::new()),
    }
}
