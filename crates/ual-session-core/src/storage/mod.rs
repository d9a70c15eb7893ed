//! Key-value storage backends for the session record.
//!
//! This module provides:
//! - `SessionStorage`: the get/set/remove/clear contract
//! - `MemoryStorage`: process-local map, used by tests and embedded hosts
//! - `FileStorage`: JSON file in the cache directory
//! - `KeyringStorage`: OS keychain entries

pub mod file;
pub mod keychain;
pub mod memory;

pub use file::FileStorage;
pub use keychain::KeyringStorage;
pub use memory::MemoryStorage;

use crate::error::StorageError;

pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
    /// Remove every entry this backend holds
    fn clear(&self) -> Result<(), StorageError>;
}
