use std::collections::btree_map::Entry as Slot;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use keyring::Entry;
use tracing::debug;

use super::SessionStorage;
use crate::error::StorageError;

/// Session entries stored in the OS keychain, one credential per key.
///
/// The keychain cannot be enumerated, so `clear` removes the keys this instance
/// was seeded with plus every key it has written. Entries are opened once per key
/// and reused.
pub struct KeyringStorage {
    service: String,
    known_keys: Mutex<BTreeSet<String>>,
    entries: Mutex<BTreeMap<String, Entry>>,
}

impl KeyringStorage {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            known_keys: Mutex::new(BTreeSet::new()),
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// Seed keys that `clear` should remove even if this instance never wrote them
    pub fn with_keys<'a>(self, keys: impl IntoIterator<Item = &'a str>) -> Self {
        if let Ok(mut known) = self.known_keys.lock() {
            known.extend(keys.into_iter().map(str::to_string));
        }
        self
    }

    fn with_entry<T, F>(&self, key: &str, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Entry) -> Result<T, StorageError>,
    {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        let entry = match entries.entry(key.to_string()) {
            Slot::Occupied(slot) => slot.into_mut(),
            Slot::Vacant(slot) => slot.insert(Entry::new(&self.service, key)?),
        };
        f(entry)
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.with_entry(key, |entry| match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        })
    }
}

impl SessionStorage for KeyringStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.with_entry(key, |entry| match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.with_entry(key, |entry| Ok(entry.set_password(value)?))?;
        self.known_keys
            .lock()
            .map_err(|_| StorageError::Poisoned)?
            .insert(key.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.delete(key)
    }

    fn clear(&self) -> Result<(), StorageError> {
        let keys: Vec<String> = self
            .known_keys
            .lock()
            .map_err(|_| StorageError::Poisoned)?
            .iter()
            .cloned()
            .collect();
        debug!(service = %self.service, count = keys.len(), "Clearing keychain session entries");
        for key in keys {
            self.delete(&key)?;
        }
        Ok(())
    }
}
