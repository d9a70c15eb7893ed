//! Session record kept in storage between page loads / process runs.
//!
//! The record is three separate string entries so that other tools reading the same
//! storage see the familiar keys. The expiration is stored as RFC 3339.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::storage::SessionStorage;

pub const SESSION_EXPIRATION_KEY: &str = "ual-session-expiration";
pub const SESSION_AUTHENTICATOR_KEY: &str = "ual-session-authenticator";
pub const SESSION_ACCOUNT_NAME_KEY: &str = "ual-session-account-name";

/// All keys owned by the session record
pub const SESSION_KEYS: [&str; 3] = [
    SESSION_EXPIRATION_KEY,
    SESSION_AUTHENTICATOR_KEY,
    SESSION_ACCOUNT_NAME_KEY,
];

/// Source of "now" for expiry decisions
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct SessionRecord {
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub expires_at: DateTime<Utc>,
    pub authenticator: String,
    pub account_name: Option<String>,
}

impl SessionRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn time_until_expiry(&self, now: DateTime<Utc>) -> Duration {
        self.expires_at - now
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        self.time_until_expiry(now).num_minutes().max(0)
    }
}

/// What `SessionStore::load` found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredSession {
    /// No expiration entry
    None,
    /// Expiration passed or could not be read
    Expired,
    Active(SessionRecord),
}

/// Typed access to the session entries in a storage backend
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn SessionStorage>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<dyn SessionStorage> {
        &self.storage
    }

    /// Record the start of a login: expiration and authenticator name.
    /// Any account name left by an earlier session is dropped.
    pub fn begin(&self, authenticator: &str, expires_at: DateTime<Utc>) -> Result<(), StorageError> {
        self.storage.remove(SESSION_ACCOUNT_NAME_KEY)?;
        self.storage
            .set(SESSION_EXPIRATION_KEY, &expires_at.to_rfc3339())?;
        self.storage.set(SESSION_AUTHENTICATOR_KEY, authenticator)?;
        debug!(authenticator, %expires_at, "Session started");
        Ok(())
    }

    pub fn set_account_name(&self, account_name: &str) -> Result<(), StorageError> {
        self.storage.set(SESSION_ACCOUNT_NAME_KEY, account_name)
    }

    pub fn load(&self, now: DateTime<Utc>) -> Result<StoredSession, StorageError> {
        let Some(raw_expiration) = self.storage.get(SESSION_EXPIRATION_KEY)? else {
            return Ok(StoredSession::None);
        };

        let expires_at = match DateTime::parse_from_rfc3339(&raw_expiration) {
            Ok(dt) => dt.with_timezone(&Utc),
            Err(e) => {
                warn!(value = %raw_expiration, error = %e, "Unreadable session expiration");
                return Ok(StoredSession::Expired);
            }
        };

        let record = SessionRecord {
            expires_at,
            authenticator: self
                .storage
                .get(SESSION_AUTHENTICATOR_KEY)?
                .unwrap_or_default(),
            account_name: self
                .storage
                .get(SESSION_ACCOUNT_NAME_KEY)?
                .filter(|name| !name.is_empty()),
        };

        if record.is_expired(now) {
            Ok(StoredSession::Expired)
        } else {
            Ok(StoredSession::Active(record))
        }
    }

    /// Remove the three session entries; other keys are left alone
    pub fn clear_keys(&self) -> Result<(), StorageError> {
        for key in SESSION_KEYS {
            self.storage.remove(key)?;
        }
        Ok(())
    }

    /// Wipe the whole backend
    pub fn clear_all(&self) -> Result<(), StorageError> {
        self.storage.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn store() -> (Arc<MemoryStorage>, SessionStore) {
        let storage = Arc::new(MemoryStorage::new());
        let store = SessionStore::new(storage.clone());
        (storage, store)
    }

    #[test]
    fn test_load_without_session() {
        let (_, store) = store();
        assert_eq!(store.load(Utc::now()).unwrap(), StoredSession::None);
    }

    #[test]
    fn test_begin_then_load_active() {
        let (storage, store) = store();
        let now = Utc::now();
        store.begin("anchor", now + Duration::seconds(3600)).unwrap();

        assert!(storage.get(SESSION_EXPIRATION_KEY).unwrap().is_some());
        match store.load(now).unwrap() {
            StoredSession::Active(record) => {
                assert_eq!(record.authenticator, "anchor");
                assert_eq!(record.account_name, None);
                assert_eq!(record.minutes_until_expiry(now), 60);
            }
            other => panic!("expected active session, got {:?}", other),
        }
    }

    #[test]
    fn test_begin_drops_previous_account_name() {
        let (storage, store) = store();
        let now = Utc::now();
        store.begin("anchor", now + Duration::seconds(3600)).unwrap();
        store.set_account_name("alice").unwrap();

        store.begin("scatter", now + Duration::seconds(3600)).unwrap();
        assert_eq!(storage.get(SESSION_ACCOUNT_NAME_KEY).unwrap(), None);
    }

    #[test]
    fn test_expiry_boundary_is_expired() {
        let (_, store) = store();
        let now = Utc::now();
        store.begin("anchor", now).unwrap();
        assert_eq!(store.load(now).unwrap(), StoredSession::Expired);
        assert_eq!(
            store.load(now + Duration::seconds(1)).unwrap(),
            StoredSession::Expired
        );
    }

    #[test]
    fn test_unparseable_expiration_is_expired() {
        let (storage, store) = store();
        storage
            .set(SESSION_EXPIRATION_KEY, "Tue Mar 05 2024 10:00:00 GMT+0000")
            .unwrap();
        assert_eq!(store.load(Utc::now()).unwrap(), StoredSession::Expired);
    }

    #[test]
    fn test_empty_account_name_is_absent() {
        let (_, store) = store();
        let now = Utc::now();
        store.begin("anchor", now + Duration::minutes(5)).unwrap();
        store.set_account_name("").unwrap();

        let StoredSession::Active(record) = store.load(now).unwrap() else {
            panic!("expected active session");
        };
        assert_eq!(record.account_name, None);
    }

    #[test]
    fn test_clear_keys_leaves_other_entries() {
        let (storage, store) = store();
        storage.set("unrelated", "keep").unwrap();
        store.begin("anchor", Utc::now()).unwrap();
        store.set_account_name("alice").unwrap();

        store.clear_keys().unwrap();
        store.clear_keys().unwrap();
        for key in SESSION_KEYS {
            assert_eq!(storage.get(key).unwrap(), None);
        }
        assert_eq!(storage.get("unrelated").unwrap().as_deref(), Some("keep"));

        store.clear_all().unwrap();
        assert!(storage.is_empty());
    }
}
