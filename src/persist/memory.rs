//! In-memory config store
//!
//! Useful for hosts that keep configuration themselves and for tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use bytes::Bytes;

use crate::error::{Error, Result};

use super::{ConfigStore, StoreScope};

#[derive(Debug, Default)]
struct Inner {
    profile: String,
    profiles: HashMap<String, Bytes>,
    legacy: Option<Bytes>,
    read_only: bool,
}

/// Config store backed by a map of profile name to blob
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    inner: Mutex<Inner>,
}

impl MemoryConfigStore {
    /// Create an empty store with `profile` active
    pub fn new(profile: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                profile: profile.into(),
                ..Default::default()
            }),
        }
    }

    /// Switch the active profile
    pub fn set_profile(&self, profile: impl Into<String>) {
        self.lock().profile = profile.into();
    }

    /// Currently active profile
    pub fn profile(&self) -> String {
        self.lock().profile.clone()
    }

    /// Seed the legacy global blob
    pub fn set_legacy(&self, blob: Bytes) {
        self.lock().legacy = Some(blob);
    }

    /// Blob stored for a given profile
    pub fn profile_blob(&self, profile: &str) -> Option<Bytes> {
        self.lock().profiles.get(profile).cloned()
    }

    /// Make every commit fail, as a full disk would
    pub fn set_read_only(&self, read_only: bool) {
        self.lock().read_only = read_only;
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl ConfigStore for MemoryConfigStore {
    fn read(&self, scope: StoreScope) -> Result<Option<Bytes>> {
        let inner = self.lock();
        Ok(match scope {
            StoreScope::Profile => inner.profiles.get(&inner.profile).cloned(),
            StoreScope::Legacy => inner.legacy.clone(),
        })
    }

    fn commit(&self, blob: Bytes) -> Result<()> {
        let mut inner = self.lock();
        if inner.read_only {
            return Err(Error::PersistFailed("store is read-only".into()));
        }

        let profile = inner.profile.clone();
        inner.profiles.insert(profile, blob);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_err, assert_ok};

    use super::*;

    #[test]
    fn test_profiles_are_separate() {
        let store = MemoryConfigStore::new("a");
        assert_ok!(store.commit(Bytes::from_static(b"one")));

        store.set_profile("b");
        assert_eq!(store.read(StoreScope::Profile).unwrap(), None);
        assert_ok!(store.commit(Bytes::from_static(b"two")));

        assert_eq!(store.profile_blob("a"), Some(Bytes::from_static(b"one")));
        assert_eq!(store.profile_blob("b"), Some(Bytes::from_static(b"two")));
        assert_eq!(store.profile(), "b");
    }

    #[test]
    fn test_read_only_keeps_previous() {
        let store = MemoryConfigStore::new("a");
        assert_ok!(store.commit(Bytes::from_static(b"one")));

        store.set_read_only(true);
        assert_err!(store.commit(Bytes::from_static(b"two")));
        assert_eq!(
            store.read(StoreScope::Profile).unwrap(),
            Some(Bytes::from_static(b"one"))
        );
    }
}
