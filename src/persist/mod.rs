//! Configuration storage
//!
//! A store keeps one opaque blob per profile under the plugin's section
//! name. Reads fall back to a legacy global location written by older
//! versions; writes only ever go to the active profile, so the legacy copy
//! is migrated one way and never updated.

pub mod file;
pub mod memory;

use bytes::Bytes;

use crate::error::Result;

pub use file::FileConfigStore;
pub use memory::MemoryConfigStore;

/// Section name the configuration is stored under
pub const DEFAULT_SECTION: &str = "obs-multi-rtmp";

/// Where a blob is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreScope {
    /// The active profile
    Profile,
    /// Global location used before per-profile storage existed
    Legacy,
}

/// Atomic load/save of the configuration document
pub trait ConfigStore: Send + Sync {
    /// Read the stored blob, `None` if nothing was stored
    fn read(&self, scope: StoreScope) -> Result<Option<Bytes>>;

    /// Replace the active profile's blob
    ///
    /// Must be atomic: on failure the previously committed blob stays
    /// loadable.
    fn commit(&self, blob: Bytes) -> Result<()>;
}

/// Read the active profile's blob, falling back to the legacy location
///
/// Empty or whitespace-only blobs count as absent.
pub fn read_document(store: &dyn ConfigStore) -> Result<Option<Bytes>> {
    if let Some(blob) = non_empty(store.read(StoreScope::Profile)?) {
        return Ok(Some(blob));
    }

    let legacy = non_empty(store.read(StoreScope::Legacy)?);
    if legacy.is_some() {
        tracing::info!("No profile configuration, using legacy global configuration");
    }
    Ok(legacy)
}

fn non_empty(blob: Option<Bytes>) -> Option<Bytes> {
    blob.filter(|b| b.iter().any(|c| !c.is_ascii_whitespace()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_wins_over_legacy() {
        let store = MemoryConfigStore::new("default");
        store.set_legacy(Bytes::from_static(b"legacy"));
        assert_eq!(
            read_document(&store).unwrap(),
            Some(Bytes::from_static(b"legacy"))
        );

        store.commit(Bytes::from_static(b"profile")).unwrap();
        assert_eq!(
            read_document(&store).unwrap(),
            Some(Bytes::from_static(b"profile"))
        );

        // Saving never touches the legacy copy
        assert_eq!(
            store.read(StoreScope::Legacy).unwrap(),
            Some(Bytes::from_static(b"legacy"))
        );
    }

    #[test]
    fn test_blank_profile_falls_back() {
        let store = MemoryConfigStore::new("default");
        store.commit(Bytes::from_static(b"  \n")).unwrap();
        assert_eq!(read_document(&store).unwrap(), None);

        store.set_legacy(Bytes::from_static(b"legacy"));
        assert_eq!(
            read_document(&store).unwrap(),
            Some(Bytes::from_static(b"legacy"))
        );
    }
}
