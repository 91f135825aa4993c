//! File-backed config store
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/<section>.json                      legacy global copy (read only)
//! <root>/profiles/<profile>/<section>.json   active profile
//! ```
//!
//! Commits write `<file>.tmp`, sync it, move the current file to
//! `<file>.bak` and rename the temp file into place. A crash between the two
//! renames leaves only the backup, which reads fall back to.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use bytes::Bytes;

use crate::error::{Error, Result};

use super::{ConfigStore, StoreScope, DEFAULT_SECTION};

/// Reject names that would escape the profiles directory
fn validate_profile_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidConfig("profile name cannot be empty".into()));
    }
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(Error::InvalidConfig(format!(
            "profile name cannot contain path components: {}",
            name
        )));
    }
    if name.len() > 100 {
        return Err(Error::InvalidConfig("profile name too long".into()));
    }
    Ok(())
}

/// Stores the configuration blob as files under a root directory
#[derive(Debug)]
pub struct FileConfigStore {
    root: PathBuf,
    section: String,
    profile: Mutex<String>,
}

impl FileConfigStore {
    /// Create a store rooted at `root` with `profile` active
    pub fn new(root: impl Into<PathBuf>, profile: &str) -> Result<Self> {
        validate_profile_name(profile)?;
        Ok(Self {
            root: root.into(),
            section: DEFAULT_SECTION.to_string(),
            profile: Mutex::new(profile.to_string()),
        })
    }

    /// Use a different section name
    pub fn section(mut self, section: &str) -> Result<Self> {
        validate_profile_name(section)?;
        self.section = section.to_string();
        Ok(self)
    }

    /// Switch the active profile; the next read or commit uses it
    pub fn set_profile(&self, profile: &str) -> Result<()> {
        validate_profile_name(profile)?;
        *self.lock() = profile.to_string();
        tracing::debug!(profile, "Config store profile switched");
        Ok(())
    }

    pub fn profile(&self) -> String {
        self.lock().clone()
    }

    /// File holding the active profile's configuration
    pub fn profile_path(&self) -> PathBuf {
        self.root
            .join("profiles")
            .join(self.lock().as_str())
            .join(self.file_name())
    }

    /// File holding the legacy global configuration
    pub fn legacy_path(&self) -> PathBuf {
        self.root.join(self.file_name())
    }

    fn file_name(&self) -> String {
        format!("{}.json", self.section)
    }

    fn lock(&self) -> MutexGuard<'_, String> {
        match self.profile.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn read_optional(path: &Path) -> io::Result<Option<Bytes>> {
    match fs::read(path) {
        Ok(data) => Ok(Some(Bytes::from(data))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

impl ConfigStore for FileConfigStore {
    fn read(&self, scope: StoreScope) -> Result<Option<Bytes>> {
        let path = match scope {
            StoreScope::Profile => self.profile_path(),
            StoreScope::Legacy => self.legacy_path(),
        };

        if let Some(data) =
            read_optional(&path).map_err(|e| Error::persist(&path.display().to_string(), e))?
        {
            return Ok(Some(data));
        }

        let backup = with_suffix(&path, ".bak");
        let data = read_optional(&backup)
            .map_err(|e| Error::persist(&backup.display().to_string(), e))?;
        if data.is_some() {
            tracing::warn!(path = %path.display(), "Configuration missing, using backup");
        }
        Ok(data)
    }

    fn commit(&self, blob: Bytes) -> Result<()> {
        let path = self.profile_path();
        let tmp = with_suffix(&path, ".tmp");
        let backup = with_suffix(&path, ".bak");

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| Error::persist("create profile directory", e))?;
        }

        let write = || -> io::Result<()> {
            let mut file = File::create(&tmp)?;
            file.write_all(&blob)?;
            file.sync_all()
        };
        if let Err(e) = write() {
            let _ = fs::remove_file(&tmp);
            return Err(Error::persist("write temp file", e));
        }

        if path.exists() {
            fs::rename(&path, &backup).map_err(|e| Error::persist("back up previous file", e))?;
        }
        fs::rename(&tmp, &path).map_err(|e| Error::persist("replace configuration", e))?;

        tracing::debug!(path = %path.display(), bytes = blob.len(), "Configuration committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};

    use super::*;

    fn store(dir: &TempDir) -> FileConfigStore {
        FileConfigStore::new(dir.path(), "default").unwrap()
    }

    #[test]
    fn test_paths() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).section("custom").unwrap();

        assert_eq!(
            store.profile_path(),
            dir.path().join("profiles").join("default").join("custom.json")
        );
        assert_eq!(store.legacy_path(), dir.path().join("custom.json"));
    }

    #[test]
    fn test_commit_then_read() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert_eq!(store.read(StoreScope::Profile).unwrap(), None);

        assert_ok!(store.commit(Bytes::from_static(b"first")));
        assert_ok!(store.commit(Bytes::from_static(b"second")));

        assert_eq!(
            store.read(StoreScope::Profile).unwrap(),
            Some(Bytes::from_static(b"second"))
        );
        assert_eq!(
            fs::read(with_suffix(&store.profile_path(), ".bak")).unwrap(),
            b"first"
        );
        assert!(!with_suffix(&store.profile_path(), ".tmp").exists());

        // Never written to the legacy location
        assert!(!store.legacy_path().exists());
    }

    #[test]
    fn test_read_falls_back_to_backup() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.commit(Bytes::from_static(b"first")).unwrap();
        store.commit(Bytes::from_static(b"second")).unwrap();

        // Interrupted between the two renames
        fs::remove_file(store.profile_path()).unwrap();
        assert_eq!(
            store.read(StoreScope::Profile).unwrap(),
            Some(Bytes::from_static(b"first"))
        );
    }

    #[test]
    fn test_profiles_and_legacy() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        fs::write(store.legacy_path(), b"legacy").unwrap();

        assert_eq!(
            store.read(StoreScope::Legacy).unwrap(),
            Some(Bytes::from_static(b"legacy"))
        );

        store.commit(Bytes::from_static(b"default")).unwrap();
        store.set_profile("Other Profile").unwrap();
        assert_eq!(store.read(StoreScope::Profile).unwrap(), None);
        assert_eq!(store.profile(), "Other Profile");
    }

    #[test]
    fn test_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        assert_err!(FileConfigStore::new(dir.path(), "../escape"));
        assert_err!(FileConfigStore::new(dir.path(), ""));

        let store = store(&dir);
        assert_err!(store.set_profile("a/b"));
        assert_eq!(store.profile(), "default");
    }

    #[test]
    fn test_commit_failure_keeps_previous() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.commit(Bytes::from_static(b"kept")).unwrap();

        // A directory where the temp file should go makes the write fail
        fs::create_dir(with_suffix(&store.profile_path(), ".tmp")).unwrap();
        assert!(matches!(
            store.commit(Bytes::from_static(b"lost")),
            Err(Error::PersistFailed(_))
        ));
        assert_eq!(
            store.read(StoreScope::Profile).unwrap(),
            Some(Bytes::from_static(b"kept"))
        );
    }
}
