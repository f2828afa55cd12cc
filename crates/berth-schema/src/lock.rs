use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("lockfile not found: {0}")]
    NotFound(String),
    #[error("lockfile I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("lockfile parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Persisted mapping of image reference → resolved content digest.
///
/// Produced only by an explicit `lock update`; renderers consume it to pin
/// images and treat its absence as "render unpinned". An update either
/// persists the complete mapping or leaves the file untouched — callers must
/// resolve every digest before calling [`Lockfile::save`].
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Lockfile {
    pub images: BTreeMap<String, String>,
}

impl Lockfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LockError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LockError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), LockError> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn digest_for(&self, image: &str) -> Option<&str> {
        self.images.get(image).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("berth.lock");

        let mut lf = Lockfile::new();
        lf.images
            .insert("nginx:alpine".to_owned(), "sha256:abc123".to_owned());
        lf.images
            .insert("postgres:16".to_owned(), "sha256:def456".to_owned());
        lf.save(&path).unwrap();

        let loaded = Lockfile::load(&path).unwrap();
        assert_eq!(loaded, lf);
        assert_eq!(loaded.digest_for("nginx:alpine"), Some("sha256:abc123"));
        assert_eq!(loaded.digest_for("unknown"), None);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = Lockfile::load(dir.path().join("berth.lock")).unwrap_err();
        assert!(matches!(err, LockError::NotFound(_)));
    }

    #[test]
    fn empty_lockfile_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("berth.lock");
        fs::write(&path, "images: {}\n").unwrap();
        let lf = Lockfile::load(&path).unwrap();
        assert!(lf.is_empty());
    }
}
