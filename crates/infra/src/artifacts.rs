//! Storage for generated files (CSV exports).

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("invalid artifact name: {0:?}")]
    InvalidName(String),
    #[error("artifact io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("artifact storage error: {0}")]
    Storage(String),
}

/// Content store addressed by flat file name.
pub trait ArtifactStore: Send + Sync {
    /// Store `bytes` under `name`, replacing any previous content.
    fn put(&self, name: &str, bytes: &[u8]) -> Result<(), ArtifactError>;

    /// Fetch an artifact, `None` if it was never written.
    fn get(&self, name: &str) -> Result<Option<Vec<u8>>, ArtifactError>;
}

impl<S> ArtifactStore for Arc<S>
where
    S: ArtifactStore + ?Sized,
{
    fn put(&self, name: &str, bytes: &[u8]) -> Result<(), ArtifactError> {
        (**self).put(name, bytes)
    }

    fn get(&self, name: &str) -> Result<Option<Vec<u8>>, ArtifactError> {
        (**self).get(name)
    }
}

/// Names are a single path component of `[A-Za-z0-9._-]`, not starting with a dot.
pub fn validate_name(name: &str) -> Result<(), ArtifactError> {
    let ok = !name.is_empty()
        && name.len() <= 255
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if ok {
        Ok(())
    } else {
        Err(ArtifactError::InvalidName(name.to_string()))
    }
}

/// Artifacts as files in one directory, created on first write.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ArtifactStore for FsArtifactStore {
    fn put(&self, name: &str, bytes: &[u8]) -> Result<(), ArtifactError> {
        validate_name(name)?;
        fs::create_dir_all(&self.root)?;

        // Write-then-rename so readers never see a partial file.
        let tmp = self.root.join(format!(".{name}.partial"));
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, self.root.join(name))?;
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Option<Vec<u8>>, ArtifactError> {
        validate_name(name)?;
        match fs::read(self.root.join(name)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory artifact store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryArtifactStore {
    files: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArtifactStore for InMemoryArtifactStore {
    fn put(&self, name: &str, bytes: &[u8]) -> Result<(), ArtifactError> {
        validate_name(name)?;
        self.files
            .write()
            .map_err(|_| ArtifactError::Storage("artifact store lock poisoned".to_string()))?
            .insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Option<Vec<u8>>, ArtifactError> {
        validate_name(name)?;
        Ok(self
            .files
            .read()
            .map_err(|_| ArtifactError::Storage("artifact store lock poisoned".to_string()))?
            .get(name)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_path_traversal() {
        for bad in ["", "../etc/passwd", "a/b.csv", ".hidden", "a b.csv", "x\\y"] {
            assert!(
                matches!(validate_name(bad), Err(ArtifactError::InvalidName(_))),
                "{bad:?} accepted"
            );
        }
        assert!(validate_name("persons_export_0190-ab.csv").is_ok());
    }

    #[test]
    fn fs_store_creates_directory_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path().join("media").join("exports"));

        assert!(store.get("a.csv").unwrap().is_none());
        store.put("a.csv", b"name\n").unwrap();
        assert_eq!(store.get("a.csv").unwrap().unwrap(), b"name\n");

        store.put("a.csv", b"other\n").unwrap();
        assert_eq!(store.get("a.csv").unwrap().unwrap(), b"other\n");
        assert!(!store.root().join(".a.csv.partial").exists());
    }

    #[test]
    fn in_memory_store() {
        let store = InMemoryArtifactStore::new();
        store.put("x.csv", b"1").unwrap();
        assert_eq!(store.get("x.csv").unwrap(), Some(b"1".to_vec()));
        assert!(store.get("y.csv").unwrap().is_none());
        assert!(store.put("../x", b"1").is_err());
    }
}
