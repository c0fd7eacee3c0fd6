//! I/O boundary traits for testability
//!
//! Services talk to storage only through [`KeyValueStore`], so they can be
//! exercised against [`MemoryStore`] in tests and [`FileStore`] in the CLI.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tempfile::NamedTempFile;
use tracing::{debug, instrument, trace};
use walkdir::WalkDir;

/// Opaque key-value store holding schema and domain records.
pub trait KeyValueStore: Send + Sync {
    /// Bytes stored under `key`, `None` if absent.
    fn get(&self, key: &str) -> io::Result<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &[u8]) -> io::Result<()>;

    /// Remove `key`, returning what was stored.
    fn delete(&self, key: &str) -> io::Result<Option<Vec<u8>>>;

    /// All keys starting with `prefix`, sorted.
    fn keys(&self, prefix: &str) -> io::Result<Vec<String>>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

fn poisoned() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "store lock poisoned")
}

/// Ephemeral store, lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> io::Result<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        Ok(entries.remove(key))
    }

    fn keys(&self, prefix: &str) -> io::Result<Vec<String>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// Directory-backed store: one file per key.
///
/// File names are the hex-encoded key plus `.kv`, so any key maps to a valid
/// file name. Writes go to a temp file in the same directory and are renamed
/// into place.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

const RECORD_EXTENSION: &str = "kv";

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}", hex::encode(key), RECORD_EXTENSION))
    }

    fn key_for(path: &Path) -> Option<String> {
        if path.extension()? != RECORD_EXTENSION {
            return None;
        }
        let bytes = hex::decode(path.file_stem()?.to_str()?).ok()?;
        String::from_utf8(bytes).ok()
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        match std::fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    #[instrument(level = "trace", skip(self, value), fields(len = value.len()))]
    fn set(&self, key: &str, value: &[u8]) -> io::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(value)?;
        tmp.as_file().sync_all()?;
        let path = self.path_for(key);
        tmp.persist(&path).map_err(|e| e.error)?;
        debug!("Stored {} bytes at {}", value.len(), path.display());
        Ok(())
    }

    fn delete(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        let previous = self.get(key)?;
        if previous.is_some() {
            std::fs::remove_file(self.path_for(key))?;
        }
        Ok(previous)
    }

    fn keys(&self, prefix: &str) -> io::Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut keys = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1) {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            match Self::key_for(entry.path()) {
                Some(key) if key.starts_with(prefix) => keys.push(key),
                Some(_) => {}
                None => trace!("Skipping foreign file {}", entry.path().display()),
            }
        }
        keys.sort();
        Ok(keys)
    }
}
