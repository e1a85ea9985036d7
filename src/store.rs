//! Local key-value storage and the persisted state slot
//!
//! [`KvStore`] is the single local key-value store the dashboard writes to.
//! [`StateStore`] owns one named slot in it and reads/writes the whole
//! [`Record`] there. Loading never fails; saving reports errors so the caller
//! can log them.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::models::Record;

/// Slot holding the dashboard record
pub const STATE_KEY: &str = "clawdbot:v1";

/// Error type for storage operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { needed: usize, quota: usize },
}

/// A string-to-string store with synchronous, last-writer-wins writes
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// In-process store with an optional byte quota over all keys and values
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that refuses writes once keys plus values exceed `bytes`
    pub fn with_quota(bytes: usize) -> Self {
        Self { entries: HashMap::new(), quota: Some(bytes) }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn used_without(&self, key: &str) -> usize {
        self.entries.iter().filter(|(k, _)| k.as_str() != key).map(|(k, v)| k.len() + v.len()).sum()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if let Some(quota) = self.quota {
            let needed = self.used_without(key) + key.len() + value.len();
            if needed > quota {
                return Err(StoreError::QuotaExceeded { needed, quota });
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Directory-backed store: one `<key>.json` file per key.
///
/// Writes go to a hidden temporary file that is renamed over the target, so a
/// reader sees either the old blob or the new one.
#[derive(Debug, Clone)]
pub struct DirStore {
    dir: PathBuf,
}

impl DirStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`. Characters outside `[A-Za-z0-9._-]` become `_`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(key)))
    }
}

fn file_stem(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect()
}

impl KvStore for DirStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let target = self.path_for(key);
        let staging = self.dir.join(format!(".{}.tmp", file_stem(key)));
        fs::write(&staging, value)?;
        fs::rename(&staging, &target)?;
        debug!(path = %target.display(), bytes = value.len(), "slot written");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// The dashboard record's slot in a [`KvStore`]
#[derive(Debug, Clone)]
pub struct StateStore<S: KvStore> {
    kv: S,
    key: String,
}

impl<S: KvStore> StateStore<S> {
    pub fn new(kv: S) -> Self {
        Self::with_key(kv, STATE_KEY)
    }

    pub fn with_key(kv: S, key: impl Into<String>) -> Self {
        Self { kv, key: key.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kv(&self) -> &S {
        &self.kv
    }

    pub fn kv_mut(&mut self) -> &mut S {
        &mut self.kv
    }

    /// Last saved record merged over defaults.
    ///
    /// Missing, unreadable or corrupt data yields defaults; the problem is
    /// logged and never reaches the caller.
    pub fn load(&self) -> Record {
        let text = match self.kv.get(&self.key) {
            Ok(Some(text)) => text,
            Ok(None) => return Record::default(),
            Err(e) => {
                warn!(key = %self.key, error = %e, "load failed, using defaults");
                return Record::default();
            }
        };

        let (record, problems) = Record::from_json_lenient(&text);
        for problem in problems {
            warn!(key = %self.key, %problem, "stored state partially replaced by defaults");
        }
        record
    }

    /// Write the record's five fields as one blob, replacing the previous one.
    pub fn save(&mut self, record: &Record) -> Result<(), StoreError> {
        let blob = record.to_json()?;
        self.kv.set(&self.key, &blob)
    }
}
