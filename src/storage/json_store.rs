//! JSON document store for submitted records.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;
use tokio::fs;

use crate::storage::clock::following_key;

/// A decoded form submission: field name to field value.
pub type FormRecord = BTreeMap<String, String>;

/// The whole store: record key to record.
///
/// Kept as raw JSON so entries written by other tools survive a rewrite.
pub type StorageDocument = Map<String, Value>;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("store {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("store {0} does not hold a JSON object")]
    NotAnObject(PathBuf),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Single-writer JSON file holding every record.
///
/// Each append reads the whole document, adds one entry and rewrites it
/// through a temp file, so the file on disk is always one complete object.
/// Concurrent writers would race; callers must serialize appends.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current document. A missing or empty file is an empty document.
    pub async fn load(&self) -> Result<StorageDocument, PersistenceError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(self.io_error(e)),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Map::new());
        }

        let value: Value =
            serde_json::from_slice(&bytes).map_err(|source| PersistenceError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        match value {
            Value::Object(doc) => Ok(doc),
            _ => Err(PersistenceError::NotAnObject(self.path.clone())),
        }
    }

    /// Add one record and rewrite the document. Returns the key used.
    ///
    /// An existing entry is never replaced: a timestamp key already present
    /// (a clock set back since an earlier run) moves forward by 1µs until
    /// free, any other key gets a `#n` suffix. On error the file is left as
    /// it was.
    pub async fn append(&self, key: &str, record: &FormRecord) -> Result<String, PersistenceError> {
        let mut doc = self.load().await?;
        let key = unused_key(&doc, key);
        doc.insert(key.clone(), serde_json::to_value(record)?);

        let bytes = serde_json::to_vec(&doc)?;
        self.replace(&bytes).await?;

        tracing::debug!(path = %self.path.display(), key = %key, entries = doc.len(), "Record written");
        Ok(key)
    }

    async fn replace(&self, bytes: &[u8]) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(|e| self.io_error(e))?;
            }
        }

        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, bytes).await.map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).await.map_err(|e| self.io_error(e))
    }

    fn io_error(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

fn unused_key(doc: &StorageDocument, key: &str) -> String {
    let mut candidate = key.to_string();
    let mut suffix = 1u32;
    while doc.contains_key(&candidate) {
        candidate = match following_key(&candidate) {
            Some(next) => next,
            None => {
                suffix += 1;
                format!("{} #{}", key, suffix)
            }
        };
    }
    candidate
}
