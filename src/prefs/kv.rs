// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Key-value string stores that preferences are persisted to.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, error};

/// Errors talking to the underlying store. These are never fatal: a failed write just
/// means the change won't survive a restart.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Unable to access preference store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Preference store {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Unable to encode preferences: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A store of string values addressed by string keys.
pub trait KeyValueStore: Send + Sync {
    /// Gets the value for the given key, if any.
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    /// Sets the value for the given key.
    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError>;

    /// Removes the given key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), PersistenceError>;
}

/// An in-memory store. Nothing survives the process.
#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// Returns all keys currently in the store.
    pub fn keys(&self) -> Vec<String> {
        self.values.read().keys().cloned().collect()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.values
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.values.write().remove(key);
        Ok(())
    }
}

/// A store backed by a single JSON object on disk. Every write rewrites the whole file
/// through a temporary file, so a failed write leaves the previous contents in place.
pub struct FileStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Opens the store at the given path. A missing file is an empty store.
    pub fn open(path: &Path) -> Result<FileStore, PersistenceError> {
        let values = match fs::read_to_string(path) {
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|source| PersistenceError::Corrupt {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => {
                return Err(PersistenceError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        debug!(path = ?path, keys = values.len(), "Opened preference store");
        Ok(FileStore {
            path: path.to_path_buf(),
            values: RwLock::new(values),
        })
    }

    /// Opens the store at the given path. If it can't be read the store starts empty,
    /// and the unreadable file is replaced on the next write.
    pub fn open_or_empty(path: &Path) -> FileStore {
        FileStore::open(path).unwrap_or_else(|e| {
            error!(path = ?path, err = %e, "Unable to read preference store, starting empty");
            FileStore {
                path: path.to_path_buf(),
                values: RwLock::new(BTreeMap::new()),
            }
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the given values to disk.
    fn flush(&self, values: &BTreeMap<String, String>) -> Result<(), PersistenceError> {
        let io_err = |source| PersistenceError::Io {
            path: self.path.clone(),
            source,
        };

        let contents = serde_json::to_string_pretty(values)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, contents).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)
    }

    /// Applies a change and writes it out. The in-memory values only change if the write
    /// succeeds.
    fn update<F>(&self, change: F) -> Result<(), PersistenceError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let mut values = self.values.write();
        let mut updated = values.clone();
        change(&mut updated);
        self.flush(&updated)?;
        *values = updated;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.update(|values| {
            values.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        if self.values.read().contains_key(key) {
            self.update(|values| {
                values.remove(key);
            })
        } else {
            Ok(())
        }
    }
}
