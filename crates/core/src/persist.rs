//! Flat-file JSON persistence layer for codesync.
//!
//! Every store is one pretty-printed JSON document on disk, rewritten in
//! full on each mutation. [`JsonStore`] serializes those rewrites behind a
//! mutex so that concurrent handlers never interleave a read-modify-write
//! cycle on the same store.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::errors::{CoreError, StoreError};

/// Load a JSON document from `path`, or return `default` when the file does
/// not exist yet. A file that exists but fails to parse is an error.
pub fn load_json<T: DeserializeOwned>(path: &Path, default: T) -> Result<T, StoreError> {
    if !path.exists() {
        debug!(path = %path.display(), "store file absent, using default");
        return Ok(default);
    }
    let contents = std::fs::read_to_string(path)?;
    let value = serde_json::from_str(&contents)?;
    Ok(value)
}

/// Save a JSON document to `path`, creating parent directories as needed.
/// The document is rewritten in full.
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let contents = serde_json::to_string_pretty(value)?;
    std::fs::write(path, contents)?;
    debug!(path = %path.display(), "store file written");
    Ok(())
}

/// Handle for one on-disk JSON document.
///
/// `update` runs a full load -> mutate -> save cycle under the store's
/// mutex, so all mutations of a given store are serialized. Reads load a
/// fresh copy without taking the lock; a read racing a writer sees either
/// the old or the new document, never a mix of mutations.
pub struct JsonStore<T> {
    path: PathBuf,
    lock: Mutex<()>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    /// Create a handle for the document at `path`. The file itself is only
    /// created on first save.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
            _marker: PhantomData,
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load a fresh copy of the document. A missing file yields `T::default()`.
    pub fn read(&self) -> Result<T, StoreError> {
        load_json(&self.path, T::default())
    }

    /// Run a read-modify-write cycle under the store lock.
    ///
    /// The document is saved only if the closure returns `Ok`; on `Err` the
    /// file is left exactly as it was, so failed validations never leak
    /// partial mutations to disk.
    pub fn update<F, R>(&self, f: F) -> Result<R, CoreError>
    where
        F: FnOnce(&mut T) -> Result<R, CoreError>,
    {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| {
            warn!(path = %self.path.display(), "store mutex was poisoned, recovering");
            poisoned.into_inner()
        });

        let mut value = load_json(&self.path, T::default()).map_err(CoreError::from)?;
        let result = f(&mut value)?;
        save_json(&self.path, &value).map_err(CoreError::from)?;
        Ok(result)
    }
}
