//! Persisted plugin settings.
//!
//! Each plugin owns a namespace in a [`ConfigStore`]. The store only moves
//! TOML text around; [`PluginConfig`] layers typed reads and read-modify-write
//! updates on top of it.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

/// Failure to read or write settings.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing storage failed.
    #[error("settings i/o error: {0}")]
    Io(#[from] io::Error),
    /// Stored settings are not valid TOML for the type.
    #[error("malformed settings: {0}")]
    Parse(#[from] toml::de::Error),
    /// The settings could not be turned into TOML.
    #[error("could not serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Key-value storage of serialized settings, one entry per namespace.
pub trait ConfigStore: Send + Sync {
    /// Returns `None` when nothing was ever saved under `namespace`.
    fn load(&self, namespace: &str) -> Result<Option<String>, StoreError>;
    /// Replace whatever is saved under `namespace`.
    fn save(&self, namespace: &str, contents: &str) -> Result<(), StoreError>;
}

/// Stores every namespace as `<dir>/<namespace>.toml`.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Store files under `dir`, created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
    fn path(&self, namespace: &str) -> PathBuf {
        self.dir.join(format!("{}.toml", namespace))
    }
}

impl ConfigStore for FileStore {
    fn load(&self, namespace: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path(namespace)) {
            Ok(text) => Ok(Some(text)),
            Err(ref e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
    fn save(&self, namespace: &str, contents: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        // Atomic replace
        let tmp = self.dir.join(format!(".{}.toml.tmp", namespace));
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, self.path(namespace))?;
        Ok(())
    }
}

/// Keeps everything in memory. For tests.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryStore {
    fn load(&self, namespace: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(namespace).cloned())
    }
    fn save(&self, namespace: &str, contents: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(namespace.to_owned(), contents.to_owned());
        Ok(())
    }
}

/// Typed view of one namespace.
///
/// Missing settings read as `T::default()`, so fields added later pick up
/// their defaults as long as `T` uses `#[serde(default)]`.
pub struct PluginConfig<'a, T> {
    store: &'a dyn ConfigStore,
    namespace: &'a str,
    _marker: PhantomData<T>,
}

impl<'a, T> PluginConfig<'a, T>
where
    T: Serialize + DeserializeOwned + Default,
{
    /// Typed view of `namespace` in `store`.
    pub fn new(store: &'a dyn ConfigStore, namespace: &'a str) -> Self {
        Self {
            store,
            namespace,
            _marker: PhantomData,
        }
    }
    /// Read the settings, or their default if none were saved.
    pub fn get(&self) -> Result<T, StoreError> {
        match self.store.load(self.namespace)? {
            Some(text) => Ok(toml::from_str(&text)?),
            None => Ok(T::default()),
        }
    }
    /// Save `value`, replacing what was there.
    pub fn set(&self, value: &T) -> Result<(), StoreError> {
        let text = toml::to_string_pretty(value)?;
        self.store.save(self.namespace, &text)
    }
    /// Read, let `f` mutate, write back. Nothing is written if reading fails.
    pub fn update<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> Result<R, StoreError> {
        let mut value = self.get()?;
        let ret = f(&mut value);
        self.set(&value)?;
        Ok(ret)
    }
}
