// Key-value persistence.
//
// The tracker only needs get / set / remove on string values. Two
// backends: an in-memory map (tests, ephemeral sessions) and a
// directory of JSON files, one file per key.

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use serde::Serialize;

use crate::error::Result;

pub trait KeyValueStore {
    fn get(&self, key: &str) -> io::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> io::Result<()>;
    fn remove(&self, key: &str) -> io::Result<()>;
}

// Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| io::Error::other("memory store lock poisoned"))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

// Stores `<dir>/<key>.json`. Writes go through a temp file + rename so a
// crash never leaves a half-written value behind.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let path = self.path_for(key);
        let tmp_path = path.with_extension("json.tmp");

        fs::create_dir_all(&self.dir)?;
        fs::write(&tmp_path, value)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn save_json<T: Serialize + ?Sized>(kv: &impl KeyValueStore, key: &str, value: &T) -> Result<()> {
    kv.set(key, &to_json(value)?)?;
    Ok(())
}

// Writes every entry or none of them. On a failed `set` the keys already
// written are put back to what they held before, newest first.
pub fn write_batch(kv: &impl KeyValueStore, entries: &[(&str, String)]) -> Result<()> {
    let mut previous: Vec<(&str, Option<String>)> = Vec::with_capacity(entries.len());

    for (key, value) in entries {
        let before = kv.get(key)?;
        if let Err(e) = kv.set(key, value) {
            for (done, old) in previous.iter().rev() {
                let undo = match old {
                    Some(text) => kv.set(done, text),
                    None => kv.remove(done),
                };
                if let Err(undo_err) = undo {
                    tracing::error!("could not restore `{}` after failed write: {}", done, undo_err);
                }
            }
            return Err(e.into());
        }
        previous.push((*key, before));
    }
    Ok(())
}

// Wraps a MemoryStore and refuses writes to one chosen key.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct FailingStore {
    pub inner: MemoryStore,
    fail_key: Arc<Mutex<Option<String>>>,
}

#[cfg(test)]
impl FailingStore {
    pub fn fail_on(&self, key: Option<&str>) {
        if let Ok(mut k) = self.fail_key.lock() {
            *k = key.map(String::from);
        }
    }
}

#[cfg(test)]
impl KeyValueStore for FailingStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let refused = self.fail_key.lock().map(|k| k.as_deref() == Some(key)).unwrap_or(false);
        if refused {
            return Err(io::Error::other(format!("write to `{key}` refused")));
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        self.inner.remove(key)
    }
}
