//! Durable key/value storage for the session token.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Key the session token is stored under.
pub const SESSION_STORAGE_KEY: &str = "token";

/// Client-side persistent storage.
pub trait TokenStorage: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn store(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// JSON file holding a flat string map, rewritten atomically on every change.
pub struct FileTokenStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileTokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let bytes = fs::read(&self.path).with_context(|| format!("read {:?}", self.path))?;
        match serde_json::from_slice(&bytes) {
            Ok(map) => Ok(map),
            Err(e) => {
                // A corrupt file means no usable session, not a hard failure.
                warn!("Session file {:?} is corrupt, ignoring: {}", self.path, e);
                Ok(HashMap::new())
            }
        }
    }

    fn write_map(&self, map: &HashMap<String, String>) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(map).context("serialize session map")?;
        atomic_write(&self.path, &bytes)
    }
}

impl TokenStorage for FileTokenStorage {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.read_map()?.remove(key))
    }

    fn store(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut map = self.read_map()?;
        if map.remove(key).is_none() {
            return Ok(());
        }
        if map.is_empty() {
            fs::remove_file(&self.path).with_context(|| format!("remove {:?}", self.path))?;
            return Ok(());
        }
        self.write_map(&map)
    }
}

/// In-process storage; nothing survives a restart.
#[derive(Default)]
pub struct MemoryTokenStorage {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with a token, as if a previous run had logged in.
    pub fn with_token(token: &str) -> Self {
        let storage = Self::default();
        storage
            .map
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(SESSION_STORAGE_KEY.to_string(), token.to_string());
        storage
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.map.lock().unwrap_or_else(|e| e.into_inner()).get(key).cloned())
    }

    fn store(&self, key: &str, value: &str) -> Result<()> {
        self.map
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.map.lock().unwrap_or_else(|e| e.into_inner()).remove(key);
        Ok(())
    }
}

fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().context("no parent dir for session path")?;
    if !dir.as_os_str().is_empty() {
        fs::create_dir_all(dir).with_context(|| format!("create {:?}", dir))?;
    }
    let tmp = path.with_extension("json.tmp");

    {
        let mut f = fs::File::create(&tmp).with_context(|| format!("create tmp {:?}", tmp))?;
        f.write_all(bytes).context("write tmp")?;
        let _ = f.sync_all();
    }

    fs::rename(&tmp, path).with_context(|| format!("rename {:?} -> {:?}", tmp, path))?;
    Ok(())
}
