use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub trait KeyValueStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Value>>;
    fn set(&self, key: &str, value: Value) -> anyhow::Result<()>;
    fn delete(&self, key: &str) -> anyhow::Result<bool>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> anyhow::Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> anyhow::Result<bool> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        Ok(entries.remove(key).is_some())
    }
}

/// Stores every key in one JSON object on disk. Each write rewrites the file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> anyhow::Result<HashMap<String, Value>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        if raw.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&raw)
            .with_context(|| format!("{} is not a JSON object", self.path.display()))
    }

    /// Like `read_all`, but a corrupt file is discarded so the next write
    /// replaces it.
    fn read_for_write(&self) -> anyhow::Result<HashMap<String, Value>> {
        match self.read_all() {
            Ok(entries) => Ok(entries),
            Err(err) if err.downcast_ref::<serde_json::Error>().is_some() => {
                tracing::warn!(path = %self.path.display(), error = %err, "discarding corrupt cache file");
                Ok(HashMap::new())
            }
            Err(err) => Err(err),
        }
    }

    fn write_all(&self, entries: &HashMap<String, Value>) -> anyhow::Result<()> {
        let raw = serde_json::to_string_pretty(entries)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, raw)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> anyhow::Result<()> {
        let mut entries = self.read_for_write()?;
        entries.insert(key.to_string(), value);
        self.write_all(&entries)
    }

    fn delete(&self, key: &str) -> anyhow::Result<bool> {
        let mut entries = self.read_for_write()?;
        let removed = entries.remove(key).is_some();
        if removed {
            self.write_all(&entries)?;
        }
        Ok(removed)
    }
}

/// Returns the live value and caches it, or the cached value when the live
/// fetch failed.
pub fn snapshot_or_cached<T>(
    live: anyhow::Result<T>,
    store: &dyn KeyValueStore,
    key: &str,
) -> anyhow::Result<T>
where
    T: Serialize + DeserializeOwned,
{
    match live {
        Ok(snapshot) => {
            let cached = serde_json::to_value(&snapshot)
                .map_err(anyhow::Error::from)
                .and_then(|value| store.set(key, value));
            if let Err(err) = cached {
                tracing::warn!(key, error = %err, "could not cache snapshot");
            }
            Ok(snapshot)
        }
        Err(err) => {
            tracing::warn!(key, error = %err, "live source unavailable, using cached snapshot");
            let cached = store
                .get(key)?
                .with_context(|| format!("live source unavailable and no cached snapshot: {err:#}"))?;
            serde_json::from_value(cached).context("cached snapshot is unreadable")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn exercise(store: &dyn KeyValueStore) {
        assert_eq!(store.get("missing").unwrap(), None);
        store.set("snapshot", json!({"count": 2})).unwrap();
        assert_eq!(store.get("snapshot").unwrap(), Some(json!({"count": 2})));
        store.set("snapshot", json!({"count": 3})).unwrap();
        assert_eq!(store.get("snapshot").unwrap(), Some(json!({"count": 3})));
        assert!(store.delete("snapshot").unwrap());
        assert!(!store.delete("snapshot").unwrap());
        assert_eq!(store.get("snapshot").unwrap(), None);
    }

    #[test]
    fn memory_store_roundtrip() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn file_store_roundtrip_and_persistence() {
        let path = std::env::temp_dir().join(format!("campus-store-{}.json", Uuid::new_v4()));
        let store = FileStore::new(&path);
        exercise(&store);

        store.set("kept", json!([1, 2])).unwrap();
        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get("kept").unwrap(), Some(json!([1, 2])));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn fresh_write_replaces_truncated_file() {
        let path = std::env::temp_dir().join(format!("campus-store-{}.json", Uuid::new_v4()));
        std::fs::write(&path, r#"{"leaderboard_snapshot": [1,"#).unwrap();
        let store = FileStore::new(&path);

        assert!(store.get("leaderboard_snapshot").is_err());
        store.set("leaderboard_snapshot", json!([[], {}])).unwrap();
        assert_eq!(store.get("leaderboard_snapshot").unwrap(), Some(json!([[], {}])));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn live_snapshot_is_cached() {
        let store = MemoryStore::new();
        let snapshot = snapshot_or_cached(Ok(vec![1u32, 2]), &store, "snap").unwrap();
        assert_eq!(snapshot, vec![1, 2]);
        assert_eq!(store.get("snap").unwrap(), Some(json!([1, 2])));
    }

    #[test]
    fn failed_live_fetch_uses_cache() {
        let store = MemoryStore::new();
        store.set("snap", json!([7, 8])).unwrap();
        let snapshot: Vec<u32> =
            snapshot_or_cached(Err(anyhow::anyhow!("connection refused")), &store, "snap").unwrap();
        assert_eq!(snapshot, vec![7, 8]);
    }

    #[test]
    fn failed_live_fetch_without_cache_is_an_error() {
        let store = MemoryStore::new();
        let err = snapshot_or_cached::<Vec<u32>>(
            Err(anyhow::anyhow!("connection refused")),
            &store,
            "snap",
        )
        .unwrap_err();
        assert!(err.to_string().contains("no cached snapshot"));
        assert!(err.to_string().contains("connection refused"));
    }
}
