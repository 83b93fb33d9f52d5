//! JSON file mapping store.

use super::MappingStore;
use crate::error::{TranslateError, TranslateResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

const STATE_VERSION: u32 = 1;

/// On-disk layout of the naming context file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PersistedNaming {
    version: u32,
    #[serde(default)]
    namespaces: BTreeMap<String, BTreeMap<String, u32>>,
}

/// Mapping store backed by one JSON file.
///
/// The whole file is rewritten on every mutation: the new content goes to a
/// sibling temporary file, is synced to disk and is then renamed over the old
/// one, so a crash leaves either the previous or the new mapping, never a
/// torn file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    state: Mutex<PersistedNaming>,
}

impl JsonFileStore {
    /// Opens the store, loading existing content if the file exists.
    pub async fn open(path: impl AsRef<Path>) -> TranslateResult<Self> {
        let path = path.as_ref().to_path_buf();
        let state = match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let state: PersistedNaming = serde_json::from_str(&content).map_err(|e| {
                    TranslateError::store(
                        "load",
                        format!("failed to parse {}: {}", path.display(), e),
                    )
                })?;
                if state.version != STATE_VERSION {
                    return Err(TranslateError::store(
                        "load",
                        format!(
                            "{} has version {}, expected {}",
                            path.display(),
                            state.version,
                            STATE_VERSION
                        ),
                    ));
                }
                info!(path = %path.display(), namespaces = state.namespaces.len(), "loaded naming context");
                state
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "naming context file not found, starting empty");
                PersistedNaming {
                    version: STATE_VERSION,
                    namespaces: BTreeMap::new(),
                }
            }
            Err(e) => {
                return Err(TranslateError::store(
                    "load",
                    format!("failed to read {}: {}", path.display(), e),
                ))
            }
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, state: &PersistedNaming) -> TranslateResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    TranslateError::store(
                        "write",
                        format!("failed to create {}: {}", parent.display(), e),
                    )
                })?;
            }
        }

        let content = serde_json::to_string_pretty(state)
            .map_err(|e| TranslateError::store("write", e))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let write_err = |e: std::io::Error| {
            TranslateError::store("write", format!("failed to write {}: {}", tmp.display(), e))
        };
        let mut file = tokio::fs::File::create(&tmp).await.map_err(write_err)?;
        file.write_all(content.as_bytes()).await.map_err(write_err)?;
        // the mapping must be on disk before the rename publishes it
        file.sync_all().await.map_err(write_err)?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            TranslateError::store(
                "write",
                format!("failed to replace {}: {}", self.path.display(), e),
            )
        })?;
        self.sync_parent().await
    }

    /// Flushes the directory entry so the rename itself survives a crash.
    #[cfg(unix)]
    async fn sync_parent(&self) -> TranslateResult<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let dir = tokio::fs::File::open(parent).await.map_err(|e| {
            TranslateError::store("write", format!("failed to open {}: {}", parent.display(), e))
        })?;
        dir.sync_all().await.map_err(|e| {
            TranslateError::store("write", format!("failed to sync {}: {}", parent.display(), e))
        })
    }

    #[cfg(not(unix))]
    async fn sync_parent(&self) -> TranslateResult<()> {
        Ok(())
    }
}

#[async_trait]
impl MappingStore for JsonFileStore {
    async fn put(&self, namespace: &str, name: &str, handle: u32) -> TranslateResult<()> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        next.namespaces
            .entry(namespace.to_string())
            .or_default()
            .insert(name.to_string(), handle);
        self.persist(&next).await?;
        *state = next;
        Ok(())
    }

    async fn remove(&self, namespace: &str, name: &str) -> TranslateResult<()> {
        let mut state = self.state.lock().await;
        let present = state
            .namespaces
            .get(namespace)
            .is_some_and(|entries| entries.contains_key(name));
        if !present {
            return Ok(());
        }

        let mut next = state.clone();
        if let Some(entries) = next.namespaces.get_mut(namespace) {
            entries.remove(name);
            if entries.is_empty() {
                next.namespaces.remove(namespace);
            }
        }
        self.persist(&next).await?;
        *state = next;
        Ok(())
    }

    async fn scan(&self, namespace: &str) -> TranslateResult<Vec<(String, u32)>> {
        let state = self.state.lock().await;
        Ok(state
            .namespaces
            .get(namespace)
            .map(|entries| entries.iter().map(|(n, h)| (n.clone(), *h)).collect())
            .unwrap_or_default())
    }

    async fn namespaces(&self) -> TranslateResult<Vec<String>> {
        let state = self.state.lock().await;
        Ok(state.namespaces.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("naming.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        store.put("interfaces", "tap0", 1).await.unwrap();
        store.put("interfaces", "tap1", 2).await.unwrap();
        store.remove("interfaces", "tap0").await.unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.scan("interfaces").await.unwrap(),
            vec![("tap1".to_string(), 2)]
        );
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_put_is_on_disk_when_it_returns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("naming.json");
        let store = JsonFileStore::open(&path).await.unwrap();

        store.put("bridge-domains", "bd1", 1).await.unwrap();

        // read behind the store's back while it is still open
        let on_disk: PersistedNaming =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk.version, STATE_VERSION);
        assert_eq!(on_disk.namespaces["bridge-domains"]["bd1"], 1);
        assert!(!dir.path().join("naming.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("naming.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = JsonFileStore::open(&path).await.unwrap_err();
        assert!(matches!(err, TranslateError::Store { .. }));
    }

    #[tokio::test]
    async fn test_empty_namespace_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("n.json")).await.unwrap();
        store.put("bridge-domains", "bd1", 1).await.unwrap();
        store.remove("bridge-domains", "bd1").await.unwrap();
        assert!(store.namespaces().await.unwrap().is_empty());
    }
}
