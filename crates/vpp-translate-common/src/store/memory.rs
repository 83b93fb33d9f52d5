//! In-memory mapping store.

use super::MappingStore;
use crate::error::TranslateResult;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;

/// Mapping store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    namespaces: DashMap<String, BTreeMap<String, u32>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MappingStore for MemoryStore {
    async fn put(&self, namespace: &str, name: &str, handle: u32) -> TranslateResult<()> {
        self.namespaces
            .entry(namespace.to_string())
            .or_default()
            .insert(name.to_string(), handle);
        Ok(())
    }

    async fn remove(&self, namespace: &str, name: &str) -> TranslateResult<()> {
        if let Some(mut entries) = self.namespaces.get_mut(namespace) {
            entries.remove(name);
        }
        Ok(())
    }

    async fn scan(&self, namespace: &str) -> TranslateResult<Vec<(String, u32)>> {
        Ok(self
            .namespaces
            .get(namespace)
            .map(|entries| entries.iter().map(|(n, h)| (n.clone(), *h)).collect())
            .unwrap_or_default())
    }

    async fn namespaces(&self) -> TranslateResult<Vec<String>> {
        let mut names: Vec<String> = self
            .namespaces
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        Ok(names)
    }
}
