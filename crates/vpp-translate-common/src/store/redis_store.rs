//! Redis mapping store.
//!
//! Each namespace is one hash, `NAMING_CONTEXT|<namespace>`, with names as
//! fields and handles as values.

use super::MappingStore;
use crate::error::{TranslateError, TranslateResult};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use tracing::info;

const KEY_PREFIX: &str = "NAMING_CONTEXT|";

/// Mapping store backed by Redis hashes.
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    /// Connects to `redis://<host>:<port>/<db>`.
    pub async fn connect(host: &str, port: u16, db: u32) -> TranslateResult<Self> {
        let uri = format!("redis://{}:{}/{}", host, port, db);
        let client = redis::Client::open(uri.clone())
            .map_err(|e| TranslateError::store("connect", format!("{}: {}", uri, e)))?;
        let connection = client.get_connection_manager().await.map_err(|e| {
            TranslateError::store("connect", format!("failed to create connection manager: {}", e))
        })?;
        info!(uri = %uri, "connected to naming context store");
        Ok(Self { connection })
    }

    fn key(namespace: &str) -> String {
        format!("{}{}", KEY_PREFIX, namespace)
    }
}

#[async_trait]
impl MappingStore for RedisStore {
    async fn put(&self, namespace: &str, name: &str, handle: u32) -> TranslateResult<()> {
        let mut conn = self.connection.clone();
        conn.hset::<_, _, _, ()>(Self::key(namespace), name, handle)
            .await
            .map_err(|e| TranslateError::store("put", e))
    }

    async fn remove(&self, namespace: &str, name: &str) -> TranslateResult<()> {
        let mut conn = self.connection.clone();
        conn.hdel::<_, _, ()>(Self::key(namespace), name)
            .await
            .map_err(|e| TranslateError::store("remove", e))
    }

    async fn scan(&self, namespace: &str) -> TranslateResult<Vec<(String, u32)>> {
        let mut conn = self.connection.clone();
        let entries: HashMap<String, u32> = conn
            .hgetall(Self::key(namespace))
            .await
            .map_err(|e| TranslateError::store("scan", e))?;
        let mut entries: Vec<(String, u32)> = entries.into_iter().collect();
        entries.sort();
        Ok(entries)
    }

    async fn namespaces(&self) -> TranslateResult<Vec<String>> {
        let mut conn = self.connection.clone();
        let keys: Vec<String> = conn
            .keys(format!("{}*", KEY_PREFIX))
            .await
            .map_err(|e| TranslateError::store("namespaces", e))?;
        let mut names: Vec<String> = keys
            .into_iter()
            .filter_map(|key| key.strip_prefix(KEY_PREFIX).map(str::to_string))
            .collect();
        names.sort();
        Ok(names)
    }
}
