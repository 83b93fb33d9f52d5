//! Durable storage for the naming context.
//!
//! A [`MappingStore`] keeps the (name, handle) pairs of every namespace so
//! that a restarted agent can resolve handles VPP assigned before the
//! restart.
//!
//! - [`MemoryStore`]: Process-local, for tests and dry runs
//! - [`JsonFileStore`]: Single JSON file replaced atomically on every write
//! - [`RedisStore`]: One Redis hash per namespace (feature `redis`)

mod file;
mod memory;
#[cfg(feature = "redis")]
mod redis_store;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
#[cfg(feature = "redis")]
pub use redis_store::RedisStore;

use crate::config::{MappingStoreConfig, StoreKind};
use crate::error::TranslateResult;
use async_trait::async_trait;
use std::sync::Arc;

/// Durable (namespace, name) to handle storage.
#[async_trait]
pub trait MappingStore: Send + Sync {
    /// Records `name` as mapped to `handle`, replacing any earlier entry.
    async fn put(&self, namespace: &str, name: &str, handle: u32) -> TranslateResult<()>;

    /// Removes `name`. Removing an absent name succeeds.
    async fn remove(&self, namespace: &str, name: &str) -> TranslateResult<()>;

    /// Every (name, handle) pair of a namespace.
    async fn scan(&self, namespace: &str) -> TranslateResult<Vec<(String, u32)>>;

    /// Names of every namespace holding at least one entry.
    async fn namespaces(&self) -> TranslateResult<Vec<String>>;
}

/// Opens the store selected by configuration.
pub async fn open_store(config: &MappingStoreConfig) -> TranslateResult<Arc<dyn MappingStore>> {
    match config.kind {
        StoreKind::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreKind::File => Ok(Arc::new(JsonFileStore::open(&config.path).await?)),
        #[cfg(feature = "redis")]
        StoreKind::Redis => Ok(Arc::new(
            RedisStore::connect(&config.redis_host, config.redis_port, config.redis_db).await?,
        )),
        #[cfg(not(feature = "redis"))]
        StoreKind::Redis => Err(crate::error::TranslateError::store(
            "open",
            "built without the redis feature",
        )),
    }
}
