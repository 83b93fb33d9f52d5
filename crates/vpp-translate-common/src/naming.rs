//! Name to handle mapping shared by translation units.
//!
//! VPP identifies objects by numeric handles it (or the agent) assigns at
//! runtime, while configuration refers to them by name. The
//! [`HandleContext`] keeps one bidirectional mapping per namespace
//! (`"interfaces"`, `"bridge-domains"`, ...) and writes every change through
//! to a [`MappingStore`] so mappings survive restarts.
//!
//! # Concurrency
//!
//! Each namespace sits behind its own async mutex. `add_name`, `remove_name`
//! and `allocate_handle` on one namespace are serialized; namespaces do not
//! block each other. A handle returned by `allocate_handle` stays reserved
//! until `add_name` consumes it or `release_handle` frees it, so two
//! concurrent allocations never return the same value.

use crate::error::{TranslateError, TranslateResult};
use crate::store::MappingStore;
use crate::writer::WriteContext;
use dashmap::DashMap;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

#[derive(Debug, Default)]
struct Namespace {
    by_name: BTreeMap<String, u32>,
    by_handle: BTreeMap<u32, String>,
    reserved: BTreeSet<u32>,
    floor: u32,
}

impl Namespace {
    fn is_free(&self, handle: u32) -> bool {
        !self.by_handle.contains_key(&handle) && !self.reserved.contains(&handle)
    }
}

/// Process-wide name to handle mapping, partitioned into namespaces.
pub struct HandleContext {
    namespaces: DashMap<String, Arc<Mutex<Namespace>>>,
    configured_floors: HashMap<String, u32>,
    store: Arc<dyn MappingStore>,
}

impl HandleContext {
    /// Creates an empty context writing through to `store`.
    pub fn new(store: Arc<dyn MappingStore>) -> Self {
        Self::with_floors(store, HashMap::new())
    }

    /// Creates an empty context with configured allocation floors.
    ///
    /// Configured floors take precedence over floors declared later through
    /// [`HandleContext::declare_namespace`].
    pub fn with_floors(store: Arc<dyn MappingStore>, floors: HashMap<String, u32>) -> Self {
        Self {
            namespaces: DashMap::new(),
            configured_floors: floors,
            store,
        }
    }

    /// Rebuilds the context from everything `store` holds.
    #[instrument(skip(store, floors))]
    pub async fn restore(
        store: Arc<dyn MappingStore>,
        floors: HashMap<String, u32>,
    ) -> TranslateResult<Self> {
        let context = Self::with_floors(store, floors);
        let mut restored = 0usize;

        for namespace in context.store.namespaces().await? {
            let entry = context.namespace(&namespace);
            let mut ns = entry.lock().await;
            for (name, handle) in context.store.scan(&namespace).await? {
                if let Some(existing) = ns.by_handle.get(&handle) {
                    return Err(TranslateError::conflict(
                        namespace.as_str(),
                        format!(
                            "stored handle {} is mapped to both {} and {}",
                            handle, existing, name
                        ),
                    ));
                }
                ns.by_name.insert(name.clone(), handle);
                ns.by_handle.insert(handle, name);
                restored += 1;
            }
        }

        info!(mappings = restored, "restored naming context");
        Ok(context)
    }

    /// The namespace table entry, created on first mutation.
    fn namespace(&self, namespace: &str) -> Arc<Mutex<Namespace>> {
        self.namespaces
            .entry(namespace.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(Namespace {
                    floor: self.configured_floors.get(namespace).copied().unwrap_or(0),
                    ..Namespace::default()
                }))
            })
            .value()
            .clone()
    }

    /// The namespace table entry if it exists. Reads never create one.
    fn existing(&self, namespace: &str) -> Option<Arc<Mutex<Namespace>>> {
        self.namespaces.get(namespace).map(|entry| entry.value().clone())
    }

    /// Sets the allocation floor of a namespace unless configuration already
    /// chose one.
    pub async fn declare_namespace(&self, namespace: &str, floor: u32) {
        if self.configured_floors.contains_key(namespace) {
            return;
        }
        self.namespace(namespace).lock().await.floor = floor;
    }

    pub async fn floor(&self, namespace: &str) -> u32 {
        match self.existing(namespace) {
            Some(entry) => entry.lock().await.floor,
            None => self.configured_floors.get(namespace).copied().unwrap_or(0),
        }
    }

    /// Handle mapped to `name`, or `NotFound`.
    pub async fn get_handle(&self, namespace: &str, name: &str) -> TranslateResult<u32> {
        let handle = match self.existing(namespace) {
            Some(entry) => entry.lock().await.by_name.get(name).copied(),
            None => None,
        };
        handle.ok_or_else(|| TranslateError::not_found(namespace, name))
    }

    /// Name mapped to `handle`, or `NotFound`.
    pub async fn get_name(&self, namespace: &str, handle: u32) -> TranslateResult<String> {
        let name = match self.existing(namespace) {
            Some(entry) => entry.lock().await.by_handle.get(&handle).cloned(),
            None => None,
        };
        name.ok_or_else(|| TranslateError::not_found(namespace, handle))
    }

    pub async fn contains_name(&self, namespace: &str, name: &str) -> bool {
        match self.existing(namespace) {
            Some(entry) => entry.lock().await.by_name.contains_key(name),
            None => false,
        }
    }

    pub async fn contains_handle(&self, namespace: &str, handle: u32) -> bool {
        match self.existing(namespace) {
            Some(entry) => entry.lock().await.by_handle.contains_key(&handle),
            None => false,
        }
    }

    /// Maps `name` to `handle`.
    ///
    /// Adding the identical pair again succeeds without change and returns
    /// `false`. If either side is already mapped to something else the call
    /// fails with `Conflict`. A reservation held on `handle` is consumed.
    #[instrument(skip(self))]
    pub async fn add_name(&self, namespace: &str, handle: u32, name: &str) -> TranslateResult<bool> {
        let entry = self.namespace(namespace);
        let mut ns = entry.lock().await;

        let mapped = ns.by_name.get(name).copied();
        match mapped {
            Some(existing) if existing == handle => {
                ns.reserved.remove(&handle);
                return Ok(false);
            }
            Some(existing) => {
                return Err(TranslateError::conflict(
                    namespace,
                    format!("{} is already mapped to {}", name, existing),
                ));
            }
            None => {}
        }
        if let Some(existing) = ns.by_handle.get(&handle) {
            return Err(TranslateError::conflict(
                namespace,
                format!("handle {} is already mapped to {}", handle, existing),
            ));
        }

        self.store.put(namespace, name, handle).await?;
        ns.by_name.insert(name.to_string(), handle);
        ns.by_handle.insert(handle, name.to_string());
        ns.reserved.remove(&handle);
        debug!("mapped");
        Ok(true)
    }

    /// Removes the mapping for `name`, returning the handle it had.
    ///
    /// Removing an absent name succeeds and returns `None`.
    #[instrument(skip(self))]
    pub async fn remove_name(&self, namespace: &str, name: &str) -> TranslateResult<Option<u32>> {
        let Some(entry) = self.existing(namespace) else {
            return Ok(None);
        };
        let mut ns = entry.lock().await;

        let Some(&handle) = ns.by_name.get(name) else {
            return Ok(None);
        };

        self.store.remove(namespace, name).await?;
        ns.by_name.remove(name);
        ns.by_handle.remove(&handle);
        debug!(handle, "unmapped");
        Ok(Some(handle))
    }

    /// Reserves and returns the lowest free handle at or above the floor.
    ///
    /// Gaps left by removed names are reused.
    #[instrument(skip(self))]
    pub async fn allocate_handle(&self, namespace: &str) -> TranslateResult<u32> {
        let entry = self.namespace(namespace);
        let mut ns = entry.lock().await;

        let mut candidate = ns.floor;
        while !ns.is_free(candidate) {
            candidate = candidate.checked_add(1).ok_or_else(|| {
                TranslateError::internal(format!("namespace {} has no free handle", namespace))
            })?;
        }
        ns.reserved.insert(candidate);
        debug!(handle = candidate, "reserved");
        Ok(candidate)
    }

    /// Frees a reservation taken by `allocate_handle`. Mapped handles are
    /// left alone.
    pub async fn release_handle(&self, namespace: &str, handle: u32) {
        if let Some(entry) = self.existing(namespace) {
            entry.lock().await.reserved.remove(&handle);
        }
    }

    /// Every (name, handle) pair of a namespace, ordered by name.
    pub async fn mappings(&self, namespace: &str) -> Vec<(String, u32)> {
        let Some(entry) = self.existing(namespace) else {
            return Vec::new();
        };
        let ns = entry.lock().await;
        ns.by_name
            .iter()
            .map(|(name, handle)| (name.clone(), *handle))
            .collect()
    }

    /// Names of every namespace that was declared, restored or written to,
    /// sorted.
    pub fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self.namespaces.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

impl fmt::Debug for HandleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleContext")
            .field("namespaces", &self.namespaces())
            .finish()
    }
}

/// A namespace as seen by one family of translation units.
///
/// Units hold these as constants and go through the [`WriteContext`] so that
/// their mutations are undone if the unit fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamingContext {
    namespace: &'static str,
    floor: u32,
}

impl NamingContext {
    pub const fn new(namespace: &'static str, floor: u32) -> Self {
        Self { namespace, floor }
    }

    pub const fn namespace(&self) -> &'static str {
        self.namespace
    }

    pub const fn floor(&self) -> u32 {
        self.floor
    }

    /// Registers this namespace's floor with the context.
    pub async fn declare(&self, handles: &HandleContext) {
        handles.declare_namespace(self.namespace, self.floor).await;
    }

    pub async fn get_index(&self, name: &str, ctx: &WriteContext) -> TranslateResult<u32> {
        ctx.handles().get_handle(self.namespace, name).await
    }

    pub async fn get_name(&self, index: u32, ctx: &WriteContext) -> TranslateResult<String> {
        ctx.handles().get_name(self.namespace, index).await
    }

    pub async fn contains_name(&self, name: &str, ctx: &WriteContext) -> bool {
        ctx.handles().contains_name(self.namespace, name).await
    }

    pub async fn contains_index(&self, index: u32, ctx: &WriteContext) -> bool {
        ctx.handles().contains_handle(self.namespace, index).await
    }

    pub async fn add_name(&self, index: u32, name: &str, ctx: &WriteContext) -> TranslateResult<()> {
        ctx.add_name(self.namespace, index, name).await
    }

    pub async fn remove_name(&self, name: &str, ctx: &WriteContext) -> TranslateResult<()> {
        ctx.remove_name(self.namespace, name).await
    }

    /// Reserves a fresh index; released automatically if never mapped.
    pub async fn allocate(&self, ctx: &WriteContext) -> TranslateResult<u32> {
        ctx.allocate_handle(self.namespace).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    fn context() -> HandleContext {
        HandleContext::new(Arc::new(MemoryStore::new()))
    }

    struct FailingStore;

    #[async_trait]
    impl MappingStore for FailingStore {
        async fn put(&self, _: &str, _: &str, _: u32) -> TranslateResult<()> {
            Err(TranslateError::store("put", "disk full"))
        }
        async fn remove(&self, _: &str, _: &str) -> TranslateResult<()> {
            Err(TranslateError::store("remove", "disk full"))
        }
        async fn scan(&self, _: &str) -> TranslateResult<Vec<(String, u32)>> {
            Ok(Vec::new())
        }
        async fn namespaces(&self) -> TranslateResult<Vec<String>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_add_then_get_round_trips() {
        let ctx = context();
        assert!(ctx.add_name("bridge-domains", 1, "bd1").await.unwrap());
        assert_eq!(ctx.get_handle("bridge-domains", "bd1").await.unwrap(), 1);
        assert_eq!(ctx.get_name("bridge-domains", 1).await.unwrap(), "bd1");
        assert!(ctx.contains_name("bridge-domains", "bd1").await);
        assert!(ctx.contains_handle("bridge-domains", 1).await);
        assert!(!ctx.contains_handle("interfaces", 1).await);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let ctx = context();
        let err = ctx.get_handle("interfaces", "eth9").await.unwrap_err();
        assert!(matches!(err, TranslateError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_reads_do_not_create_namespaces() {
        let ctx = context();
        ctx.add_name("interfaces", 0, "eth0").await.unwrap();

        assert!(ctx.get_handle("vxlan-tunnels", "vx0").await.is_err());
        assert!(ctx.get_name("vxlan-tunnels", 0).await.is_err());
        assert!(!ctx.contains_name("vxlan-tunnels", "vx0").await);
        assert!(!ctx.contains_handle("vxlan-tunnels", 0).await);
        assert!(ctx.mappings("vxlan-tunnels").await.is_empty());
        assert_eq!(ctx.floor("vxlan-tunnels").await, 0);
        assert_eq!(ctx.remove_name("vxlan-tunnels", "vx0").await.unwrap(), None);
        ctx.release_handle("vxlan-tunnels", 0).await;

        assert_eq!(ctx.namespaces(), vec!["interfaces".to_string()]);
    }

    #[tokio::test]
    async fn test_add_identical_pair_is_idempotent() {
        let ctx = context();
        ctx.add_name("interfaces", 3, "tap0").await.unwrap();
        assert!(!ctx.add_name("interfaces", 3, "tap0").await.unwrap());
        assert_eq!(ctx.mappings("interfaces").await, vec![("tap0".to_string(), 3)]);
    }

    #[tokio::test]
    async fn test_add_conflicts() {
        let ctx = context();
        ctx.add_name("interfaces", 3, "tap0").await.unwrap();

        let err = ctx.add_name("interfaces", 4, "tap0").await.unwrap_err();
        assert!(matches!(err, TranslateError::Conflict { .. }));

        let err = ctx.add_name("interfaces", 3, "tap1").await.unwrap_err();
        assert!(matches!(err, TranslateError::Conflict { .. }));

        // other namespaces are independent
        ctx.add_name("bridge-domains", 3, "tap1").await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let ctx = context();
        ctx.add_name("interfaces", 1, "tap0").await.unwrap();
        assert_eq!(ctx.remove_name("interfaces", "tap0").await.unwrap(), Some(1));
        assert_eq!(ctx.remove_name("interfaces", "tap0").await.unwrap(), None);
        assert!(!ctx.contains_handle("interfaces", 1).await);
    }

    #[tokio::test]
    async fn test_allocate_skips_present_and_reuses_gaps() {
        let ctx = context();
        ctx.declare_namespace("bridge-domains", 1).await;
        ctx.add_name("bridge-domains", 1, "a").await.unwrap();
        ctx.add_name("bridge-domains", 2, "b").await.unwrap();
        ctx.add_name("bridge-domains", 3, "c").await.unwrap();
        ctx.remove_name("bridge-domains", "b").await.unwrap();

        let handle = ctx.allocate_handle("bridge-domains").await.unwrap();
        assert_eq!(handle, 2);
        // reserved until mapped or released
        assert_eq!(ctx.allocate_handle("bridge-domains").await.unwrap(), 4);
        ctx.release_handle("bridge-domains", 4).await;
        ctx.add_name("bridge-domains", handle, "d").await.unwrap();
        assert_eq!(ctx.allocate_handle("bridge-domains").await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_configured_floor_wins() {
        let mut floors = HashMap::new();
        floors.insert("bridge-domains".to_string(), 100);
        let ctx = HandleContext::with_floors(Arc::new(MemoryStore::new()), floors);
        ctx.declare_namespace("bridge-domains", 1).await;
        assert_eq!(ctx.allocate_handle("bridge-domains").await.unwrap(), 100);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_allocation_is_distinct() {
        let ctx = Arc::new(context());
        let mut tasks = Vec::new();
        for _ in 0..16 {
            let ctx = Arc::clone(&ctx);
            tasks.push(tokio::spawn(async move {
                ctx.allocate_handle("interfaces").await.unwrap()
            }));
        }
        let mut handles = Vec::new();
        for task in tasks {
            handles.push(task.await.unwrap());
        }
        handles.sort_unstable();
        handles.dedup();
        assert_eq!(handles.len(), 16);
    }

    #[tokio::test]
    async fn test_store_failure_leaves_memory_unchanged() {
        let ctx = HandleContext::new(Arc::new(FailingStore));
        let err = ctx.add_name("interfaces", 1, "tap0").await.unwrap_err();
        assert!(matches!(err, TranslateError::Store { .. }));
        assert!(!ctx.contains_name("interfaces", "tap0").await);
    }

    #[tokio::test]
    async fn test_restore_from_store() {
        let store: Arc<dyn MappingStore> = Arc::new(MemoryStore::new());
        {
            let ctx = HandleContext::new(Arc::clone(&store));
            ctx.add_name("interfaces", 1, "tap0").await.unwrap();
            ctx.add_name("bridge-domains", 1, "bd1").await.unwrap();
        }

        let ctx = HandleContext::restore(store, HashMap::new()).await.unwrap();
        assert_eq!(ctx.get_handle("interfaces", "tap0").await.unwrap(), 1);
        assert_eq!(ctx.get_name("bridge-domains", 1).await.unwrap(), "bd1");
        assert_eq!(
            ctx.namespaces(),
            vec!["bridge-domains".to_string(), "interfaces".to_string()]
        );
    }

    #[tokio::test]
    async fn test_restore_rejects_duplicate_handles() {
        let store = Arc::new(MemoryStore::new());
        store.put("interfaces", "a", 1).await.unwrap();
        store.put("interfaces", "b", 1).await.unwrap();
        let err = HandleContext::restore(store, HashMap::new()).await.unwrap_err();
        assert!(matches!(err, TranslateError::Conflict { .. }));
    }
}
