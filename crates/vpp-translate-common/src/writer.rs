//! Translation unit contract.
//!
//! The registry and orchestrator only know [`Writer`], an object-safe trait
//! over untyped JSON values. Units are normally written as a
//! [`Customizer`] with a typed `Data` model and wrapped in a
//! [`GenericWriter`], which deserializes before and after values and turns
//! malformed data into a `Validation` error before any VPP call is made.

use crate::change::Operation;
use crate::error::{TranslateError, TranslateResult};
use crate::naming::HandleContext;
use crate::path::ConfigPath;
use crate::reply::ReplyBridge;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};
use vpp_api::ApiRequest;

/// A translation unit as seen by the registry.
#[async_trait]
pub trait Writer: Send + Sync {
    async fn create(&self, path: &ConfigPath, after: &Value, ctx: &WriteContext)
        -> TranslateResult<()>;

    async fn update(
        &self,
        path: &ConfigPath,
        before: &Value,
        after: &Value,
        ctx: &WriteContext,
    ) -> TranslateResult<()>;

    async fn delete(&self, path: &ConfigPath, before: &Value, ctx: &WriteContext)
        -> TranslateResult<()>;
}

/// Naming context mutations made during one unit invocation.
#[derive(Debug, Clone)]
enum JournalEntry {
    Added { namespace: String, name: String },
    Removed { namespace: String, name: String, handle: u32 },
    Reserved { namespace: String, handle: u32 },
}

/// Everything a unit may touch while it runs.
///
/// The orchestrator creates one per invocation. Naming changes made through
/// it are journaled: if the unit fails they are undone, so a failed unit
/// leaves the [`HandleContext`] as it found it.
pub struct WriteContext {
    handles: Arc<HandleContext>,
    bridge: Arc<ReplyBridge>,
    journal: Mutex<Vec<JournalEntry>>,
}

impl WriteContext {
    pub fn new(handles: Arc<HandleContext>, bridge: Arc<ReplyBridge>) -> Self {
        Self {
            handles,
            bridge,
            journal: Mutex::new(Vec::new()),
        }
    }

    /// Read access to the naming context. Mutate through `add_name`,
    /// `remove_name` and `allocate_handle` on this type instead.
    pub fn handles(&self) -> &HandleContext {
        &self.handles
    }

    pub fn bridge(&self) -> &ReplyBridge {
        &self.bridge
    }

    fn journal(&self) -> MutexGuard<'_, Vec<JournalEntry>> {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sends one request to VPP and awaits its reply.
    pub async fn call<R: ApiRequest>(&self, request: R) -> TranslateResult<R::Reply> {
        self.bridge.call(request).await
    }

    pub async fn add_name(&self, namespace: &str, handle: u32, name: &str) -> TranslateResult<()> {
        if self.handles.add_name(namespace, handle, name).await? {
            self.journal().push(JournalEntry::Added {
                namespace: namespace.to_string(),
                name: name.to_string(),
            });
        }
        Ok(())
    }

    pub async fn remove_name(&self, namespace: &str, name: &str) -> TranslateResult<()> {
        if let Some(handle) = self.handles.remove_name(namespace, name).await? {
            self.journal().push(JournalEntry::Removed {
                namespace: namespace.to_string(),
                name: name.to_string(),
                handle,
            });
        }
        Ok(())
    }

    pub async fn allocate_handle(&self, namespace: &str) -> TranslateResult<u32> {
        let handle = self.handles.allocate_handle(namespace).await?;
        self.journal().push(JournalEntry::Reserved {
            namespace: namespace.to_string(),
            handle,
        });
        Ok(handle)
    }

    /// Undoes every journaled mutation, newest first.
    pub async fn rollback(&self) -> TranslateResult<()> {
        let entries = std::mem::take(&mut *self.journal());
        for entry in entries.into_iter().rev() {
            debug!(?entry, "rolling back");
            match entry {
                JournalEntry::Added { namespace, name } => {
                    self.handles.remove_name(&namespace, &name).await?;
                }
                JournalEntry::Removed {
                    namespace,
                    name,
                    handle,
                } => {
                    self.handles.add_name(&namespace, handle, &name).await?;
                }
                JournalEntry::Reserved { namespace, handle } => {
                    self.handles.release_handle(&namespace, handle).await;
                }
            }
        }
        Ok(())
    }

    /// Keeps the unit's mutations and frees reservations it never mapped.
    pub async fn commit(&self) {
        let entries = std::mem::take(&mut *self.journal());
        for entry in entries {
            if let JournalEntry::Reserved { namespace, handle } = entry {
                self.handles.release_handle(&namespace, handle).await;
            }
        }
    }
}

/// A translation unit over a typed data model.
#[async_trait]
pub trait Customizer: Send + Sync + 'static {
    /// Data model of the node this unit is registered for.
    type Data: DeserializeOwned + Send + Sync;

    async fn create(
        &self,
        path: &ConfigPath,
        data: &Self::Data,
        ctx: &WriteContext,
    ) -> TranslateResult<()>;

    /// Defaults to `Unsupported`; units that can modify in place override it.
    async fn update(
        &self,
        path: &ConfigPath,
        _before: &Self::Data,
        _after: &Self::Data,
        _ctx: &WriteContext,
    ) -> TranslateResult<()> {
        Err(TranslateError::unsupported(path, Operation::Update))
    }

    async fn delete(
        &self,
        path: &ConfigPath,
        before: &Self::Data,
        ctx: &WriteContext,
    ) -> TranslateResult<()>;
}

/// Adapts a [`Customizer`] to the [`Writer`] contract.
pub struct GenericWriter<C> {
    customizer: C,
}

impl<C: Customizer> GenericWriter<C> {
    pub fn new(customizer: C) -> Self {
        Self { customizer }
    }

    pub fn boxed(customizer: C) -> Box<dyn Writer> {
        Box::new(Self::new(customizer))
    }

    pub fn customizer(&self) -> &C {
        &self.customizer
    }
}

fn parse<T: DeserializeOwned>(path: &ConfigPath, value: &Value) -> TranslateResult<T> {
    serde_json::from_value(value.clone()).map_err(|e| {
        warn!(path = %path, error = %e, "malformed data");
        TranslateError::validation(path, e.to_string())
    })
}

#[async_trait]
impl<C: Customizer> Writer for GenericWriter<C> {
    async fn create(
        &self,
        path: &ConfigPath,
        after: &Value,
        ctx: &WriteContext,
    ) -> TranslateResult<()> {
        let after: C::Data = parse(path, after)?;
        self.customizer.create(path, &after, ctx).await
    }

    async fn update(
        &self,
        path: &ConfigPath,
        before: &Value,
        after: &Value,
        ctx: &WriteContext,
    ) -> TranslateResult<()> {
        let before: C::Data = parse(path, before)?;
        let after: C::Data = parse(path, after)?;
        self.customizer.update(path, &before, &after, ctx).await
    }

    async fn delete(
        &self,
        path: &ConfigPath,
        before: &Value,
        ctx: &WriteContext,
    ) -> TranslateResult<()> {
        let before: C::Data = parse(path, before)?;
        self.customizer.delete(path, &before, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use serde_json::json;
    use std::time::Duration;
    use vpp_api::{ControlPlane, SimulatedVpp};

    fn context() -> (WriteContext, Arc<SimulatedVpp>) {
        let vpp = Arc::new(SimulatedVpp::new());
        let handles = Arc::new(HandleContext::new(Arc::new(MemoryStore::new())));
        let bridge = Arc::new(ReplyBridge::new(
            Arc::clone(&vpp) as Arc<dyn ControlPlane>,
            Duration::from_secs(1),
        ));
        (WriteContext::new(handles, bridge), vpp)
    }

    #[derive(Debug, Deserialize)]
    struct Named {
        name: String,
    }

    struct NameOnly;

    #[async_trait]
    impl Customizer for NameOnly {
        type Data = Named;

        async fn create(
            &self,
            _path: &ConfigPath,
            data: &Named,
            ctx: &WriteContext,
        ) -> TranslateResult<()> {
            let handle = ctx.allocate_handle("things").await?;
            ctx.add_name("things", handle, &data.name).await
        }

        async fn delete(
            &self,
            _path: &ConfigPath,
            data: &Named,
            ctx: &WriteContext,
        ) -> TranslateResult<()> {
            ctx.remove_name("things", &data.name).await
        }
    }

    #[tokio::test]
    async fn test_generic_writer_deserializes() {
        let (ctx, _) = context();
        let writer = GenericWriter::boxed(NameOnly);
        let path: ConfigPath = "things/thing[a]".parse().unwrap();

        writer.create(&path, &json!({"name": "a"}), &ctx).await.unwrap();
        ctx.commit().await;
        assert_eq!(ctx.handles().get_handle("things", "a").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_malformed_data_is_validation_error() {
        let (ctx, vpp) = context();
        let writer = GenericWriter::boxed(NameOnly);
        let path: ConfigPath = "things/thing[a]".parse().unwrap();

        let err = writer.create(&path, &json!({"nom": "a"}), &ctx).await.unwrap_err();
        assert!(matches!(err, TranslateError::Validation { .. }));
        assert!(vpp.calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_defaults_to_unsupported() {
        let (ctx, _) = context();
        let writer = GenericWriter::boxed(NameOnly);
        let path: ConfigPath = "things/thing[a]".parse().unwrap();

        let err = writer
            .update(&path, &json!({"name": "a"}), &json!({"name": "b"}), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TranslateError::Unsupported {
                operation: Operation::Update,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_rollback_restores_naming_context() {
        let (ctx, _) = context();
        ctx.add_name("things", 5, "old").await.unwrap();
        ctx.commit().await;

        let handle = ctx.allocate_handle("things").await.unwrap();
        ctx.add_name("things", handle, "new").await.unwrap();
        ctx.remove_name("things", "old").await.unwrap();
        ctx.rollback().await.unwrap();

        assert_eq!(ctx.handles().get_handle("things", "old").await.unwrap(), 5);
        assert!(!ctx.handles().contains_name("things", "new").await);
        // reservation released: the same handle is handed out again
        assert_eq!(ctx.allocate_handle("things").await.unwrap(), handle);
    }

    #[tokio::test]
    async fn test_commit_releases_unused_reservations() {
        let (ctx, _) = context();
        let first = ctx.allocate_handle("things").await.unwrap();
        ctx.commit().await;
        assert_eq!(ctx.allocate_handle("things").await.unwrap(), first);
    }
}
