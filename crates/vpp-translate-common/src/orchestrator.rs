//! Change-set application.
//!
//! The orchestrator routes every changed path to its registry node, then
//! runs the nodes' units in two passes over the execution order: deletes in
//! reverse, so dependents are removed before what they depend on, then
//! creates and updates forward. The first unit failure stops the pass;
//! nothing already sent to VPP is undone.

use crate::change::{ChangeSet, DataChange, Operation};
use crate::error::{ApplyError, NodeFailure, TranslateError, TranslateResult};
use crate::naming::HandleContext;
use crate::path::{ConfigPath, SchemaPath};
use crate::registry::{RegistryNode, WriterRegistry};
use crate::reply::ReplyBridge;
use crate::writer::WriteContext;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// One unit invocation that completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub node: SchemaPath,
    pub path: ConfigPath,
    pub operation: Operation,
}

/// Invocations performed by a successful apply, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub invocations: Vec<Invocation>,
}

impl ApplyReport {
    pub fn len(&self) -> usize {
        self.invocations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invocations.is_empty()
    }
}

struct Planned<'a> {
    path: &'a ConfigPath,
    change: &'a DataChange,
    operation: Operation,
}

/// Applies change sets through a [`WriterRegistry`].
///
/// Cheap to share: independent change sets may be applied concurrently from
/// different tasks. Each one runs strictly sequentially.
pub struct Orchestrator {
    registry: Arc<WriterRegistry>,
    handles: Arc<HandleContext>,
    bridge: Arc<ReplyBridge>,
}

impl Orchestrator {
    pub fn new(
        registry: WriterRegistry,
        handles: Arc<HandleContext>,
        bridge: Arc<ReplyBridge>,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            handles,
            bridge,
        }
    }

    pub fn registry(&self) -> &WriterRegistry {
        &self.registry
    }

    pub fn handles(&self) -> &Arc<HandleContext> {
        &self.handles
    }

    /// Applies a change set that may mix deletes, creates and updates.
    #[instrument(skip_all, fields(changes = changes.len()))]
    pub async fn apply(&self, changes: &ChangeSet) -> Result<ApplyReport, ApplyError> {
        let plan = self.plan(changes)?;
        let mut report = ApplyReport::default();

        for (position, planned) in plan.iter().enumerate().rev() {
            let node = &self.registry.nodes()[position];
            for item in planned.iter().rev().filter(|p| p.operation.is_delete()) {
                self.invoke(node, item, &mut report).await?;
            }
        }
        for (position, planned) in plan.iter().enumerate() {
            let node = &self.registry.nodes()[position];
            for item in planned.iter().filter(|p| !p.operation.is_delete()) {
                self.invoke(node, item, &mut report).await?;
            }
        }

        info!(invocations = report.len(), "change set applied");
        Ok(report)
    }

    /// Removes configuration, walking the execution order in reverse.
    ///
    /// Every change must be a delete.
    #[instrument(skip_all, fields(changes = changes.len()))]
    pub async fn teardown(&self, changes: &ChangeSet) -> Result<ApplyReport, ApplyError> {
        if let Some((path, _)) = changes
            .iter()
            .find(|(_, change)| change.operation() != Some(Operation::Delete))
        {
            return Err(ApplyError::Rejected(TranslateError::validation(
                path,
                "teardown accepts only deletes",
            )));
        }

        let plan = self.plan(changes)?;
        let mut report = ApplyReport::default();
        for (position, planned) in plan.iter().enumerate().rev() {
            let node = &self.registry.nodes()[position];
            for item in planned.iter().rev() {
                self.invoke(node, item, &mut report).await?;
            }
        }

        info!(invocations = report.len(), "teardown complete");
        Ok(report)
    }

    /// Routes every change to its node. Fails before any side effect.
    fn plan<'a>(&self, changes: &'a ChangeSet) -> Result<Vec<Vec<Planned<'a>>>, ApplyError> {
        changes.validate().map_err(ApplyError::Rejected)?;

        let mut plan: Vec<Vec<Planned<'a>>> = Vec::with_capacity(self.registry.len());
        plan.resize_with(self.registry.len(), Vec::new);

        for (path, change) in changes.iter() {
            let route = self
                .registry
                .route(path)
                .ok_or_else(|| ApplyError::Rejected(TranslateError::unhandled_path(path)))?;

            if route.nested {
                let owner = route.owner_instance(path);
                if changes.contains(&owner) {
                    debug!(path = %path, owner = %owner, "covered by owner change");
                    continue;
                }
                return Err(ApplyError::Rejected(TranslateError::validation(
                    path,
                    format!("change must be submitted with its owner {}", owner),
                )));
            }

            let operation = change.operation().ok_or_else(|| {
                ApplyError::Rejected(TranslateError::internal(format!(
                    "{} has no operation after validation",
                    path
                )))
            })?;
            plan[route.position].push(Planned {
                path,
                change,
                operation,
            });
        }
        Ok(plan)
    }

    async fn invoke(
        &self,
        node: &RegistryNode,
        item: &Planned<'_>,
        report: &mut ApplyReport,
    ) -> Result<(), ApplyError> {
        debug!(node = %node.path(), path = %item.path, operation = %item.operation, "invoking");
        let ctx = WriteContext::new(Arc::clone(&self.handles), Arc::clone(&self.bridge));

        let result = self.dispatch(node, item, &ctx).await;
        match result {
            Ok(()) => {
                ctx.commit().await;
                report.invocations.push(Invocation {
                    node: node.path().clone(),
                    path: item.path.clone(),
                    operation: item.operation,
                });
                Ok(())
            }
            Err(error) => {
                warn!(
                    node = %node.path(),
                    path = %item.path,
                    operation = %item.operation,
                    error = %error,
                    "writer failed"
                );
                if let Err(rollback) = ctx.rollback().await {
                    warn!(error = %rollback, "naming context rollback failed");
                }
                Err(ApplyError::Failed(Box::new(NodeFailure {
                    node: node.path().clone(),
                    path: item.path.clone(),
                    operation: item.operation,
                    before: item.change.before.clone(),
                    after: item.change.after.clone(),
                    error,
                })))
            }
        }
    }

    async fn dispatch(
        &self,
        node: &RegistryNode,
        item: &Planned<'_>,
        ctx: &WriteContext,
    ) -> TranslateResult<()> {
        let writer = node.writer();
        match item.operation {
            Operation::Create => {
                let after = side(&item.change.after, item.path, "after")?;
                writer.create(item.path, after, ctx).await
            }
            Operation::Update => {
                let before = side(&item.change.before, item.path, "before")?;
                let after = side(&item.change.after, item.path, "after")?;
                writer.update(item.path, before, after, ctx).await
            }
            Operation::Delete => {
                let before = side(&item.change.before, item.path, "before")?;
                writer.delete(item.path, before, ctx).await
            }
        }
    }
}

fn side<'a>(value: &'a Option<Value>, path: &ConfigPath, name: &str) -> TranslateResult<&'a Value> {
    value
        .as_ref()
        .ok_or_else(|| TranslateError::validation(path, format!("missing {} data", name)))
}
