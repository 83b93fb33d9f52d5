//! Write orchestration for VPP translation units.
//!
//! This crate turns a configuration diff into an ordered series of VPP
//! binary API calls:
//!
//! - [`WriterRegistry`]: Dependency-ordered set of translation units, built
//!   once from ordering constraints and subtree ownership
//! - [`Orchestrator`]: Applies a [`ChangeSet`] by walking the registry
//! - [`HandleContext`]: Persisted name to handle mapping shared by all units
//! - [`ReplyBridge`]: Awaits one VPP reply with a deadline and classifies it
//! - [`Writer`] / [`Customizer`]: The contract every translation unit follows
//!
//! # Architecture
//!
//! 1. The diff engine hands over a [`ChangeSet`] of keyed configuration paths
//! 2. Every path is routed to the registry node owning its schema path
//! 3. Deletes run over the execution order in reverse, then creates and
//!    updates run forward
//! 4. Units issue calls through the [`ReplyBridge`] and record handles in
//!    the [`HandleContext`]
//! 5. The first failure stops the pipeline and is returned with the node,
//!    path and values that caused it
//!
//! # Example
//!
//! ```ignore
//! use vpp_translate_common::{Orchestrator, RegistryBuilder};
//!
//! let mut builder = RegistryBuilder::new();
//! builder.add("bridge-domains/bridge-domain", BridgeDomainWriter::boxed());
//! builder.add_after(
//!     "interfaces/interface/l2",
//!     L2Writer::boxed(),
//!     &["bridge-domains/bridge-domain"],
//! );
//! let registry = builder.build()?;
//!
//! let orchestrator = Orchestrator::new(registry, handles, bridge);
//! orchestrator.apply(&changes).await?;
//! ```

mod change;
mod config;
mod error;
mod naming;
mod orchestrator;
mod path;
mod registry;
mod reply;
mod writer;

pub mod store;

pub use change::{ChangeSet, DataChange, Operation};
pub use config::{
    AgentConfig, ConfigError, ControlPlaneConfig, MappingStoreConfig, NamespaceConfig, StoreKind,
};
pub use error::{
    ApplyError, ErrorKind, NodeFailure, RegistryError, TranslateError, TranslateResult,
};
pub use naming::{HandleContext, NamingContext};
pub use orchestrator::{ApplyReport, Invocation, Orchestrator};
pub use path::{ConfigPath, PathSegment, SchemaPath};
pub use registry::{MatchMode, RegistryBuilder, RegistryNode, Route, WriterRegistry};
pub use reply::ReplyBridge;
pub use store::{MappingStore, MemoryStore};
pub use writer::{Customizer, GenericWriter, WriteContext, Writer};
