//! Shared fixtures for unit tests.

use std::sync::Arc;
use std::time::Duration;
use vpp_api::{ControlPlane, SimulatedVpp};
use vpp_translate_common::{ConfigPath, HandleContext, MemoryStore, ReplyBridge, WriteContext};

pub(crate) struct Fixture {
    pub vpp: Arc<SimulatedVpp>,
    pub handles: Arc<HandleContext>,
    bridge: Arc<ReplyBridge>,
}

impl Fixture {
    pub async fn new() -> Self {
        let vpp = Arc::new(SimulatedVpp::new());
        let handles = Arc::new(HandleContext::new(Arc::new(MemoryStore::new())));
        crate::declare_naming_contexts(&handles).await;
        let bridge = Arc::new(ReplyBridge::new(
            Arc::clone(&vpp) as Arc<dyn ControlPlane>,
            Duration::from_secs(1),
        ));
        Self {
            vpp,
            handles,
            bridge,
        }
    }

    pub fn ctx(&self) -> WriteContext {
        WriteContext::new(Arc::clone(&self.handles), Arc::clone(&self.bridge))
    }

    /// Adds a hardware interface to VPP and to the interface context.
    pub async fn hardware(&self, name: &str) -> u32 {
        let index = self.vpp.add_hardware_interface(name).as_raw();
        self.handles
            .add_name(crate::INTERFACE_CONTEXT.namespace(), index, name)
            .await
            .unwrap();
        index
    }
}

pub(crate) fn path(path: &str) -> ConfigPath {
    path.parse().unwrap()
}
