//! Writer registration.
//!
//! Each factory registers a family of units together with the ordering
//! constraints between them and against other families:
//!
//! ```text
//! bridge-domain ─┬─────────────────────────────► interface/l2 ──► interface/ipv4/address
//!                │                                   ▲
//! interface/tap ─┴─► interface ─┬────────────────────┘
//!                               ├─► sub-interface ─► sub-interface/l2 ─► sub-interface/ipv4/address
//!                               └─► interface/roles/role
//! ```

use crate::interfaces::{
    InterfaceCustomizer, InterfaceRoleCustomizer, Ipv4AddressCustomizer, L2BridgeCustomizer,
    SubInterfaceCustomizer, TapCustomizer,
};
use crate::{BridgeDomainCustomizer, BRIDGE_DOMAIN_CONTEXT, INTERFACE_CONTEXT};
use tracing::info;
use vpp_translate_common::{
    GenericWriter, HandleContext, RegistryBuilder, RegistryError, WriterRegistry,
};

pub const BRIDGE_DOMAIN: &str = "bridge-domains/bridge-domain";
pub const INTERFACE: &str = "interfaces/interface";
pub const TAP: &str = "interfaces/interface/tap";
pub const L2: &str = "interfaces/interface/l2";
pub const IPV4_ADDRESS: &str = "interfaces/interface/ipv4/address";
pub const ROLE: &str = "interfaces/interface/roles/role";
pub const SUB_INTERFACE: &str = "interfaces/interface/sub-interfaces/sub-interface";
pub const SUB_INTERFACE_L2: &str = "interfaces/interface/sub-interfaces/sub-interface/l2";
pub const SUB_INTERFACE_IPV4_ADDRESS: &str =
    "interfaces/interface/sub-interfaces/sub-interface/ipv4/address";

/// Registers one family of writers.
pub trait WriterFactory: Send + Sync {
    fn name(&self) -> &'static str;

    fn init(&self, registry: &mut RegistryBuilder);
}

pub struct BridgeDomainWriterFactory;

impl WriterFactory for BridgeDomainWriterFactory {
    fn name(&self) -> &'static str {
        "bridge-domains"
    }

    fn init(&self, registry: &mut RegistryBuilder) {
        registry.add(BRIDGE_DOMAIN, GenericWriter::boxed(BridgeDomainCustomizer::new()));
    }
}

pub struct InterfacesWriterFactory;

impl WriterFactory for InterfacesWriterFactory {
    fn name(&self) -> &'static str {
        "interfaces"
    }

    fn init(&self, registry: &mut RegistryBuilder) {
        registry
            .add(INTERFACE, GenericWriter::boxed(InterfaceCustomizer::new()))
            // type-specific creators run before admin state is set
            .add_before(TAP, GenericWriter::boxed(TapCustomizer::new()), &[INTERFACE])
            .add_after(
                L2,
                GenericWriter::boxed(L2BridgeCustomizer::new()),
                &[INTERFACE, BRIDGE_DOMAIN],
            )
            .add_after(
                IPV4_ADDRESS,
                GenericWriter::boxed(Ipv4AddressCustomizer::new()),
                &[L2],
            );
    }
}

pub struct SubinterfaceWriterFactory;

impl WriterFactory for SubinterfaceWriterFactory {
    fn name(&self) -> &'static str {
        "sub-interfaces"
    }

    fn init(&self, registry: &mut RegistryBuilder) {
        registry
            .subtree_add_after(
                SUB_INTERFACE,
                GenericWriter::boxed(SubInterfaceCustomizer::new()),
                &["tags", "tags/tag", "match"],
                &[INTERFACE],
            )
            .add_after(
                SUB_INTERFACE_L2,
                GenericWriter::boxed(L2BridgeCustomizer::new()),
                &[SUB_INTERFACE, BRIDGE_DOMAIN],
            )
            .add_after(
                SUB_INTERFACE_IPV4_ADDRESS,
                GenericWriter::boxed(Ipv4AddressCustomizer::new()),
                &[SUB_INTERFACE_L2],
            );
    }
}

pub struct InterfaceRoleWriterFactory;

impl WriterFactory for InterfaceRoleWriterFactory {
    fn name(&self) -> &'static str {
        "interface-roles"
    }

    fn init(&self, registry: &mut RegistryBuilder) {
        registry.add_after(
            ROLE,
            GenericWriter::boxed(InterfaceRoleCustomizer::new()),
            &[INTERFACE],
        );
    }
}

pub fn writer_factories() -> Vec<Box<dyn WriterFactory>> {
    vec![
        Box::new(BridgeDomainWriterFactory),
        Box::new(InterfacesWriterFactory),
        Box::new(SubinterfaceWriterFactory),
        Box::new(InterfaceRoleWriterFactory),
    ]
}

/// Builds the registry from every factory.
pub fn build_registry() -> Result<WriterRegistry, RegistryError> {
    let mut builder = RegistryBuilder::new();
    for factory in writer_factories() {
        info!(factory = factory.name(), "registering writers");
        factory.init(&mut builder);
    }
    builder.build()
}

/// Declares the namespaces the units use, with their default floors.
pub async fn declare_naming_contexts(handles: &HandleContext) {
    INTERFACE_CONTEXT.declare(handles).await;
    BRIDGE_DOMAIN_CONTEXT.declare(handles).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use vpp_translate_common::{MatchMode, SchemaPath};

    fn position(registry: &WriterRegistry, path: &str) -> usize {
        let schema = SchemaPath::from(path);
        registry
            .execution_order()
            .iter()
            .position(|p| *p == schema)
            .unwrap()
    }

    #[test]
    fn test_registry_order() {
        let registry = build_registry().unwrap();
        assert_eq!(registry.len(), 9);

        let before = |a: &str, b: &str| position(&registry, a) < position(&registry, b);
        assert!(before(TAP, INTERFACE));
        assert!(before(INTERFACE, L2));
        assert!(before(BRIDGE_DOMAIN, L2));
        assert!(before(L2, IPV4_ADDRESS));
        assert!(before(INTERFACE, SUB_INTERFACE));
        assert!(before(SUB_INTERFACE, SUB_INTERFACE_L2));
        assert!(before(BRIDGE_DOMAIN, SUB_INTERFACE_L2));
        assert!(before(SUB_INTERFACE_L2, SUB_INTERFACE_IPV4_ADDRESS));
        assert!(before(INTERFACE, ROLE));
    }

    #[test]
    fn test_sub_interface_owns_tags() {
        let registry = build_registry().unwrap();
        let node = registry.node(&SchemaPath::from(SUB_INTERFACE)).unwrap();
        assert!(matches!(node.mode(), MatchMode::Subtree(owned) if owned.len() == 3));

        let route = registry
            .route(
                &"interfaces/interface[eth0]/sub-interfaces/sub-interface[1]/tags/tag[0]"
                    .parse()
                    .unwrap(),
            )
            .unwrap();
        assert!(route.nested);
        assert_eq!(route.node.path(), &SchemaPath::from(SUB_INTERFACE));
    }

    #[test]
    fn test_build_is_deterministic() {
        let first = build_registry().unwrap().execution_order();
        let second = build_registry().unwrap().execution_order();
        assert_eq!(first, second);
    }
}
