//! VPP core translation units.
//!
//! Customizers for the v3po configuration model and the writer factories
//! that register them:
//!
//! - [`BridgeDomainCustomizer`]: `bridge-domains/bridge-domain`
//! - [`TapCustomizer`], [`InterfaceCustomizer`]: `interfaces/interface`
//! - [`SubInterfaceCustomizer`]: `interfaces/interface/sub-interfaces/sub-interface`
//! - [`L2BridgeCustomizer`]: bridge-domain membership of interfaces and sub-interfaces
//! - [`Ipv4AddressCustomizer`]: IPv4 addresses of interfaces and sub-interfaces
//! - [`InterfaceRoleCustomizer`]: local-only interface roles
//!
//! Units share two naming contexts: [`INTERFACE_CONTEXT`] maps interface
//! names to VPP `sw_if_index` values and [`BRIDGE_DOMAIN_CONTEXT`] maps
//! bridge-domain names to the ids this agent allocates for them.

mod bridge_domain;
pub mod factory;
pub mod interfaces;

pub use bridge_domain::{BridgeDomain, BridgeDomainCustomizer};
pub use factory::{build_registry, declare_naming_contexts, writer_factories, WriterFactory};
pub use interfaces::{
    InterfaceCustomizer, InterfaceRoleCustomizer, Ipv4AddressCustomizer, L2BridgeCustomizer,
    SubInterfaceCustomizer, TapCustomizer,
};

use vpp_translate_common::NamingContext;

/// Interface names to `sw_if_index`. Handles come from VPP replies.
pub const INTERFACE_CONTEXT: NamingContext = NamingContext::new("interfaces", 0);

/// Bridge-domain names to bd ids. VPP reserves bd 0.
pub const BRIDGE_DOMAIN_CONTEXT: NamingContext = NamingContext::new("bridge-domains", 1);

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod testing;
