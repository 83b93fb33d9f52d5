//! Value types for the VPP configuration model.
//!
//! These types sit between the configuration data handed to translation
//! units and the byte-level fields of VPP binary API requests:
//!
//! - [`MacAddress`]: 48-bit physical address
//! - [`Ipv4Prefix`]: IPv4 address plus prefix length, with dotted netmask support
//! - [`VlanId`], [`Dot1qTag`]: IEEE 802.1Q tag values used by sub-interfaces

mod ipv4;
mod mac;
mod vlan;

pub use ipv4::{netmask_to_prefix_length, Ipv4Prefix};
pub use mac::MacAddress;
pub use vlan::{Dot1qTag, TagType, VlanId, VlanMatch};

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid MAC address format: {0}")]
    InvalidMacAddress(String),

    #[error("invalid IPv4 address format: {0}")]
    InvalidIpAddress(String),

    #[error("invalid prefix length {0} (must be 1-32)")]
    InvalidPrefixLength(u8),

    #[error("invalid network mask {mask}: {reason}")]
    InvalidNetmask { mask: String, reason: &'static str },

    #[error("invalid VLAN ID: {0} (must be 1-4094)")]
    InvalidVlanId(u16),
}
