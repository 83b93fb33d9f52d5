//! Interface messages: sub-interfaces, admin state and IP addresses.

use crate::types::SwIfIndex;

/// Creates an 802.1Q/802.1ad sub-interface on a parent interface.
///
/// Boolean fields are `u8` flags as on the wire. A vlan id of 0 together with
/// the matching `*_vlan_id_any` flag matches any tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSubif {
    pub sw_if_index: SwIfIndex,
    pub sub_id: u32,
    pub no_tags: u8,
    pub one_tag: u8,
    pub two_tags: u8,
    pub dot1ad: u8,
    pub exact_match: u8,
    pub default_sub: u8,
    pub outer_vlan_id_any: u8,
    pub inner_vlan_id_any: u8,
    pub outer_vlan_id: u16,
    pub inner_vlan_id: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSubifReply {
    pub retval: i32,
    pub sw_if_index: SwIfIndex,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteSubif {
    pub sw_if_index: SwIfIndex,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteSubifReply {
    pub retval: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwInterfaceSetFlags {
    pub sw_if_index: SwIfIndex,
    pub admin_up_down: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwInterfaceSetFlagsReply {
    pub retval: i32,
}

/// Adds or removes an interface address. IPv4 uses the first 4 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwInterfaceAddDelAddress {
    pub sw_if_index: SwIfIndex,
    pub is_add: u8,
    pub is_ipv6: u8,
    pub del_all: u8,
    pub address_length: u8,
    pub address: [u8; 16],
}

impl SwInterfaceAddDelAddress {
    pub fn ipv4(sw_if_index: SwIfIndex, is_add: bool, octets: [u8; 4], prefix_length: u8) -> Self {
        let mut address = [0u8; 16];
        address[..4].copy_from_slice(&octets);
        Self {
            sw_if_index,
            is_add: u8::from(is_add),
            is_ipv6: 0,
            del_all: 0,
            address_length: prefix_length,
            address,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwInterfaceAddDelAddressReply {
    pub retval: i32,
}
