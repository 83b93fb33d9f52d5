//! Tap interface messages.

use crate::types::SwIfIndex;
use vpp_types::MacAddress;

/// Creates a tap interface; VPP answers with the new interface index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapConnect {
    pub tap_name: String,
    pub use_random_mac: u8,
    pub mac_address: MacAddress,
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapConnectReply {
    pub retval: i32,
    pub sw_if_index: SwIfIndex,
}

/// Renames a tap or changes its MAC. VPP may assign a new index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapModify {
    pub sw_if_index: SwIfIndex,
    pub tap_name: String,
    pub use_random_mac: u8,
    pub mac_address: MacAddress,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapModifyReply {
    pub retval: i32,
    pub sw_if_index: SwIfIndex,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapDelete {
    pub sw_if_index: SwIfIndex,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapDeleteReply {
    pub retval: i32,
}
