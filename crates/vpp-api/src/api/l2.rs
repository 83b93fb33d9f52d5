//! L2 bridge membership messages.

use crate::types::{BridgeDomainId, SwIfIndex};

/// Adds an interface to a bridge domain (`enable` = 1) or returns it to L3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwInterfaceSetL2Bridge {
    pub rx_sw_if_index: SwIfIndex,
    pub bd_id: BridgeDomainId,
    /// Split-horizon group.
    pub shg: u8,
    /// Bridged virtual interface flag.
    pub bvi: u8,
    pub enable: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwInterfaceSetL2BridgeReply {
    pub retval: i32,
}
