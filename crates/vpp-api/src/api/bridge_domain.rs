//! Bridge-domain messages.

use crate::types::BridgeDomainId;

/// Creates, modifies (`is_add` on an existing id) or deletes a bridge domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeDomainAddDel {
    pub bd_id: BridgeDomainId,
    pub flood: u8,
    pub uu_flood: u8,
    pub forward: u8,
    pub learn: u8,
    pub arp_term: u8,
    pub mac_age: u8,
    pub is_add: u8,
}

impl BridgeDomainAddDel {
    /// Delete request; VPP ignores the flags when `is_add` is 0.
    pub fn delete(bd_id: BridgeDomainId) -> Self {
        Self {
            bd_id,
            flood: 0,
            uu_flood: 0,
            forward: 0,
            learn: 0,
            arp_term: 0,
            mac_age: 0,
            is_add: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeDomainAddDelReply {
    pub retval: i32,
}
