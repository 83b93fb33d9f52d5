//! IEEE 802.1Q tag types used by sub-interfaces.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// IEEE 802.1Q VLAN identifier (1-4094).
///
/// # Examples
///
/// ```
/// use vpp_types::VlanId;
///
/// assert_eq!(VlanId::new(100).unwrap().as_u16(), 100);
/// assert!(VlanId::new(0).is_err());
/// assert!(VlanId::new(4095).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct VlanId(u16);

impl VlanId {
    pub const MIN: u16 = 1;
    pub const MAX: u16 = 4094;

    pub const fn new(id: u16) -> Result<Self, ParseError> {
        if id >= Self::MIN && id <= Self::MAX {
            Ok(VlanId(id))
        } else {
            Err(ParseError::InvalidVlanId(id))
        }
    }

    pub const fn as_u16(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for VlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u16> for VlanId {
    type Error = ParseError;

    fn try_from(id: u16) -> Result<Self, Self::Error> {
        VlanId::new(id)
    }
}

impl From<VlanId> for u16 {
    fn from(vlan: VlanId) -> u16 {
        vlan.0
    }
}

/// Tag ethertype class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TagType {
    /// Service tag (802.1ad outer tag).
    SVlan,
    /// Customer tag (802.1Q inner tag).
    CVlan,
}

/// VLAN value carried by a tag: a concrete id or the `any` wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VlanMatch {
    Id(VlanId),
    Any(AnyKeyword),
}

/// The literal `"any"` in configuration data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnyKeyword {
    Any,
}

impl VlanMatch {
    /// VLAN id as sent to VPP; 0 tells VPP the id is absent.
    pub fn wire_id(&self) -> u16 {
        match self {
            VlanMatch::Id(id) => id.as_u16(),
            VlanMatch::Any(_) => 0,
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, VlanMatch::Any(_))
    }
}

/// A single 802.1Q tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Dot1qTag {
    pub tag_type: TagType,
    pub vlan_id: VlanMatch,
}
