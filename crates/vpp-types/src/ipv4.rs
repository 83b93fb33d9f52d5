//! IPv4 interface address types.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// An IPv4 address with its prefix length, as configured on an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ipv4Prefix {
    address: Ipv4Addr,
    prefix_length: u8,
}

impl Ipv4Prefix {
    /// Creates a prefix, rejecting lengths outside 1-32.
    pub fn new(address: Ipv4Addr, prefix_length: u8) -> Result<Self, ParseError> {
        if prefix_length == 0 || prefix_length > 32 {
            return Err(ParseError::InvalidPrefixLength(prefix_length));
        }
        Ok(Self {
            address,
            prefix_length,
        })
    }

    /// Creates a prefix from a dotted-quad network mask.
    pub fn with_netmask(address: Ipv4Addr, netmask: &str) -> Result<Self, ParseError> {
        Self::new(address, netmask_to_prefix_length(netmask)?)
    }

    pub const fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub const fn prefix_length(&self) -> u8 {
        self.prefix_length
    }

    /// Address bytes in network order, as carried by VPP address requests.
    pub const fn octets(&self) -> [u8; 4] {
        self.address.octets()
    }
}

impl fmt::Display for Ipv4Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_length)
    }
}

impl FromStr for Ipv4Prefix {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, len) = s
            .split_once('/')
            .ok_or_else(|| ParseError::InvalidIpAddress(s.to_string()))?;
        let address = addr
            .parse::<Ipv4Addr>()
            .map_err(|_| ParseError::InvalidIpAddress(s.to_string()))?;
        let prefix_length = len
            .parse::<u8>()
            .map_err(|_| ParseError::InvalidIpAddress(s.to_string()))?;
        Self::new(address, prefix_length)
    }
}

/// Converts a dotted-quad network mask into a prefix length.
///
/// `255.255.255.128` gives 25 and `255.0.0.0` gives 8. The mask must have a
/// leading one bit, must not be all ones and must be contiguous.
pub fn netmask_to_prefix_length(mask: &str) -> Result<u8, ParseError> {
    let invalid = |reason| ParseError::InvalidNetmask {
        mask: mask.to_string(),
        reason,
    };

    let parts: Vec<&str> = mask.split('.').collect();
    if parts.len() != 4 {
        return Err(invalid("not in dotted quad notation"));
    }

    let mut bits: u32 = 0;
    for part in parts {
        let value: u8 = part
            .parse()
            .map_err(|_| invalid("octets must be numbers between 0 and 255"))?;
        bits = (bits << 8) | u32::from(value);
    }

    if bits & 0x8000_0000 == 0 {
        return Err(invalid("mask must start with a one bit"));
    }
    if bits == u32::MAX {
        return Err(invalid("broadcast mask is not allowed"));
    }

    let leading = bits.leading_ones();
    if bits << leading != 0 {
        return Err(invalid("non-contiguous mask is not allowed"));
    }

    // leading is in 1..=31 here
    Ok(leading as u8)
}
