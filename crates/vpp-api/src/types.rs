//! Type-safe VPP handle wrappers.
//!
//! VPP identifies most objects by a bare `u32`. Wrapping each kind in its own
//! type prevents passing, for example, a bridge-domain id where a software
//! interface index is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

/// Raw VPP handle type (`u32` on the wire).
pub type RawHandle = u32;

/// Marker trait for VPP handle kinds.
pub trait VppHandleKind: Send + Sync + 'static {
    /// Returns the handle kind name for debugging.
    fn type_name() -> &'static str;
}

/// A type-safe VPP handle.
///
/// # Examples
///
/// ```
/// use vpp_api::{BridgeDomainId, SwIfIndex};
///
/// let sw_if_index = SwIfIndex::new(3);
/// let bd_id = BridgeDomainId::new(3);
/// assert_eq!(sw_if_index.as_raw(), bd_id.as_raw());
///
/// // This would fail to compile:
/// // fn takes_interface(i: SwIfIndex) {}
/// // takes_interface(bd_id);
/// ```
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct VppHandle<T: VppHandleKind> {
    raw: RawHandle,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: VppHandleKind> VppHandle<T> {
    /// VPP's "no object" value (`~0`).
    pub const INVALID: Self = Self {
        raw: u32::MAX,
        _marker: PhantomData,
    };

    pub const fn new(raw: RawHandle) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    pub const fn as_raw(&self) -> RawHandle {
        self.raw
    }

    pub const fn is_valid(&self) -> bool {
        self.raw != u32::MAX
    }
}

impl<T: VppHandleKind> Clone for VppHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: VppHandleKind> Copy for VppHandle<T> {}

impl<T: VppHandleKind> fmt::Debug for VppHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", T::type_name(), self.raw)
    }
}

impl<T: VppHandleKind> fmt::Display for VppHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl<T: VppHandleKind> PartialEq for VppHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T: VppHandleKind> Eq for VppHandle<T> {}

impl<T: VppHandleKind> Hash for VppHandle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<T: VppHandleKind> From<VppHandle<T>> for RawHandle {
    fn from(handle: VppHandle<T>) -> RawHandle {
        handle.raw
    }
}

macro_rules! define_handle_kind {
    ($name:ident, $type_name:literal, $alias:ident) => {
        /// Marker type for VPP $type_name handles.
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl VppHandleKind for $name {
            fn type_name() -> &'static str {
                $type_name
            }
        }

        /// Type alias for $type_name handles.
        pub type $alias = VppHandle<$name>;
    };
}

define_handle_kind!(SwInterfaceKind, "SwIfIndex", SwIfIndex);
define_handle_kind!(BridgeDomainKind, "BridgeDomainId", BridgeDomainId);
