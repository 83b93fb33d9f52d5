//! Typed access to the VPP binary API.
//!
//! This crate wraps the subset of VPP request/reply messages used by the
//! translation layer and prevents the usual mistakes of the raw API, such as
//! passing a bridge-domain id where an interface index is expected or reading
//! the wrong reply for a request.
//!
//! # Architecture
//!
//! - [`types`]: Type-safe handles ([`SwIfIndex`], [`BridgeDomainId`])
//! - [`error`]: `retval` status codes and the transport error type
//! - [`api`]: Request/reply message pairs, grouped by feature
//! - [`ControlPlane`]: Async transport seam carrying messages to VPP
//! - [`SimulatedVpp`]: In-process control plane used by tests and dry runs
//!
//! # Example
//!
//! ```ignore
//! use vpp_api::{api::SwInterfaceSetFlags, ApiRequest, SwIfIndex};
//!
//! let request = SwInterfaceSetFlags {
//!     sw_if_index: SwIfIndex::new(1),
//!     admin_up_down: 1,
//! };
//! // The reply type is fixed by the request type
//! let reply: <SwInterfaceSetFlags as ApiRequest>::Reply = bridge.call(request).await?;
//! ```

pub mod api;
pub mod error;
pub mod types;

mod control_plane;
mod sim;

pub use api::{ApiReply, ApiRequest, ReplyMessage, RequestMessage};
pub use control_plane::{ControlPlane, ReplyReceiver};
pub use error::{ApiError, ApiResult, ApiStatus};
pub use sim::{SimBridgeDomain, SimInterface, SimInterfaceKind, SimulatedVpp};
pub use types::{
    BridgeDomainId, BridgeDomainKind, SwIfIndex, SwInterfaceKind, VppHandle, VppHandleKind,
};
