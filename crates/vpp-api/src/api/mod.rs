//! VPP binary API messages.
//!
//! Each request type names exactly one reply type through
//! [`ApiRequest::Reply`], so a caller can never read a tap reply for a
//! bridge-domain request. On the transport side the closed set of messages is
//! carried as [`RequestMessage`] / [`ReplyMessage`].
//!
//! # Available message groups
//!
//! - [`bridge_domain`]: Bridge-domain create/modify/delete
//! - [`tap`]: Tap interface lifecycle
//! - [`interface`]: Sub-interfaces, admin flags, addresses
//! - [`l2`]: L2 bridge membership

pub mod bridge_domain;
pub mod interface;
pub mod l2;
pub mod tap;

pub use bridge_domain::{BridgeDomainAddDel, BridgeDomainAddDelReply};
pub use interface::{
    CreateSubif, CreateSubifReply, DeleteSubif, DeleteSubifReply, SwInterfaceAddDelAddress,
    SwInterfaceAddDelAddressReply, SwInterfaceSetFlags, SwInterfaceSetFlagsReply,
};
pub use l2::{SwInterfaceSetL2Bridge, SwInterfaceSetL2BridgeReply};
pub use tap::{TapConnect, TapConnectReply, TapDelete, TapDeleteReply, TapModify, TapModifyReply};

use crate::error::{ApiError, ApiResult};
use std::fmt::Debug;

/// A request message with its fixed reply type.
pub trait ApiRequest: Debug + Send + 'static {
    /// The only reply VPP sends for this request.
    type Reply: ApiReply;

    /// VPP message name.
    const NAME: &'static str;

    fn into_message(self) -> RequestMessage;
}

/// A reply message carrying a `retval`.
pub trait ApiReply: Debug + Send + Sized + 'static {
    const NAME: &'static str;

    fn retval(&self) -> i32;

    /// Extracts this reply from a transport message.
    fn from_message(message: ReplyMessage) -> ApiResult<Self>;
}

macro_rules! api_messages {
    ($($request:ident => $reply:ident : $name:literal),* $(,)?) => {
        /// Any request the translation layer can send.
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum RequestMessage {
            $($request($request),)*
        }

        impl RequestMessage {
            /// VPP message name.
            pub fn name(&self) -> &'static str {
                match self {
                    $(RequestMessage::$request(_) => $name,)*
                }
            }
        }

        /// Any reply VPP can send for a [`RequestMessage`].
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum ReplyMessage {
            $($reply($reply),)*
        }

        impl ReplyMessage {
            /// VPP message name.
            pub fn name(&self) -> &'static str {
                match self {
                    $(ReplyMessage::$reply(_) => <$reply as ApiReply>::NAME,)*
                }
            }

            pub fn retval(&self) -> i32 {
                match self {
                    $(ReplyMessage::$reply(reply) => reply.retval,)*
                }
            }
        }

        $(
            impl ApiRequest for $request {
                type Reply = $reply;
                const NAME: &'static str = $name;

                fn into_message(self) -> RequestMessage {
                    RequestMessage::$request(self)
                }
            }

            impl ApiReply for $reply {
                const NAME: &'static str = concat!($name, "_reply");

                fn retval(&self) -> i32 {
                    self.retval
                }

                fn from_message(message: ReplyMessage) -> ApiResult<Self> {
                    match message {
                        ReplyMessage::$reply(reply) => Ok(reply),
                        #[allow(unreachable_patterns)]
                        other => Err(ApiError::UnexpectedReply {
                            expected: <Self as ApiReply>::NAME,
                            actual: other.name(),
                        }),
                    }
                }
            }
        )*
    };
}

api_messages! {
    BridgeDomainAddDel => BridgeDomainAddDelReply: "bridge_domain_add_del",
    TapConnect => TapConnectReply: "tap_connect",
    TapModify => TapModifyReply: "tap_modify",
    TapDelete => TapDeleteReply: "tap_delete",
    CreateSubif => CreateSubifReply: "create_subif",
    DeleteSubif => DeleteSubifReply: "delete_subif",
    SwInterfaceSetFlags => SwInterfaceSetFlagsReply: "sw_interface_set_flags",
    SwInterfaceAddDelAddress => SwInterfaceAddDelAddressReply: "sw_interface_add_del_address",
    SwInterfaceSetL2Bridge => SwInterfaceSetL2BridgeReply: "sw_interface_set_l2_bridge",
}
