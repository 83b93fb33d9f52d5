//! Transport seam between the translation layer and VPP.

use crate::api::{ReplyMessage, RequestMessage};
use crate::error::ApiResult;
use async_trait::async_trait;
use tokio::sync::oneshot;

/// Resolves with VPP's reply. Closes without a value if the connection is
/// lost before the reply arrives.
pub type ReplyReceiver = oneshot::Receiver<ReplyMessage>;

/// An asynchronous request/reply connection to VPP.
///
/// `send` only hands the request to the transport. The reply is delivered
/// through the returned receiver, matched by the `context` the caller tagged
/// the request with. Implementations must be `Send + Sync` so that one
/// connection can serve every translation unit.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn send(&self, context: u32, request: RequestMessage) -> ApiResult<ReplyReceiver>;
}
