//! Request/reply bridge to VPP.
//!
//! One [`ReplyBridge::call`] sends a request, waits for its reply with a
//! deadline and turns the outcome into a [`TranslateError`]:
//!
//! - nonzero `retval`: `CallFailed` carrying the VPP status
//! - lost connection or deadline: `CallFailed` carrying the transport cause
//! - correlation id already in flight: `Internal` (a programming error)
//!
//! The bridge never retries.

use crate::error::{TranslateError, TranslateResult};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};
use vpp_api::{ApiError, ApiReply, ApiRequest, ControlPlane};

/// An in-flight request.
#[derive(Debug, Clone)]
struct PendingCall {
    operation: &'static str,
    deadline: Instant,
}

/// Removes the pending entry however the call ends, including cancellation.
struct PendingGuard<'a> {
    pending: &'a DashMap<u32, PendingCall>,
    context: u32,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.remove(&self.context);
    }
}

/// Awaits VPP replies on behalf of translation units.
pub struct ReplyBridge {
    control_plane: Arc<dyn ControlPlane>,
    pending: DashMap<u32, PendingCall>,
    next_context: AtomicU32,
    timeout: Duration,
}

impl ReplyBridge {
    pub fn new(control_plane: Arc<dyn ControlPlane>, timeout: Duration) -> Self {
        Self {
            control_plane,
            pending: DashMap::new(),
            next_context: AtomicU32::new(1),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of calls currently awaiting a reply.
    pub fn pending_calls(&self) -> usize {
        self.pending.len()
    }

    /// Sends `request` under a fresh correlation id and awaits its reply.
    pub async fn call<R: ApiRequest>(&self, request: R) -> TranslateResult<R::Reply> {
        let context = self.next_context.fetch_add(1, Ordering::Relaxed);
        self.call_with_context(context, request).await
    }

    /// Sends `request` under a caller-chosen correlation id.
    ///
    /// Reusing an id whose call has not resolved yet fails with `Internal`
    /// without sending anything.
    pub async fn call_with_context<R: ApiRequest>(
        &self,
        context: u32,
        request: R,
    ) -> TranslateResult<R::Reply> {
        let operation = R::NAME;
        let deadline = Instant::now() + self.timeout;

        match self.pending.entry(context) {
            Entry::Occupied(existing) => {
                let pending = existing.get();
                let message = format!(
                    "context {} reused by {} while {} is pending for another {:?}",
                    context,
                    operation,
                    pending.operation,
                    pending.deadline.saturating_duration_since(Instant::now())
                );
                return Err(TranslateError::internal(message));
            }
            Entry::Vacant(slot) => {
                slot.insert(PendingCall {
                    operation,
                    deadline,
                });
            }
        }
        let _guard = PendingGuard {
            pending: &self.pending,
            context,
        };

        debug!(context, operation, ?request, "sending");
        let receiver = self
            .control_plane
            .send(context, request.into_message())
            .await
            .map_err(|e| TranslateError::call_failed(operation, e))?;

        let message = match tokio::time::timeout_at(deadline, receiver).await {
            Ok(Ok(message)) => message,
            Ok(Err(_)) => {
                return Err(TranslateError::call_failed(
                    operation,
                    ApiError::transport("connection closed before reply"),
                ));
            }
            Err(_) => {
                warn!(context, operation, "reply deadline expired");
                return Err(TranslateError::call_failed(
                    operation,
                    ApiError::timeout(self.timeout),
                ));
            }
        };

        let reply =
            R::Reply::from_message(message).map_err(|e| TranslateError::call_failed(operation, e))?;
        let retval = reply.retval();
        if retval != 0 {
            debug!(context, operation, retval, "rejected");
            return Err(TranslateError::call_failed(
                operation,
                ApiError::from_retval(retval),
            ));
        }
        Ok(reply)
    }
}

impl std::fmt::Debug for ReplyBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyBridge")
            .field("pending", &self.pending.len())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vpp_api::api::{BridgeDomainAddDel, TapConnect};
    use vpp_api::{ApiStatus, BridgeDomainId, SimulatedVpp};
    use vpp_types::MacAddress;

    fn bd_add(bd_id: u32) -> BridgeDomainAddDel {
        BridgeDomainAddDel {
            bd_id: BridgeDomainId::new(bd_id),
            flood: 1,
            uu_flood: 1,
            forward: 1,
            learn: 1,
            arp_term: 0,
            mac_age: 0,
            is_add: 1,
        }
    }

    fn bridge(vpp: &Arc<SimulatedVpp>, timeout: Duration) -> ReplyBridge {
        ReplyBridge::new(Arc::clone(vpp) as Arc<dyn ControlPlane>, timeout)
    }

    #[tokio::test]
    async fn test_successful_call() {
        let vpp = Arc::new(SimulatedVpp::new());
        let bridge = bridge(&vpp, Duration::from_secs(1));
        let reply = bridge
            .call(TapConnect {
                tap_name: "tap0".to_string(),
                use_random_mac: 1,
                mac_address: MacAddress::ZERO,
                tag: String::new(),
            })
            .await
            .unwrap();
        assert_eq!(reply.sw_if_index.as_raw(), 1);
        assert_eq!(bridge.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_nonzero_retval_is_call_failed() {
        let vpp = Arc::new(SimulatedVpp::new());
        vpp.fail_next("bridge_domain_add_del", -7);
        let bridge = bridge(&vpp, Duration::from_secs(1));

        let err = bridge.call(bd_add(1)).await.unwrap_err();
        match err {
            TranslateError::CallFailed { operation, cause } => {
                assert_eq!(operation, "bridge_domain_add_del");
                assert_eq!(cause.status(), Some(ApiStatus::InvalidValue));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_distinct_from_rejection() {
        let vpp = Arc::new(SimulatedVpp::new());
        vpp.stall("bridge_domain_add_del");
        let bridge = bridge(&vpp, Duration::from_millis(20));

        let err = bridge.call(bd_add(1)).await.unwrap_err();
        match &err {
            TranslateError::CallFailed { cause, .. } => {
                assert!(matches!(cause, ApiError::Timeout { .. }));
                assert!(!cause.is_rejection());
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.retval(), None);
        assert_eq!(bridge.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let vpp = Arc::new(SimulatedVpp::new());
        vpp.disconnect();
        let bridge = bridge(&vpp, Duration::from_secs(1));

        let err = bridge.call(bd_add(1)).await.unwrap_err();
        assert!(matches!(
            err,
            TranslateError::CallFailed {
                cause: ApiError::Transport { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_context_reuse_is_internal_error() {
        let vpp = Arc::new(SimulatedVpp::new());
        vpp.stall("bridge_domain_add_del");
        let bridge = Arc::new(bridge(&vpp, Duration::from_millis(200)));

        let first = {
            let bridge = Arc::clone(&bridge);
            tokio::spawn(async move { bridge.call_with_context(7, bd_add(1)).await })
        };
        while bridge.pending_calls() == 0 {
            tokio::task::yield_now().await;
        }

        let err = bridge.call_with_context(7, bd_add(2)).await.unwrap_err();
        assert!(matches!(err, TranslateError::Internal { .. }));
        // only the first request reached VPP
        assert_eq!(vpp.call_names(), vec!["bridge_domain_add_del"]);

        assert!(first.await.unwrap().is_err());
        assert_eq!(bridge.pending_calls(), 0);
    }
}
