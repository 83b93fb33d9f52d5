//! In-process VPP stand-in.
//!
//! `SimulatedVpp` keeps a small model of interfaces and bridge domains and
//! answers every request the way VPP would for the subset of behavior the
//! translation layer relies on. Tests use its failure injection to force
//! nonzero `retval`s, stalled replies and lost connections.

use crate::api::*;
use crate::control_plane::{ControlPlane, ReplyReceiver};
use crate::error::{ApiError, ApiResult, ApiStatus};
use crate::types::{BridgeDomainId, SwIfIndex};
use async_trait::async_trait;
use log::{debug, info};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::net::Ipv4Addr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use vpp_types::MacAddress;

/// What kind of interface a simulated index refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimInterfaceKind {
    Hardware,
    Tap { mac: MacAddress },
    SubInterface { parent: u32, sub_id: u32 },
}

/// A simulated software interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimInterface {
    pub sw_if_index: u32,
    pub name: String,
    pub kind: SimInterfaceKind,
    pub admin_up: bool,
    pub ipv4: Vec<(Ipv4Addr, u8)>,
    /// Bridge-domain membership as (bd_id, shg, bvi).
    pub l2_bridge: Option<(u32, u8, bool)>,
}

/// A simulated bridge domain and its flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimBridgeDomain {
    pub bd_id: u32,
    pub flood: bool,
    pub uu_flood: bool,
    pub forward: bool,
    pub learn: bool,
    pub arp_term: bool,
    pub mac_age: u8,
}

#[derive(Debug, Default)]
struct SimState {
    interfaces: BTreeMap<u32, SimInterface>,
    bridge_domains: BTreeMap<u32, SimBridgeDomain>,
    next_sw_if_index: u32,
    calls: Vec<RequestMessage>,
    injected: HashMap<String, VecDeque<i32>>,
    stalled_operations: Vec<String>,
    stalled_replies: Vec<oneshot::Sender<ReplyMessage>>,
    disconnected: bool,
}

/// Simulated VPP control plane.
#[derive(Debug)]
pub struct SimulatedVpp {
    state: Mutex<SimState>,
}

impl SimulatedVpp {
    /// Creates a simulator holding only `local0` at index 0.
    pub fn new() -> Self {
        let mut state = SimState {
            next_sw_if_index: 1,
            ..SimState::default()
        };
        state.interfaces.insert(
            0,
            SimInterface {
                sw_if_index: 0,
                name: "local0".to_string(),
                kind: SimInterfaceKind::Hardware,
                admin_up: false,
                ipv4: Vec::new(),
                l2_bridge: None,
            },
        );
        Self {
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a hardware interface, as if VPP had discovered a NIC.
    pub fn add_hardware_interface(&self, name: impl Into<String>) -> SwIfIndex {
        let mut state = self.state();
        let index = state.next_sw_if_index;
        state.next_sw_if_index += 1;
        state.interfaces.insert(
            index,
            SimInterface {
                sw_if_index: index,
                name: name.into(),
                kind: SimInterfaceKind::Hardware,
                admin_up: false,
                ipv4: Vec::new(),
                l2_bridge: None,
            },
        );
        SwIfIndex::new(index)
    }

    /// The next request named `operation` is answered with `retval` and does
    /// not change simulated state.
    pub fn fail_next(&self, operation: &str, retval: i32) {
        self.state()
            .injected
            .entry(operation.to_string())
            .or_default()
            .push_back(retval);
    }

    /// Requests named `operation` are accepted but never answered.
    pub fn stall(&self, operation: &str) {
        self.state().stalled_operations.push(operation.to_string());
    }

    /// Every following send fails with a transport error.
    pub fn disconnect(&self) {
        let mut state = self.state();
        state.disconnected = true;
        state.stalled_replies.clear();
    }

    /// Every request received so far, in arrival order.
    pub fn calls(&self) -> Vec<RequestMessage> {
        self.state().calls.clone()
    }

    /// Names of every request received so far, in arrival order.
    pub fn call_names(&self) -> Vec<&'static str> {
        self.state().calls.iter().map(RequestMessage::name).collect()
    }

    pub fn interface(&self, sw_if_index: SwIfIndex) -> Option<SimInterface> {
        self.state().interfaces.get(&sw_if_index.as_raw()).cloned()
    }

    pub fn interface_by_name(&self, name: &str) -> Option<SimInterface> {
        self.state()
            .interfaces
            .values()
            .find(|iface| iface.name == name)
            .cloned()
    }

    pub fn bridge_domain(&self, bd_id: BridgeDomainId) -> Option<SimBridgeDomain> {
        self.state().bridge_domains.get(&bd_id.as_raw()).cloned()
    }

    pub fn bridge_domain_count(&self) -> usize {
        self.state().bridge_domains.len()
    }
}

impl Default for SimulatedVpp {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ControlPlane for SimulatedVpp {
    async fn send(&self, context: u32, request: RequestMessage) -> ApiResult<ReplyReceiver> {
        let mut state = self.state();
        if state.disconnected {
            return Err(ApiError::transport("connection to VPP closed"));
        }

        let name = request.name();
        debug!("sim: context {} -> {}", context, name);
        state.calls.push(request.clone());

        let (tx, rx) = oneshot::channel();
        if state.stalled_operations.iter().any(|op| op == name) {
            state.stalled_replies.push(tx);
            return Ok(rx);
        }

        let injected = state
            .injected
            .get_mut(name)
            .and_then(|queue| queue.pop_front());
        let reply = match injected {
            Some(retval) => {
                info!("sim: injecting retval {} for {}", retval, name);
                error_reply(&request, retval)
            }
            None => match state.handle(&request) {
                Ok(reply) => reply,
                Err(status) => error_reply(&request, status.as_raw()),
            },
        };

        // The receiver is still held by us, so this cannot fail.
        let _ = tx.send(reply);
        Ok(rx)
    }
}

impl SimState {
    fn handle(&mut self, request: &RequestMessage) -> Result<ReplyMessage, ApiStatus> {
        match request {
            RequestMessage::BridgeDomainAddDel(req) => self.bridge_domain_add_del(req),
            RequestMessage::TapConnect(req) => self.tap_connect(req),
            RequestMessage::TapModify(req) => self.tap_modify(req),
            RequestMessage::TapDelete(req) => {
                self.tap(req.sw_if_index)?;
                self.interfaces.remove(&req.sw_if_index.as_raw());
                Ok(ReplyMessage::TapDeleteReply(TapDeleteReply { retval: 0 }))
            }
            RequestMessage::CreateSubif(req) => self.create_subif(req),
            RequestMessage::DeleteSubif(req) => {
                let iface = self.existing(req.sw_if_index)?;
                if !matches!(iface.kind, SimInterfaceKind::SubInterface { .. }) {
                    return Err(ApiStatus::InvalidSwIfIndex);
                }
                self.interfaces.remove(&req.sw_if_index.as_raw());
                Ok(ReplyMessage::DeleteSubifReply(DeleteSubifReply { retval: 0 }))
            }
            RequestMessage::SwInterfaceSetFlags(req) => {
                self.existing_mut(req.sw_if_index)?.admin_up = req.admin_up_down != 0;
                Ok(ReplyMessage::SwInterfaceSetFlagsReply(
                    SwInterfaceSetFlagsReply { retval: 0 },
                ))
            }
            RequestMessage::SwInterfaceAddDelAddress(req) => self.add_del_address(req),
            RequestMessage::SwInterfaceSetL2Bridge(req) => self.set_l2_bridge(req),
        }
    }

    fn existing(&self, sw_if_index: SwIfIndex) -> Result<&SimInterface, ApiStatus> {
        self.interfaces
            .get(&sw_if_index.as_raw())
            .ok_or(ApiStatus::InvalidSwIfIndex)
    }

    fn existing_mut(&mut self, sw_if_index: SwIfIndex) -> Result<&mut SimInterface, ApiStatus> {
        self.interfaces
            .get_mut(&sw_if_index.as_raw())
            .ok_or(ApiStatus::InvalidSwIfIndex)
    }

    fn tap(&self, sw_if_index: SwIfIndex) -> Result<&SimInterface, ApiStatus> {
        let iface = self.existing(sw_if_index)?;
        match iface.kind {
            SimInterfaceKind::Tap { .. } => Ok(iface),
            _ => Err(ApiStatus::InvalidSwIfIndex),
        }
    }

    fn name_taken(&self, name: &str) -> bool {
        self.interfaces.values().any(|iface| iface.name == name)
    }

    fn allocate_index(&mut self) -> u32 {
        let index = self.next_sw_if_index;
        self.next_sw_if_index += 1;
        index
    }

    fn bridge_domain_add_del(
        &mut self,
        req: &BridgeDomainAddDel,
    ) -> Result<ReplyMessage, ApiStatus> {
        let bd_id = req.bd_id.as_raw();
        // bd 0 is the default domain and cannot be managed
        if bd_id == 0 {
            return Err(ApiStatus::InvalidValue);
        }
        if req.is_add != 0 {
            self.bridge_domains.insert(
                bd_id,
                SimBridgeDomain {
                    bd_id,
                    flood: req.flood != 0,
                    uu_flood: req.uu_flood != 0,
                    forward: req.forward != 0,
                    learn: req.learn != 0,
                    arp_term: req.arp_term != 0,
                    mac_age: req.mac_age,
                },
            );
        } else {
            if !self.bridge_domains.contains_key(&bd_id) {
                return Err(ApiStatus::NoSuchEntry);
            }
            let in_use = self
                .interfaces
                .values()
                .any(|iface| matches!(iface.l2_bridge, Some((id, _, _)) if id == bd_id));
            if in_use {
                return Err(ApiStatus::InvalidValue);
            }
            self.bridge_domains.remove(&bd_id);
        }
        Ok(ReplyMessage::BridgeDomainAddDelReply(
            BridgeDomainAddDelReply { retval: 0 },
        ))
    }

    fn tap_connect(&mut self, req: &TapConnect) -> Result<ReplyMessage, ApiStatus> {
        if req.tap_name.is_empty() || self.name_taken(&req.tap_name) {
            return Err(ApiStatus::InvalidValue);
        }
        let index = self.allocate_index();
        let mac = if req.use_random_mac != 0 {
            generated_mac(index)
        } else {
            req.mac_address
        };
        self.interfaces.insert(
            index,
            SimInterface {
                sw_if_index: index,
                name: req.tap_name.clone(),
                kind: SimInterfaceKind::Tap { mac },
                admin_up: false,
                ipv4: Vec::new(),
                l2_bridge: None,
            },
        );
        Ok(ReplyMessage::TapConnectReply(TapConnectReply {
            retval: 0,
            sw_if_index: SwIfIndex::new(index),
        }))
    }

    fn tap_modify(&mut self, req: &TapModify) -> Result<ReplyMessage, ApiStatus> {
        self.tap(req.sw_if_index)?;
        let renamed_to_existing = self
            .interfaces
            .values()
            .any(|iface| iface.name == req.tap_name && iface.sw_if_index != req.sw_if_index.as_raw());
        if req.tap_name.is_empty() || renamed_to_existing {
            return Err(ApiStatus::InvalidValue);
        }
        let mac = if req.use_random_mac != 0 {
            generated_mac(req.sw_if_index.as_raw())
        } else {
            req.mac_address
        };
        let iface = self.existing_mut(req.sw_if_index)?;
        iface.name = req.tap_name.clone();
        iface.kind = SimInterfaceKind::Tap { mac };
        Ok(ReplyMessage::TapModifyReply(TapModifyReply {
            retval: 0,
            sw_if_index: req.sw_if_index,
        }))
    }

    fn create_subif(&mut self, req: &CreateSubif) -> Result<ReplyMessage, ApiStatus> {
        let parent = self.existing(req.sw_if_index)?;
        if matches!(parent.kind, SimInterfaceKind::SubInterface { .. }) {
            return Err(ApiStatus::InvalidSwIfIndex);
        }
        let name = format!("{}.{}", parent.name, req.sub_id);
        if self.name_taken(&name) {
            return Err(ApiStatus::InvalidValue);
        }
        let index = self.allocate_index();
        self.interfaces.insert(
            index,
            SimInterface {
                sw_if_index: index,
                name,
                kind: SimInterfaceKind::SubInterface {
                    parent: req.sw_if_index.as_raw(),
                    sub_id: req.sub_id,
                },
                admin_up: false,
                ipv4: Vec::new(),
                l2_bridge: None,
            },
        );
        Ok(ReplyMessage::CreateSubifReply(CreateSubifReply {
            retval: 0,
            sw_if_index: SwIfIndex::new(index),
        }))
    }

    fn add_del_address(
        &mut self,
        req: &SwInterfaceAddDelAddress,
    ) -> Result<ReplyMessage, ApiStatus> {
        if req.is_ipv6 != 0 {
            return Err(ApiStatus::Unimplemented);
        }
        let address = Ipv4Addr::new(req.address[0], req.address[1], req.address[2], req.address[3]);
        let entry = (address, req.address_length);
        let iface = self.existing_mut(req.sw_if_index)?;
        if req.del_all != 0 {
            iface.ipv4.clear();
        } else if req.is_add != 0 {
            if !iface.ipv4.contains(&entry) {
                iface.ipv4.push(entry);
            }
        } else {
            let before = iface.ipv4.len();
            iface.ipv4.retain(|existing| *existing != entry);
            if iface.ipv4.len() == before {
                return Err(ApiStatus::NoSuchEntry);
            }
        }
        Ok(ReplyMessage::SwInterfaceAddDelAddressReply(
            SwInterfaceAddDelAddressReply { retval: 0 },
        ))
    }

    fn set_l2_bridge(&mut self, req: &SwInterfaceSetL2Bridge) -> Result<ReplyMessage, ApiStatus> {
        let bd_id = req.bd_id.as_raw();
        if req.enable != 0 && !self.bridge_domains.contains_key(&bd_id) {
            return Err(ApiStatus::NoSuchEntry);
        }
        let iface = self.existing_mut(req.rx_sw_if_index)?;
        iface.l2_bridge = if req.enable != 0 {
            Some((bd_id, req.shg, req.bvi != 0))
        } else {
            None
        };
        Ok(ReplyMessage::SwInterfaceSetL2BridgeReply(
            SwInterfaceSetL2BridgeReply { retval: 0 },
        ))
    }
}

fn generated_mac(index: u32) -> MacAddress {
    let b = index.to_be_bytes();
    MacAddress::new([0x02, 0xfe, b[0], b[1], b[2], b[3]])
}

/// Builds the reply VPP sends for a rejected request.
fn error_reply(request: &RequestMessage, retval: i32) -> ReplyMessage {
    match request {
        RequestMessage::BridgeDomainAddDel(_) => {
            ReplyMessage::BridgeDomainAddDelReply(BridgeDomainAddDelReply { retval })
        }
        RequestMessage::TapConnect(_) => ReplyMessage::TapConnectReply(TapConnectReply {
            retval,
            sw_if_index: SwIfIndex::INVALID,
        }),
        RequestMessage::TapModify(_) => ReplyMessage::TapModifyReply(TapModifyReply {
            retval,
            sw_if_index: SwIfIndex::INVALID,
        }),
        RequestMessage::TapDelete(_) => ReplyMessage::TapDeleteReply(TapDeleteReply { retval }),
        RequestMessage::CreateSubif(_) => ReplyMessage::CreateSubifReply(CreateSubifReply {
            retval,
            sw_if_index: SwIfIndex::INVALID,
        }),
        RequestMessage::DeleteSubif(_) => {
            ReplyMessage::DeleteSubifReply(DeleteSubifReply { retval })
        }
        RequestMessage::SwInterfaceSetFlags(_) => {
            ReplyMessage::SwInterfaceSetFlagsReply(SwInterfaceSetFlagsReply { retval })
        }
        RequestMessage::SwInterfaceAddDelAddress(_) => {
            ReplyMessage::SwInterfaceAddDelAddressReply(SwInterfaceAddDelAddressReply { retval })
        }
        RequestMessage::SwInterfaceSetL2Bridge(_) => {
            ReplyMessage::SwInterfaceSetL2BridgeReply(SwInterfaceSetL2BridgeReply { retval })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn roundtrip<R: ApiRequest>(vpp: &SimulatedVpp, request: R) -> R::Reply {
        let rx = vpp.send(1, request.into_message()).await.unwrap();
        R::Reply::from_message(rx.await.unwrap()).unwrap()
    }

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

    #[tokio::test]
    async fn test_tap_connect_assigns_index() {
        let vpp = SimulatedVpp::new();
        let reply = roundtrip(
            &vpp,
            TapConnect {
                tap_name: "tap0".to_string(),
                use_random_mac: 1,
                mac_address: MacAddress::ZERO,
                tag: String::new(),
            },
        )
        .await;
        assert_eq!(reply.retval, 0);
        assert_eq!(reply.sw_if_index, SwIfIndex::new(1));
        assert_eq!(vpp.interface_by_name("tap0").unwrap().sw_if_index, 1);
        assert_eq!(vpp.call_names(), vec!["tap_connect"]);
    }

    #[tokio::test]
    async fn test_injected_failure_leaves_state_untouched() {
        let vpp = SimulatedVpp::new();
        vpp.fail_next("bridge_domain_add_del", -7);
        let reply = roundtrip(&vpp, bd_add(1)).await;
        assert_eq!(reply.retval, -7);
        assert_eq!(vpp.bridge_domain_count(), 0);

        let reply = roundtrip(&vpp, bd_add(1)).await;
        assert_eq!(reply.retval, 0);
        assert!(vpp.bridge_domain(BridgeDomainId::new(1)).is_some());
    }

    #[tokio::test]
    async fn test_bridge_domain_delete_with_members_rejected() {
        let vpp = SimulatedVpp::new();
        let eth0 = vpp.add_hardware_interface("eth0");
        roundtrip(&vpp, bd_add(1)).await;
        let reply = roundtrip(
            &vpp,
            SwInterfaceSetL2Bridge {
                rx_sw_if_index: eth0,
                bd_id: BridgeDomainId::new(1),
                shg: 0,
                bvi: 0,
                enable: 1,
            },
        )
        .await;
        assert_eq!(reply.retval, 0);

        let reply = roundtrip(&vpp, BridgeDomainAddDel::delete(BridgeDomainId::new(1))).await;
        assert_eq!(reply.retval, ApiStatus::InvalidValue.as_raw());
    }

    #[tokio::test]
    async fn test_create_subif_names_after_parent() {
        let vpp = SimulatedVpp::new();
        let eth0 = vpp.add_hardware_interface("eth0");
        let reply = roundtrip(
            &vpp,
            CreateSubif {
                sw_if_index: eth0,
                sub_id: 100,
                no_tags: 0,
                one_tag: 1,
                two_tags: 0,
                dot1ad: 1,
                exact_match: 1,
                default_sub: 0,
                outer_vlan_id_any: 0,
                inner_vlan_id_any: 0,
                outer_vlan_id: 100,
                inner_vlan_id: 0,
            },
        )
        .await;
        assert_eq!(reply.retval, 0);
        let sub = vpp.interface(reply.sw_if_index).unwrap();
        assert_eq!(sub.name, "eth0.100");
    }

    #[tokio::test]
    async fn test_disconnect_fails_send() {
        let vpp = SimulatedVpp::new();
        vpp.disconnect();
        let err = vpp
            .send(1, TapDelete { sw_if_index: SwIfIndex::new(1) }.into_message())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Transport { .. }));
    }
}
