//! Interface translation units.

mod interface;
mod ipv4;
mod l2;
mod role;
mod sub_interface;
mod tap;

pub use interface::{Interface, InterfaceCustomizer};
pub use ipv4::{Ipv4Address, Ipv4AddressCustomizer};
pub use l2::{L2Bridge, L2BridgeCustomizer};
pub use role::{InterfaceRole, InterfaceRoleCustomizer};
pub use sub_interface::{
    MatchType, SubInterface, SubInterfaceCustomizer, Tag, Tags, VlanType,
};
pub use tap::{Tap, TapCustomizer};

use vpp_api::api::SwInterfaceSetFlags;
use vpp_api::SwIfIndex;
use vpp_translate_common::{ConfigPath, TranslateError, TranslateResult, WriteContext};

/// VPP name of sub-interface `id` of `parent`.
pub fn sub_interface_name(parent: &str, id: impl std::fmt::Display) -> String {
    format!("{}.{}", parent, id)
}

/// Name in the interface context of the interface or sub-interface that
/// `path` belongs to.
pub(crate) fn interface_name(path: &ConfigPath) -> TranslateResult<String> {
    let parent = path
        .key_of("interface")
        .ok_or_else(|| TranslateError::validation(path, "path has no interface key"))?;
    Ok(match path.key_of("sub-interface") {
        Some(id) => sub_interface_name(parent, id),
        None => parent.to_string(),
    })
}

pub(crate) async fn set_admin_state(
    sw_if_index: u32,
    enabled: bool,
    ctx: &WriteContext,
) -> TranslateResult<()> {
    ctx.call(SwInterfaceSetFlags {
        sw_if_index: SwIfIndex::new(sw_if_index),
        admin_up_down: u8::from(enabled),
    })
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::path;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_interface_name() {
        assert_eq!(
            interface_name(&path("interfaces/interface[eth0]/l2")).unwrap(),
            "eth0"
        );
        assert_eq!(
            interface_name(&path("interfaces/interface[eth0]/sub-interfaces/sub-interface[7]/l2"))
                .unwrap(),
            "eth0.7"
        );
        assert!(interface_name(&path("bridge-domains/bridge-domain[bd1]")).is_err());
    }
}
