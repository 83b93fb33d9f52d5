use super::interface_name;
use crate::{BRIDGE_DOMAIN_CONTEXT, INTERFACE_CONTEXT};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};
use vpp_api::api::SwInterfaceSetL2Bridge;
use vpp_api::{BridgeDomainId, SwIfIndex};
use vpp_translate_common::{ConfigPath, Customizer, TranslateResult, WriteContext};

/// `.../l2` of an interface or sub-interface: bridge-based interconnection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct L2Bridge {
    /// Name of the bridge domain, resolved through the bridge-domain context.
    pub bridge_domain: String,
    #[serde(default)]
    pub split_horizon_group: u8,
    #[serde(default)]
    pub bridged_virtual_interface: bool,
}

/// Bridge-domain membership. Registered once for interfaces and once for
/// sub-interfaces; the interface name comes from the path.
#[derive(Debug, Default)]
pub struct L2BridgeCustomizer;

impl L2BridgeCustomizer {
    pub fn new() -> Self {
        Self
    }

    async fn set_bridge(
        &self,
        path: &ConfigPath,
        data: &L2Bridge,
        enable: bool,
        ctx: &WriteContext,
    ) -> TranslateResult<()> {
        let name = interface_name(path)?;
        let sw_if_index = INTERFACE_CONTEXT.get_index(&name, ctx).await?;
        let bd_id = BRIDGE_DOMAIN_CONTEXT
            .get_index(&data.bridge_domain, ctx)
            .await?;

        ctx.call(SwInterfaceSetL2Bridge {
            rx_sw_if_index: SwIfIndex::new(sw_if_index),
            bd_id: BridgeDomainId::new(bd_id),
            shg: data.split_horizon_group,
            bvi: u8::from(data.bridged_virtual_interface),
            enable: u8::from(enable),
        })
        .await?;
        debug!(
            interface = %name,
            bridge_domain = %data.bridge_domain,
            bd_id,
            enable,
            "l2 bridge set"
        );
        Ok(())
    }
}

#[async_trait]
impl Customizer for L2BridgeCustomizer {
    type Data = L2Bridge;

    #[instrument(skip_all, fields(path = %path))]
    async fn create(&self, path: &ConfigPath, data: &L2Bridge, ctx: &WriteContext) -> TranslateResult<()> {
        self.set_bridge(path, data, true, ctx).await
    }

    /// VPP moves the interface when it is bound to another domain.
    #[instrument(skip_all, fields(path = %path))]
    async fn update(
        &self,
        path: &ConfigPath,
        _before: &L2Bridge,
        after: &L2Bridge,
        ctx: &WriteContext,
    ) -> TranslateResult<()> {
        self.set_bridge(path, after, true, ctx).await
    }

    #[instrument(skip_all, fields(path = %path))]
    async fn delete(&self, path: &ConfigPath, before: &L2Bridge, ctx: &WriteContext) -> TranslateResult<()> {
        self.set_bridge(path, before, false, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{path, Fixture};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use vpp_api::api::BridgeDomainAddDel;
    use vpp_translate_common::ErrorKind;

    async fn with_bridge_domain(fx: &Fixture) {
        let mut request = BridgeDomainAddDel::delete(BridgeDomainId::new(1));
        request.is_add = 1;
        fx.ctx().call(request).await.unwrap();
        fx.handles.add_name("bridge-domains", 1, "bd1").await.unwrap();
    }

    fn l2(value: serde_json::Value) -> L2Bridge {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_bind_and_unbind() {
        let fx = Fixture::new().await;
        let index = fx.hardware("eth0").await;
        with_bridge_domain(&fx).await;
        let data = l2(json!({"bridge-domain": "bd1", "split-horizon-group": 2}));
        let p = path("interfaces/interface[eth0]/l2");

        L2BridgeCustomizer::new().create(&p, &data, &fx.ctx()).await.unwrap();
        assert_eq!(
            fx.vpp.interface(SwIfIndex::new(index)).unwrap().l2_bridge,
            Some((1, 2, false))
        );

        L2BridgeCustomizer::new().delete(&p, &data, &fx.ctx()).await.unwrap();
        assert_eq!(fx.vpp.interface(SwIfIndex::new(index)).unwrap().l2_bridge, None);
    }

    #[tokio::test]
    async fn test_unknown_bridge_domain_is_not_found() {
        let fx = Fixture::new().await;
        fx.hardware("eth0").await;
        let err = L2BridgeCustomizer::new()
            .create(
                &path("interfaces/interface[eth0]/l2"),
                &l2(json!({"bridge-domain": "missing"})),
                &fx.ctx(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(fx.vpp.calls().is_empty());
    }
}
