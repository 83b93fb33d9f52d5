use super::set_admin_state;
use crate::{default_true, INTERFACE_CONTEXT};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};
use vpp_translate_common::{ConfigPath, Customizer, TranslateError, TranslateResult, WriteContext};

/// `interfaces/interface[name]`
///
/// Nested containers (tap, l2, ipv4) are handled by their own units and
/// ignored here.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Interface {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Admin state of an interface.
///
/// Interfaces are created by type-specific units (tap) or exist in VPP
/// already (hardware); either way this unit runs after them and only needs
/// the index.
#[derive(Debug, Default)]
pub struct InterfaceCustomizer;

impl InterfaceCustomizer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Customizer for InterfaceCustomizer {
    type Data = Interface;

    #[instrument(skip_all, fields(path = %path))]
    async fn create(
        &self,
        path: &ConfigPath,
        data: &Interface,
        ctx: &WriteContext,
    ) -> TranslateResult<()> {
        if path.last_key() != Some(data.name.as_str()) {
            return Err(TranslateError::validation(
                path,
                format!("interface name {} does not match its key", data.name),
            ));
        }
        let index = INTERFACE_CONTEXT.get_index(&data.name, ctx).await?;
        set_admin_state(index, data.enabled, ctx).await?;
        debug!(name = %data.name, index, enabled = data.enabled, "interface configured");
        Ok(())
    }

    #[instrument(skip_all, fields(path = %path))]
    async fn update(
        &self,
        path: &ConfigPath,
        before: &Interface,
        after: &Interface,
        ctx: &WriteContext,
    ) -> TranslateResult<()> {
        if before.enabled == after.enabled {
            return Ok(());
        }
        let index = INTERFACE_CONTEXT.get_index(&after.name, ctx).await?;
        set_admin_state(index, after.enabled, ctx).await
    }

    async fn delete(
        &self,
        path: &ConfigPath,
        before: &Interface,
        _ctx: &WriteContext,
    ) -> TranslateResult<()> {
        // removal belongs to the type-specific unit; hardware interfaces stay
        debug!(path = %path, name = %before.name, "interface delete is a no-op");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{path, Fixture};
    use serde_json::json;
    use vpp_api::SwIfIndex;
    use vpp_translate_common::ErrorKind;

    fn iface(value: serde_json::Value) -> Interface {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_create_sets_admin_state() {
        let fx = Fixture::new().await;
        let index = fx.hardware("eth0").await;

        InterfaceCustomizer::new()
            .create(&path("interfaces/interface[eth0]"), &iface(json!({"name": "eth0"})), &fx.ctx())
            .await
            .unwrap();
        assert!(fx.vpp.interface(SwIfIndex::new(index)).unwrap().admin_up);
    }

    #[tokio::test]
    async fn test_unknown_interface_is_not_found() {
        let fx = Fixture::new().await;
        let err = InterfaceCustomizer::new()
            .create(&path("interfaces/interface[eth9]"), &iface(json!({"name": "eth9"})), &fx.ctx())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(fx.vpp.calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_toggles_only_on_change() {
        let fx = Fixture::new().await;
        let index = fx.hardware("eth0").await;
        let customizer = InterfaceCustomizer::new();
        let p = path("interfaces/interface[eth0]");
        let up = iface(json!({"name": "eth0", "description": "uplink"}));
        let down = iface(json!({"name": "eth0", "enabled": false}));

        customizer.update(&p, &up, &up, &fx.ctx()).await.unwrap();
        assert!(fx.vpp.calls().is_empty());

        customizer.update(&p, &up, &down, &fx.ctx()).await.unwrap();
        assert!(!fx.vpp.interface(SwIfIndex::new(index)).unwrap().admin_up);
        assert_eq!(fx.vpp.call_names(), vec!["sw_interface_set_flags"]);
    }
}
