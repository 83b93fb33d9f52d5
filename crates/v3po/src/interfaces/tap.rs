use super::interface_name;
use crate::INTERFACE_CONTEXT;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, instrument};
use vpp_api::api::{TapConnect, TapDelete, TapModify};
use vpp_api::SwIfIndex;
use vpp_translate_common::{ConfigPath, Customizer, TranslateError, TranslateResult, WriteContext};
use vpp_types::MacAddress;

/// Longest tag VPP stores with an interface.
const MAX_TAG_LEN: usize = 64;

/// `interfaces/interface[name]/tap`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Tap {
    pub tap_name: String,
    /// Random MAC when absent.
    #[serde(default)]
    pub mac: Option<MacAddress>,
    #[serde(default)]
    pub tag: Option<String>,
}

impl Tap {
    fn validate(&self, path: &ConfigPath) -> TranslateResult<()> {
        if self.tap_name.is_empty() {
            return Err(TranslateError::validation(path, "tap-name must not be empty"));
        }
        if let Some(tag) = &self.tag {
            if !tag.is_ascii() || tag.len() > MAX_TAG_LEN {
                return Err(TranslateError::validation(
                    path,
                    format!("tag must be ASCII of at most {} characters", MAX_TAG_LEN),
                ));
            }
        }
        Ok(())
    }

    fn mac_fields(&self) -> (u8, MacAddress) {
        match self.mac {
            Some(mac) => (0, mac),
            None => (1, MacAddress::ZERO),
        }
    }
}

/// Tap interfaces. VPP picks the index; it is recorded under the
/// interface's configured name.
#[derive(Debug, Default)]
pub struct TapCustomizer;

impl TapCustomizer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Customizer for TapCustomizer {
    type Data = Tap;

    #[instrument(skip_all, fields(path = %path))]
    async fn create(&self, path: &ConfigPath, data: &Tap, ctx: &WriteContext) -> TranslateResult<()> {
        data.validate(path)?;
        let name = interface_name(path)?;
        let (use_random_mac, mac_address) = data.mac_fields();

        let reply = ctx
            .call(TapConnect {
                tap_name: data.tap_name.clone(),
                use_random_mac,
                mac_address,
                tag: data.tag.clone().unwrap_or_default(),
            })
            .await?;
        INTERFACE_CONTEXT
            .add_name(reply.sw_if_index.as_raw(), &name, ctx)
            .await?;
        info!(name = %name, sw_if_index = %reply.sw_if_index, "tap created");
        Ok(())
    }

    #[instrument(skip_all, fields(path = %path))]
    async fn update(
        &self,
        path: &ConfigPath,
        _before: &Tap,
        after: &Tap,
        ctx: &WriteContext,
    ) -> TranslateResult<()> {
        after.validate(path)?;
        let name = interface_name(path)?;
        let index = INTERFACE_CONTEXT.get_index(&name, ctx).await?;
        let (use_random_mac, mac_address) = after.mac_fields();

        let reply = ctx
            .call(TapModify {
                sw_if_index: SwIfIndex::new(index),
                tap_name: after.tap_name.clone(),
                use_random_mac,
                mac_address,
            })
            .await?;

        let new_index = reply.sw_if_index.as_raw();
        if new_index != index {
            INTERFACE_CONTEXT.remove_name(&name, ctx).await?;
            INTERFACE_CONTEXT.add_name(new_index, &name, ctx).await?;
            debug!(name = %name, from = index, to = new_index, "tap index changed");
        }
        Ok(())
    }

    #[instrument(skip_all, fields(path = %path))]
    async fn delete(&self, path: &ConfigPath, _before: &Tap, ctx: &WriteContext) -> TranslateResult<()> {
        let name = interface_name(path)?;
        let index = INTERFACE_CONTEXT.get_index(&name, ctx).await?;
        ctx.call(TapDelete {
            sw_if_index: SwIfIndex::new(index),
        })
        .await?;
        INTERFACE_CONTEXT.remove_name(&name, ctx).await?;
        info!(name = %name, sw_if_index = index, "tap deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{path, Fixture};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use vpp_api::SimInterfaceKind;
    use vpp_translate_common::ErrorKind;

    fn tap(value: serde_json::Value) -> Tap {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_create_maps_reply_index() {
        let fx = Fixture::new().await;
        fx.hardware("eth0").await;

        TapCustomizer::new()
            .create(
                &path("interfaces/interface[tap0]/tap"),
                &tap(json!({"tap-name": "vpp-tap0", "mac": "02:00:00:00:00:0a"})),
                &fx.ctx(),
            )
            .await
            .unwrap();

        let index = fx.handles.get_handle("interfaces", "tap0").await.unwrap();
        assert_eq!(index, 2);
        let sim = fx.vpp.interface_by_name("vpp-tap0").unwrap();
        assert_eq!(sim.sw_if_index, index);
        assert_eq!(
            sim.kind,
            SimInterfaceKind::Tap {
                mac: "02:00:00:00:00:0a".parse().unwrap()
            }
        );
    }

    #[tokio::test]
    async fn test_rejected_connect_leaves_no_mapping() {
        let fx = Fixture::new().await;
        fx.vpp.fail_next("tap_connect", -7);

        let err = TapCustomizer::new()
            .create(&path("interfaces/interface[tap0]/tap"), &tap(json!({"tap-name": "t"})), &fx.ctx())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CallFailed);
        assert_eq!(err.retval(), Some(-7));
        assert!(!fx.handles.contains_name("interfaces", "tap0").await);
    }

    #[tokio::test]
    async fn test_oversized_tag_is_validation_error() {
        let fx = Fixture::new().await;
        let long = "x".repeat(MAX_TAG_LEN + 1);
        let err = TapCustomizer::new()
            .create(
                &path("interfaces/interface[tap0]/tap"),
                &tap(json!({"tap-name": "t", "tag": long})),
                &fx.ctx(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(fx.vpp.calls().is_empty());
    }

    #[tokio::test]
    async fn test_modify_and_delete_by_resolved_index() {
        let fx = Fixture::new().await;
        let customizer = TapCustomizer::new();
        let p = path("interfaces/interface[tap0]/tap");
        let before = tap(json!({"tap-name": "t0"}));
        let after = tap(json!({"tap-name": "t1"}));

        customizer.create(&p, &before, &fx.ctx()).await.unwrap();
        customizer.update(&p, &before, &after, &fx.ctx()).await.unwrap();
        assert!(fx.vpp.interface_by_name("t1").is_some());

        customizer.delete(&p, &after, &fx.ctx()).await.unwrap();
        assert!(fx.vpp.interface_by_name("t1").is_none());
        assert!(!fx.handles.contains_name("interfaces", "tap0").await);
        assert_eq!(
            fx.vpp.call_names(),
            vec!["tap_connect", "tap_modify", "tap_delete"]
        );
    }
}
