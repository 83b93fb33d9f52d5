//! Bridge domains.

use crate::{default_true, BRIDGE_DOMAIN_CONTEXT};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};
use vpp_api::api::BridgeDomainAddDel;
use vpp_api::BridgeDomainId;
use vpp_translate_common::{ConfigPath, Customizer, TranslateError, TranslateResult, WriteContext};

/// `bridge-domains/bridge-domain[name]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BridgeDomain {
    pub name: String,
    #[serde(default = "default_true")]
    pub flood: bool,
    #[serde(default = "default_true")]
    pub forward: bool,
    #[serde(default = "default_true")]
    pub learn: bool,
    #[serde(default = "default_true")]
    pub unknown_unicast_flood: bool,
    #[serde(default)]
    pub arp_termination: bool,
    /// MAC aging time in minutes; 0 disables aging.
    #[serde(default)]
    pub mac_age: u8,
}

impl BridgeDomain {
    fn request(&self, bd_id: u32) -> BridgeDomainAddDel {
        BridgeDomainAddDel {
            bd_id: BridgeDomainId::new(bd_id),
            flood: u8::from(self.flood),
            uu_flood: u8::from(self.unknown_unicast_flood),
            forward: u8::from(self.forward),
            learn: u8::from(self.learn),
            arp_term: u8::from(self.arp_termination),
            mac_age: self.mac_age,
            is_add: 1,
        }
    }

    fn check_key(&self, path: &ConfigPath) -> TranslateResult<()> {
        match path.last_key() {
            Some(key) if key == self.name => Ok(()),
            _ => Err(TranslateError::validation(
                path,
                format!("bridge domain name {} does not match its key", self.name),
            )),
        }
    }
}

/// Creates bridge domains, assigning ids from [`BRIDGE_DOMAIN_CONTEXT`].
///
/// VPP does not hand out bridge-domain ids, so a new domain gets the lowest
/// id not yet mapped. A domain that is already mapped keeps its id.
#[derive(Debug, Default)]
pub struct BridgeDomainCustomizer;

impl BridgeDomainCustomizer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Customizer for BridgeDomainCustomizer {
    type Data = BridgeDomain;

    #[instrument(skip_all, fields(path = %path))]
    async fn create(
        &self,
        path: &ConfigPath,
        data: &BridgeDomain,
        ctx: &WriteContext,
    ) -> TranslateResult<()> {
        data.check_key(path)?;
        let bd_id = if BRIDGE_DOMAIN_CONTEXT.contains_name(&data.name, ctx).await {
            BRIDGE_DOMAIN_CONTEXT.get_index(&data.name, ctx).await?
        } else {
            BRIDGE_DOMAIN_CONTEXT.allocate(ctx).await?
        };

        ctx.call(data.request(bd_id)).await?;
        BRIDGE_DOMAIN_CONTEXT.add_name(bd_id, &data.name, ctx).await?;
        debug!(name = %data.name, bd_id, "bridge domain created");
        Ok(())
    }

    #[instrument(skip_all, fields(path = %path))]
    async fn update(
        &self,
        path: &ConfigPath,
        before: &BridgeDomain,
        after: &BridgeDomain,
        ctx: &WriteContext,
    ) -> TranslateResult<()> {
        if before.name != after.name {
            return Err(TranslateError::validation(
                path,
                "bridge domain name changed; delete and create it instead",
            ));
        }
        let bd_id = BRIDGE_DOMAIN_CONTEXT.get_index(&after.name, ctx).await?;
        ctx.call(after.request(bd_id)).await?;
        debug!(name = %after.name, bd_id, "bridge domain updated");
        Ok(())
    }

    #[instrument(skip_all, fields(path = %path))]
    async fn delete(
        &self,
        path: &ConfigPath,
        before: &BridgeDomain,
        ctx: &WriteContext,
    ) -> TranslateResult<()> {
        let bd_id = BRIDGE_DOMAIN_CONTEXT.get_index(&before.name, ctx).await?;
        ctx.call(BridgeDomainAddDel::delete(BridgeDomainId::new(bd_id))).await?;
        BRIDGE_DOMAIN_CONTEXT.remove_name(&before.name, ctx).await?;
        debug!(name = %before.name, bd_id, "bridge domain deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{path, Fixture};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use vpp_translate_common::ErrorKind;

    fn bd(value: serde_json::Value) -> BridgeDomain {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_defaults() {
        let data = bd(json!({"name": "bd1"}));
        assert!(data.flood && data.forward && data.learn && data.unknown_unicast_flood);
        assert!(!data.arp_termination);
        assert_eq!(data.request(3).bd_id.as_raw(), 3);
        assert_eq!(data.request(3).is_add, 1);
    }

    #[tokio::test]
    async fn test_create_allocates_from_one() {
        let fx = Fixture::new().await;
        let customizer = BridgeDomainCustomizer::new();

        let ctx = fx.ctx();
        customizer
            .create(&path("bridge-domains/bridge-domain[bd1]"), &bd(json!({"name": "bd1"})), &ctx)
            .await
            .unwrap();
        ctx.commit().await;
        let ctx = fx.ctx();
        customizer
            .create(&path("bridge-domains/bridge-domain[bd2]"), &bd(json!({"name": "bd2"})), &ctx)
            .await
            .unwrap();
        ctx.commit().await;

        assert_eq!(fx.handles.get_handle("bridge-domains", "bd1").await.unwrap(), 1);
        assert_eq!(fx.handles.get_handle("bridge-domains", "bd2").await.unwrap(), 2);
        assert!(fx.vpp.bridge_domain(BridgeDomainId::new(2)).is_some());
    }

    #[tokio::test]
    async fn test_key_mismatch_rejected_without_calls() {
        let fx = Fixture::new().await;
        let err = BridgeDomainCustomizer::new()
            .create(&path("bridge-domains/bridge-domain[bd1]"), &bd(json!({"name": "other"})), &fx.ctx())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(fx.vpp.calls().is_empty());
    }

    #[tokio::test]
    async fn test_rename_is_validation_error() {
        let fx = Fixture::new().await;
        let err = BridgeDomainCustomizer::new()
            .update(
                &path("bridge-domains/bridge-domain[bd1]"),
                &bd(json!({"name": "bd1"})),
                &bd(json!({"name": "bd9"})),
                &fx.ctx(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let fx = Fixture::new().await;
        let customizer = BridgeDomainCustomizer::new();
        let p = path("bridge-domains/bridge-domain[bd1]");

        customizer.create(&p, &bd(json!({"name": "bd1"})), &fx.ctx()).await.unwrap();
        customizer
            .update(&p, &bd(json!({"name": "bd1"})), &bd(json!({"name": "bd1", "learn": false})), &fx.ctx())
            .await
            .unwrap();
        let sim = fx.vpp.bridge_domain(BridgeDomainId::new(1)).unwrap();
        assert!(!sim.learn);

        customizer.delete(&p, &bd(json!({"name": "bd1", "learn": false})), &fx.ctx()).await.unwrap();
        assert_eq!(fx.vpp.bridge_domain_count(), 0);
        assert!(!fx.handles.contains_name("bridge-domains", "bd1").await);
    }
}
