use super::interface_name;
use crate::INTERFACE_CONTEXT;
use async_trait::async_trait;
use serde::Deserialize;
use std::net::Ipv4Addr;
use tracing::{debug, instrument};
use vpp_api::api::SwInterfaceAddDelAddress;
use vpp_api::SwIfIndex;
use vpp_translate_common::{ConfigPath, Customizer, TranslateError, TranslateResult, WriteContext};
use vpp_types::Ipv4Prefix;

/// `.../ipv4/address[ip]`. The subnet is given by exactly one of
/// `prefix-length` or `netmask`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Ipv4Address {
    pub ip: Ipv4Addr,
    #[serde(default)]
    pub prefix_length: Option<u8>,
    #[serde(default)]
    pub netmask: Option<String>,
}

impl Ipv4Address {
    pub fn prefix(&self, path: &ConfigPath) -> TranslateResult<Ipv4Prefix> {
        let prefix = match (self.prefix_length, &self.netmask) {
            (Some(len), None) => Ipv4Prefix::new(self.ip, len),
            (None, Some(mask)) => Ipv4Prefix::with_netmask(self.ip, mask),
            (Some(_), Some(_)) => {
                return Err(TranslateError::validation(
                    path,
                    "prefix-length and netmask are mutually exclusive",
                ))
            }
            (None, None) => {
                return Err(TranslateError::validation(
                    path,
                    "either prefix-length or netmask is required",
                ))
            }
        };
        prefix.map_err(|e| TranslateError::validation(path, e.to_string()))
    }
}

/// Interface IPv4 addresses. Addresses are replaced by delete and create,
/// so update keeps the default `Unsupported`.
#[derive(Debug, Default)]
pub struct Ipv4AddressCustomizer;

impl Ipv4AddressCustomizer {
    pub fn new() -> Self {
        Self
    }

    async fn add_del(
        &self,
        path: &ConfigPath,
        data: &Ipv4Address,
        is_add: bool,
        ctx: &WriteContext,
    ) -> TranslateResult<()> {
        let prefix = data.prefix(path)?;
        let name = interface_name(path)?;
        let index = INTERFACE_CONTEXT.get_index(&name, ctx).await?;

        ctx.call(SwInterfaceAddDelAddress::ipv4(
            SwIfIndex::new(index),
            is_add,
            prefix.octets(),
            prefix.prefix_length(),
        ))
        .await?;
        debug!(interface = %name, %prefix, is_add, "ipv4 address set");
        Ok(())
    }
}

#[async_trait]
impl Customizer for Ipv4AddressCustomizer {
    type Data = Ipv4Address;

    #[instrument(skip_all, fields(path = %path))]
    async fn create(
        &self,
        path: &ConfigPath,
        data: &Ipv4Address,
        ctx: &WriteContext,
    ) -> TranslateResult<()> {
        self.add_del(path, data, true, ctx).await
    }

    #[instrument(skip_all, fields(path = %path))]
    async fn delete(
        &self,
        path: &ConfigPath,
        before: &Ipv4Address,
        ctx: &WriteContext,
    ) -> TranslateResult<()> {
        self.add_del(path, before, false, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{path, Fixture};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use vpp_translate_common::ErrorKind;

    const PATH: &str = "interfaces/interface[eth0]/ipv4/address[192.168.2.1]";

    fn address(value: serde_json::Value) -> Ipv4Address {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_subnet_forms() {
        let p = path(PATH);
        let by_len = address(json!({"ip": "192.168.2.1", "prefix-length": 24}));
        let by_mask = address(json!({"ip": "192.168.2.1", "netmask": "255.255.255.0"}));
        assert_eq!(by_len.prefix(&p).unwrap(), by_mask.prefix(&p).unwrap());

        let both = address(json!({"ip": "192.168.2.1", "prefix-length": 24, "netmask": "255.255.255.0"}));
        assert!(both.prefix(&p).is_err());
        assert!(address(json!({"ip": "192.168.2.1"})).prefix(&p).is_err());

        let holes = address(json!({"ip": "192.168.2.1", "netmask": "255.0.255.0"}));
        assert_eq!(holes.prefix(&p).unwrap_err().kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_add_then_remove() {
        let fx = Fixture::new().await;
        let index = fx.hardware("eth0").await;
        let data = address(json!({"ip": "192.168.2.1", "netmask": "255.255.255.0"}));
        let customizer = Ipv4AddressCustomizer::new();

        customizer.create(&path(PATH), &data, &fx.ctx()).await.unwrap();
        assert_eq!(
            fx.vpp.interface(SwIfIndex::new(index)).unwrap().ipv4,
            vec![(Ipv4Addr::new(192, 168, 2, 1), 24)]
        );

        customizer.delete(&path(PATH), &data, &fx.ctx()).await.unwrap();
        assert!(fx.vpp.interface(SwIfIndex::new(index)).unwrap().ipv4.is_empty());
    }

    #[tokio::test]
    async fn test_update_is_unsupported() {
        let fx = Fixture::new().await;
        let data = address(json!({"ip": "192.168.2.1", "prefix-length": 24}));
        let err = Ipv4AddressCustomizer::new()
            .update(&path(PATH), &data, &data, &fx.ctx())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }
}
