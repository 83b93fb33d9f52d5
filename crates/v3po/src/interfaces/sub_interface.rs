//! 802.1Q sub-interfaces.
//!
//! The sub-interface unit owns its `tags` and `match` containers: VPP takes
//! the whole tag layout in one `create_subif` and cannot change it later.

use super::{set_admin_state, sub_interface_name};
use crate::INTERFACE_CONTEXT;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, instrument};
use vpp_api::api::{CreateSubif, DeleteSubif};
use vpp_api::SwIfIndex;
use vpp_translate_common::{
    ConfigPath, Customizer, Operation, TranslateError, TranslateResult, WriteContext,
};
use vpp_types::{Dot1qTag, TagType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum VlanType {
    #[default]
    #[serde(rename = "802dot1q")]
    Dot1q,
    #[serde(rename = "802dot1ad")]
    Dot1ad,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Tag {
    pub index: u8,
    pub dot1q_tag: Dot1qTag,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Tags {
    #[serde(default)]
    pub tag: Vec<Tag>,
}

/// Which frames the sub-interface receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchType {
    /// Frames no other sub-interface matched.
    Default,
    Untagged,
    VlanTagged {
        #[serde(rename = "match-exact-tags", default)]
        match_exact_tags: bool,
    },
}

/// `interfaces/interface[parent]/sub-interfaces/sub-interface[id]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SubInterface {
    pub identifier: u32,
    #[serde(default)]
    pub vlan_type: VlanType,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub tags: Tags,
    #[serde(rename = "match")]
    pub match_type: MatchType,
}

impl SubInterface {
    /// Outer (index 0) and inner (index 1) tags.
    fn tag_layout(&self, path: &ConfigPath) -> TranslateResult<(Option<Dot1qTag>, Option<Dot1qTag>)> {
        let mut outer = None;
        let mut inner = None;
        for tag in &self.tags.tag {
            let (slot, expected, label) = match tag.index {
                0 => (&mut outer, TagType::SVlan, "service tag expected at index 0"),
                1 => (&mut inner, TagType::CVlan, "customer tag expected at index 1"),
                other => {
                    return Err(TranslateError::validation(
                        path,
                        format!("tag index {} out of range, at most two tags are supported", other),
                    ))
                }
            };
            if tag.dot1q_tag.tag_type != expected {
                return Err(TranslateError::validation(path, label));
            }
            if slot.replace(tag.dot1q_tag).is_some() {
                return Err(TranslateError::validation(
                    path,
                    format!("duplicate tag index {}", tag.index),
                ));
            }
        }
        if inner.is_some() && outer.is_none() {
            return Err(TranslateError::validation(path, "inner tag without outer tag"));
        }
        Ok((outer, inner))
    }

    fn request(&self, path: &ConfigPath, parent: u32) -> TranslateResult<CreateSubif> {
        let (outer, inner) = self.tag_layout(path)?;
        let count = usize::from(outer.is_some()) + usize::from(inner.is_some());

        Ok(CreateSubif {
            sw_if_index: SwIfIndex::new(parent),
            sub_id: self.identifier,
            no_tags: u8::from(count == 0),
            one_tag: u8::from(count == 1),
            two_tags: u8::from(count == 2),
            dot1ad: u8::from(self.vlan_type == VlanType::Dot1ad),
            exact_match: u8::from(matches!(
                self.match_type,
                MatchType::VlanTagged {
                    match_exact_tags: true
                }
            )),
            default_sub: u8::from(self.match_type == MatchType::Default),
            outer_vlan_id_any: u8::from(outer.is_some_and(|t| t.vlan_id.is_any())),
            inner_vlan_id_any: u8::from(inner.is_some_and(|t| t.vlan_id.is_any())),
            outer_vlan_id: outer.map_or(0, |t| t.vlan_id.wire_id()),
            inner_vlan_id: inner.map_or(0, |t| t.vlan_id.wire_id()),
        })
    }

    fn check_key(&self, path: &ConfigPath) -> TranslateResult<()> {
        match path.last_key().map(str::parse::<u32>) {
            Some(Ok(id)) if id == self.identifier => Ok(()),
            _ => Err(TranslateError::validation(
                path,
                format!("identifier {} does not match its key", self.identifier),
            )),
        }
    }
}

fn parent_name(path: &ConfigPath) -> TranslateResult<&str> {
    path.key_of("interface")
        .ok_or_else(|| TranslateError::validation(path, "path has no interface key"))
}

#[derive(Debug, Default)]
pub struct SubInterfaceCustomizer;

impl SubInterfaceCustomizer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Customizer for SubInterfaceCustomizer {
    type Data = SubInterface;

    #[instrument(skip_all, fields(path = %path))]
    async fn create(
        &self,
        path: &ConfigPath,
        data: &SubInterface,
        ctx: &WriteContext,
    ) -> TranslateResult<()> {
        data.check_key(path)?;
        let parent = parent_name(path)?;
        let parent_index = INTERFACE_CONTEXT.get_index(parent, ctx).await?;
        let request = data.request(path, parent_index)?;

        let reply = ctx.call(request).await?;
        let name = sub_interface_name(parent, data.identifier);
        let index = reply.sw_if_index.as_raw();
        INTERFACE_CONTEXT.add_name(index, &name, ctx).await?;
        set_admin_state(index, data.enabled, ctx).await?;
        info!(name = %name, sw_if_index = index, "sub-interface created");
        Ok(())
    }

    #[instrument(skip_all, fields(path = %path))]
    async fn update(
        &self,
        path: &ConfigPath,
        before: &SubInterface,
        after: &SubInterface,
        ctx: &WriteContext,
    ) -> TranslateResult<()> {
        let layout_changed = before.identifier != after.identifier
            || before.vlan_type != after.vlan_type
            || before.tags != after.tags
            || before.match_type != after.match_type;
        if layout_changed {
            return Err(TranslateError::unsupported(path, Operation::Update));
        }
        if before.enabled == after.enabled {
            return Ok(());
        }
        let name = sub_interface_name(parent_name(path)?, after.identifier);
        let index = INTERFACE_CONTEXT.get_index(&name, ctx).await?;
        set_admin_state(index, after.enabled, ctx).await
    }

    #[instrument(skip_all, fields(path = %path))]
    async fn delete(
        &self,
        path: &ConfigPath,
        before: &SubInterface,
        ctx: &WriteContext,
    ) -> TranslateResult<()> {
        let name = sub_interface_name(parent_name(path)?, before.identifier);
        let index = INTERFACE_CONTEXT.get_index(&name, ctx).await?;
        ctx.call(DeleteSubif {
            sw_if_index: SwIfIndex::new(index),
        })
        .await?;
        INTERFACE_CONTEXT.remove_name(&name, ctx).await?;
        info!(name = %name, sw_if_index = index, "sub-interface deleted");
        Ok(())
    }
}
