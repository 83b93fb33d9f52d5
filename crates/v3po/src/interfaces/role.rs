use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;
use vpp_translate_common::{ConfigPath, Customizer, TranslateResult, WriteContext};

/// `interfaces/interface[name]/roles/role[role-name]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct InterfaceRole {
    pub role_name: String,
    pub role_type: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Roles are informational for other units; nothing is sent to VPP.
#[derive(Debug, Default)]
pub struct InterfaceRoleCustomizer;

impl InterfaceRoleCustomizer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Customizer for InterfaceRoleCustomizer {
    type Data = InterfaceRole;

    async fn create(&self, path: &ConfigPath, data: &InterfaceRole, _: &WriteContext) -> TranslateResult<()> {
        info!(path = %path, role = %data.role_name, role_type = %data.role_type, "role added");
        Ok(())
    }

    async fn update(
        &self,
        path: &ConfigPath,
        _before: &InterfaceRole,
        after: &InterfaceRole,
        _: &WriteContext,
    ) -> TranslateResult<()> {
        info!(path = %path, role = %after.role_name, role_type = %after.role_type, "role updated");
        Ok(())
    }

    async fn delete(&self, path: &ConfigPath, before: &InterfaceRole, _: &WriteContext) -> TranslateResult<()> {
        info!(path = %path, role = %before.role_name, "role removed");
        Ok(())
    }
}
