//! Agent configuration.
//!
//! Loaded from TOML. Every field has a default, so an empty or missing file
//! yields a usable configuration:
//!
//! ```toml
//! [control_plane]
//! call_timeout_ms = 5000
//!
//! [mapping_store]
//! kind = "file"
//! path = "/var/lib/v3po/naming-context.json"
//!
//! [namespaces.bridge-domains]
//! floor = 1
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid configuration for {field}: {message}")]
    Invalid { field: String, message: String },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Control-plane connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlPlaneConfig {
    /// Deadline for a single VPP reply
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

/// Which durable store backs the naming context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Memory,
    File,
    Redis,
}

/// Naming context store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingStoreConfig {
    #[serde(default = "default_store_kind")]
    pub kind: StoreKind,

    /// State file for `kind = "file"`
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    #[serde(default = "default_redis_host")]
    pub redis_host: String,

    #[serde(default = "default_redis_port")]
    pub redis_port: u16,

    #[serde(default)]
    pub redis_db: u32,
}

/// Per-namespace settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamespaceConfig {
    /// Lowest handle `allocate_handle` hands out
    #[serde(default)]
    pub floor: u32,
}

/// Complete agent configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub control_plane: ControlPlaneConfig,

    #[serde(default)]
    pub mapping_store: MappingStoreConfig,

    /// Allocation floors overriding the ones declared by translation units
    #[serde(default)]
    pub namespaces: BTreeMap<String, NamespaceConfig>,
}

fn default_call_timeout_ms() -> u64 {
    5000
}

fn default_store_kind() -> StoreKind {
    StoreKind::Memory
}

fn default_store_path() -> PathBuf {
    PathBuf::from("/var/lib/v3po/naming-context.json")
}

fn default_redis_host() -> String {
    "127.0.0.1".to_string()
}

fn default_redis_port() -> u16 {
    6379
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: default_call_timeout_ms(),
        }
    }
}

impl Default for MappingStoreConfig {
    fn default() -> Self {
        Self {
            kind: default_store_kind(),
            path: default_store_path(),
            redis_host: default_redis_host(),
            redis_port: default_redis_port(),
            redis_db: 0,
        }
    }
}

impl AgentConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(ConfigError::Io {
                path: path.display().to_string(),
                source: e,
            }),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.control_plane.call_timeout_ms)
    }

    /// Configured allocation floors by namespace.
    pub fn floors(&self) -> HashMap<String, u32> {
        self.namespaces
            .iter()
            .map(|(name, ns)| (name.clone(), ns.floor))
            .collect()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.control_plane.call_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "control_plane.call_timeout_ms",
                "must be > 0",
            ));
        }

        match self.mapping_store.kind {
            StoreKind::File if self.mapping_store.path.as_os_str().is_empty() => {
                return Err(ConfigError::invalid(
                    "mapping_store.path",
                    "required when kind = \"file\"",
                ));
            }
            StoreKind::Redis if self.mapping_store.redis_port == 0 => {
                return Err(ConfigError::invalid("mapping_store.redis_port", "must be > 0"));
            }
            _ => {}
        }

        if let Some(name) = self.namespaces.keys().find(|name| name.is_empty()) {
            return Err(ConfigError::invalid(
                format!("namespaces.{}", name),
                "namespace name must not be empty",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = AgentConfig::default();
        assert_eq!(config.control_plane.call_timeout_ms, 5000);
        assert_eq!(config.call_timeout(), Duration::from_secs(5));
        assert_eq!(config.mapping_store.kind, StoreKind::Memory);
        assert_eq!(config.mapping_store.redis_port, 6379);
        assert!(config.namespaces.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let config = AgentConfig::from_toml(
            r#"
            [control_plane]
            call_timeout_ms = 250

            [mapping_store]
            kind = "file"
            path = "/tmp/naming.json"

            [namespaces.bridge-domains]
            floor = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.call_timeout(), Duration::from_millis(250));
        assert_eq!(config.mapping_store.kind, StoreKind::File);
        assert_eq!(config.mapping_store.path, PathBuf::from("/tmp/naming.json"));
        assert_eq!(config.floors().get("bridge-domains"), Some(&10));
    }

    #[test]
    fn test_partial_sections_use_defaults() {
        let config = AgentConfig::from_toml("[mapping_store]\nkind = \"redis\"\n").unwrap();
        assert_eq!(config.mapping_store.kind, StoreKind::Redis);
        assert_eq!(config.mapping_store.redis_host, "127.0.0.1");
        assert_eq!(config.control_plane.call_timeout_ms, 5000);
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = AgentConfig::default();
        config.control_plane.call_timeout_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AgentConfig::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.control_plane.call_timeout_ms, 5000);
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            AgentConfig::from_toml("control_plane = 3"),
            Err(ConfigError::Parse(_))
        ));
    }
}
