//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared configuration model for the lifecycle agent."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use thiserror::Error;
use tracing::debug;

use crate::host;
use crate::logging::LogFormat;

/// Name of the inbox entry that must point at the registry service.
pub const REGISTRY_INBOX: &str = "registry";

/// Characters a container name may not contain; the name is served as a URL path segment.
const NAME_FORBIDDEN: &[char] = &['/', '*', ':', '{', '}', '?', '#', '%'];

fn default_scheme() -> String {
    "http".to_owned()
}

fn default_registry_base_path() -> String {
    "registry/rest/v1".to_owned()
}

fn default_registry_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_heartbeat_interval() -> Duration {
    Duration::from_millis(2000)
}

fn default_shutdown_grace() -> Duration {
    Duration::from_secs(5)
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

/// Errors raised while loading or validating the daemon configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no configuration files found. inspected: {inspected}")]
    NotFound { inspected: String },
    #[error("failed to read configuration from {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration at {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Identity, inboxes, transport, and managed components of one container daemon.
///
/// Loaded once at startup and treated as immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ContainerDaemonConfig {
    pub name: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub cluster: String,
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub node: String,
    #[serde(default, rename = "type")]
    pub container_type: String,
    #[serde(default)]
    pub qualifier: String,
    #[serde(default)]
    pub inboxes: IndexMap<String, String>,
    #[serde(default)]
    pub transport_settings: TransportSettings,
    #[serde(default)]
    pub components: Vec<ManagedComponentSpec>,
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
    #[serde(default)]
    pub registry: RegistryClientConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where a [`ContainerDaemonConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: ContainerDaemonConfig,
    pub source: PathBuf,
}

impl ContainerDaemonConfig {
    pub const ENV_CONFIG_PATH: &'static str = "LIFELINE_CONFIG";

    /// Load configuration from disk, respecting the `LIFELINE_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedConfig, ConfigError> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            let path = candidate.as_ref();
            if path.exists() {
                let config = Self::from_path(path)?;
                return Ok(LoadedConfig {
                    config,
                    source: path.to_path_buf(),
                });
            }
        }

        Err(ConfigError::NotFound {
            inspected: candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    /// Parse and validate a single configuration file. The format follows the
    /// file extension; anything unrecognised is read as JSON.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let parse_err = |message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        };
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let config: ContainerDaemonConfig = match extension.as_deref() {
            Some("toml") => toml::from_str(&contents).map_err(|e| parse_err(e.to_string()))?,
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&contents).map_err(|e| parse_err(e.to_string()))?
            }
            _ => serde_json::from_str(&contents).map_err(|e| parse_err(e.to_string()))?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("container name must not be empty".into()));
        }
        if let Some(bad) = self
            .name
            .chars()
            .find(|c| NAME_FORBIDDEN.contains(c) || c.is_whitespace())
        {
            return Err(ConfigError::Invalid(format!(
                "container name '{}' must be a single path segment (found '{bad}')",
                self.name
            )));
        }
        match self.inboxes.get(REGISTRY_INBOX) {
            Some(endpoint) if !endpoint.trim().is_empty() => {}
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "inboxes must define a '{REGISTRY_INBOX}' endpoint"
                )))
            }
        }
        if self.transport_settings.port == 0 {
            return Err(ConfigError::Invalid(
                "transportSettings.port must be greater than zero".into(),
            ));
        }
        if self.heartbeat.interval.is_zero() {
            return Err(ConfigError::Invalid(
                "heartbeat interval must be greater than zero".into(),
            ));
        }
        if self.components.is_empty() {
            return Err(ConfigError::Invalid(
                "configuration must declare at least one managed component".into(),
            ));
        }
        let mut seen = HashSet::new();
        for component in &self.components {
            if component.name.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "managed component name must not be empty".into(),
                ));
            }
            if !seen.insert(component.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "managed component '{}' is declared more than once",
                    component.name
                )));
            }
        }
        Ok(())
    }

    /// Host (and optional port) of the registry service.
    pub fn registry_endpoint(&self) -> Option<&str> {
        self.inboxes.get(REGISTRY_INBOX).map(String::as_str)
    }

    /// Type segment used in registry paths, falling back to the container name.
    pub fn component_type(&self) -> &str {
        if self.container_type.trim().is_empty() {
            &self.name
        } else {
            &self.container_type
        }
    }

    /// Port the agent status listener binds to.
    pub fn agent_port(&self) -> u16 {
        self.transport_settings
            .agent_port
            .unwrap_or(self.transport_settings.port)
    }

    /// Fill in the node name and host address when the file leaves them blank.
    pub fn resolve_host_identity(&mut self) {
        if self.node.trim().is_empty() {
            if let Some(hostname) = host::detect_hostname() {
                self.node = hostname;
            }
        }
        if self.transport_settings.ip.trim().is_empty() {
            self.transport_settings.ip = host::detect_host_ip().to_string();
        }
    }
}

impl std::str::FromStr for ContainerDaemonConfig {
    type Err = ConfigError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let config: ContainerDaemonConfig =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse {
                path: PathBuf::from("<inline>"),
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }
}

/// Transport settings of the container and its agent listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportSettings {
    #[serde(default = "default_scheme")]
    pub scheme: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub agent_port: Option<u16>,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            ip: String::new(),
            port: 0,
            agent_port: None,
        }
    }
}

/// One managed component declared in the configuration.
///
/// `type` selects the runtime variant; the remaining optional fields are
/// interpreted by that variant only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ManagedComponentSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub qualifier: Option<String>,
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub factory: Option<String>,
}

impl ManagedComponentSpec {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            qualifier: None,
            script: None,
            service: None,
            factory: None,
        }
    }

    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.script = Some(script.into());
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    #[serde(default = "default_heartbeat_interval", rename = "intervalMs")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub interval: Duration,
    #[serde(default = "default_shutdown_grace", rename = "shutdownGraceMs")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub shutdown_grace: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: default_heartbeat_interval(),
            shutdown_grace: default_shutdown_grace(),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryClientConfig {
    #[serde(default = "default_scheme")]
    pub scheme: String,
    #[serde(default = "default_registry_base_path")]
    pub base_path: String,
    #[serde(default = "default_registry_timeout", rename = "timeoutMs")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub timeout: Duration,
}

impl Default for RegistryClientConfig {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            base_path: default_registry_base_path(),
            timeout: default_registry_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            directory: None,
            file_prefix: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const MINIMAL: &str = r#"{
        "name": "gateway-1",
        "cluster": "Mashery",
        "zone": "Local",
        "type": "microgateway",
        "inboxes": { "registry": "registry:8080" },
        "transportSettings": { "port": 9090 },
        "components": [ { "name": "mgw", "type": "microgateway" } ]
    }"#;

    #[test]
    fn minimal_config_applies_defaults() {
        let config = ContainerDaemonConfig::from_str(MINIMAL).expect("valid config");
        assert_eq!(config.registry_endpoint(), Some("registry:8080"));
        assert_eq!(config.component_type(), "microgateway");
        assert_eq!(config.agent_port(), 9090);
        assert_eq!(config.heartbeat.interval, Duration::from_millis(2000));
        assert_eq!(config.registry.base_path, "registry/rest/v1");
        assert_eq!(config.transport_settings.scheme, "http");
    }

    #[test]
    fn missing_registry_inbox_is_rejected() {
        let raw = MINIMAL.replace("\"registry\": \"registry:8080\"", "\"logs\": \"x\"");
        let err = ContainerDaemonConfig::from_str(&raw).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("registry")));
    }

    #[test]
    fn duplicate_component_names_are_rejected() {
        let raw = MINIMAL.replace(
            r#"[ { "name": "mgw", "type": "microgateway" } ]"#,
            r#"[ { "name": "mgw", "type": "microgateway" }, { "name": "mgw", "type": "script" } ]"#,
        );
        let err = ContainerDaemonConfig::from_str(&raw).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("more than once")));
    }

    #[test]
    fn container_name_must_be_a_plain_path_segment() {
        for name in ["edge*01", "edge/01", ":edge", "{edge}", "edge 01"] {
            let raw = MINIMAL.replace("gateway-1", name);
            let err = ContainerDaemonConfig::from_str(&raw).unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid(ref msg) if msg.contains("path segment")),
                "{name}: {err}"
            );
        }
        let raw = MINIMAL.replace("gateway-1", "edge-01.payments_v2");
        assert!(ContainerDaemonConfig::from_str(&raw).is_ok());
    }

    #[test]
    fn component_type_falls_back_to_name() {
        let raw = MINIMAL.replace("\"type\": \"microgateway\",\n", "");
        let config = ContainerDaemonConfig::from_str(&raw).expect("valid config");
        assert_eq!(config.component_type(), "gateway-1");
    }

    #[test]
    fn explicit_identity_is_not_overwritten() {
        let mut config = ContainerDaemonConfig::from_str(MINIMAL).expect("valid config");
        config.node = "node-a".into();
        config.transport_settings.ip = "10.1.2.3".into();
        config.resolve_host_identity();
        assert_eq!(config.node, "node-a");
        assert_eq!(config.transport_settings.ip, "10.1.2.3");
    }
}
