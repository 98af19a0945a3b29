//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared primitives for the lifecycle agent workspace."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Configuration loading, host identity discovery, and logging setup
//! consumed across the lifeline workspace.

pub mod config;
pub mod host;
pub mod logging;

pub use config::{
    ConfigError, ContainerDaemonConfig, HeartbeatConfig, LoadedConfig, LoggingConfig,
    ManagedComponentSpec, RegistryClientConfig, TransportSettings, REGISTRY_INBOX,
};
pub use logging::{init_tracing, LogFormat};
