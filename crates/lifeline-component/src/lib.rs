//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Managed component capability and built-in variants."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Managed components are the units whose operational readiness the agent
//! tracks. Each variant implements the five lifecycle hooks; the lifecycle
//! machine decides which hook runs on a given tick.

mod gateway;
mod registry;
mod script;

use async_trait::async_trait;
use thiserror::Error;

pub use gateway::GatewayComponent;
pub use registry::{ComponentFactory, ComponentRegistry};
pub use script::{ScriptComponent, ScriptLauncher};

/// Errors raised while building or driving a managed component.
#[derive(Debug, Error)]
pub enum ComponentError {
    #[error("component '{component}' has unknown type '{kind}'")]
    UnknownType { component: String, kind: String },
    #[error("component '{component}' is missing required field '{field}'")]
    MissingField {
        component: String,
        field: &'static str,
    },
    #[error("script executable '{0}' not found")]
    ScriptNotFound(String),
    #[error("failed to spawn '{script}': {source}")]
    Spawn {
        script: String,
        #[source]
        source: std::io::Error,
    },
}

/// Lifecycle hooks of one managed component.
///
/// Hooks report plain success. A `false` leaves the component in its current
/// state and the hook is invoked again on the next heartbeat.
#[async_trait]
pub trait ManagedComponent: Send + Sync {
    /// Component name from the configuration.
    fn name(&self) -> &str;

    /// Type tag the component was built from.
    fn kind(&self) -> &str;

    /// Runs in `UNKNOWN`.
    async fn bootup(&self) -> bool;

    /// Runs in `UNSATISFIED`; resolves dependencies and configuration.
    async fn build_configuration(&self) -> bool;

    /// Runs in `RESOLVED`.
    async fn launch_component(&self) -> bool;

    /// Runs in `STANDBY`.
    async fn prepare_for_active(&self) -> bool;

    /// Runs on every tick once `ACTIVE`.
    async fn watch_component(&self) -> bool;
}
