//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Container agent runtime."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! The agent owns two tasks: the heartbeat control loop ticking the
//! lifecycle aggregator, and the HTTP listener answering status queries from
//! the aggregator's live state.

mod agent;
mod http;
mod signal;

use std::net::SocketAddr;

use lifeline_common::ConfigError;
use lifeline_lifecycle::LifecycleError;
use lifeline_registry::RegistryError;
use thiserror::Error;

pub use agent::{AgentHandle, ContainerAgent, ShutdownReport};
pub use http::{router, ComponentStatus, ContainerStatus};
pub use signal::shutdown_signal;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Component(#[from] LifecycleError),
    #[error("registry client setup failed: {0}")]
    Registry(#[from] RegistryError),
    #[error("failed to bind status listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("agent task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
