//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Registry proxy and its capability trait."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Client side of the registry protocol.
//!
//! | Call | Path |
//! |---|---|
//! | readiness | `GET {base}/status` |
//! | register | `POST {base}/clusters/{cluster}/zones/{zone}/{type}` |
//! | status | `PUT {base}/clusters/{clusterId}/zones/{zoneId}/{type}/{tmgcId}/status` |

mod payload;
mod proxy;

use async_trait::async_trait;
use lifeline_transport::TransportError;
use thiserror::Error;

pub use payload::{
    ReadinessResponse, RegistrationRecord, RegistrationRequest, RegistrationResponse,
    StatusUpdate, REGISTERED, REGISTERING, REGISTRY_READY,
};
pub use proxy::{RegistrationProfile, RegistryProxy};

/// Reasons a registry operation did not succeed.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid registry endpoint: {0}")]
    Endpoint(String),
    #[error("registry is not ready")]
    NotReady,
    #[error("agent is not registered with the registry")]
    NotRegistered,
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("failed to decode registry response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("registry answered with status '{status}'")]
    Rejected { status: String },
    #[error("registration response is missing {0}")]
    IncompleteRecord(&'static str),
}

/// Registry operations the lifecycle layer depends on.
///
/// Every operation reports plain success; failures are logged by the
/// implementation and retried by the caller on its next heartbeat.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Whether the registry has been observed ready.
    async fn is_ready(&self) -> bool;

    /// Register the agent once; later calls reuse the cached identifiers.
    async fn register(&self) -> bool;

    /// Push a lifecycle state string. Requires a prior successful registration.
    async fn update_status(&self, state: &str) -> bool;

    /// Identifiers captured by the last successful registration.
    fn registration(&self) -> Option<RegistrationRecord>;
}
