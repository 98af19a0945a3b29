//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Registry wire payloads."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};

/// Status value reported by `GET /status` once the registry accepts work.
pub const REGISTRY_READY: &str = "REGISTRY_READY";
/// Status sent with a registration request.
pub const REGISTERING: &str = "registering";
/// Status returned by a successful registration.
pub const REGISTERED: &str = "registered";

/// Body of `GET /status`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadinessResponse {
    pub status: String,
}

/// Body of the registration POST.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub agent_port: u16,
    pub status: String,
}

/// Body returned by the registration POST. Unknown fields such as
/// `registrationTime` are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub status: String,
    #[serde(default)]
    pub tmgc_id: Option<String>,
    #[serde(default)]
    pub zone_id: Option<String>,
    #[serde(default)]
    pub cluster_id: Option<String>,
}

/// Body of the lifecycle status PUT.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: String,
}

/// Identifiers assigned by the registry on registration. Cached for the
/// lifetime of the process and used to address status updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRecord {
    pub tmgc_id: String,
    pub zone_id: String,
    pub cluster_id: String,
}
