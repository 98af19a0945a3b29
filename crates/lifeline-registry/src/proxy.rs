//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Registry proxy over the JSON transport."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use lifeline_common::ContainerDaemonConfig;
use lifeline_transport::JsonClient;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, info_span, warn, Instrument, Span};

use crate::payload::{
    ReadinessResponse, RegistrationRecord, RegistrationRequest, RegistrationResponse,
    StatusUpdate, REGISTERED, REGISTERING, REGISTRY_READY,
};
use crate::{Registry, RegistryError};

const STATUS_PATH: &str = "/status";

/// Identity the agent registers under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationProfile {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub agent_port: u16,
    pub cluster: String,
    pub zone: String,
    pub component_type: String,
}

impl RegistrationProfile {
    pub fn from_config(config: &ContainerDaemonConfig) -> Self {
        Self {
            name: config.name.clone(),
            host: config.transport_settings.ip.clone(),
            port: config.transport_settings.port,
            agent_port: config.agent_port(),
            cluster: config.cluster.clone(),
            zone: config.zone.clone(),
            component_type: config.component_type().to_owned(),
        }
    }

    fn registration_path(&self) -> String {
        format!(
            "/clusters/{}/zones/{}/{}",
            self.cluster, self.zone, self.component_type
        )
    }

    fn status_path(&self, record: &RegistrationRecord) -> String {
        format!(
            "/clusters/{}/zones/{}/{}/{}/status",
            record.cluster_id, record.zone_id, self.component_type, record.tmgc_id
        )
    }
}

/// Client-side view of the registry service.
///
/// Readiness is a one-way latch: once the registry has reported ready it is
/// never checked again. Registration identifiers are cached on the first
/// successful registration and never refreshed.
#[derive(Debug)]
pub struct RegistryProxy {
    client: JsonClient,
    profile: RegistrationProfile,
    ready: AtomicBool,
    record: RwLock<Option<RegistrationRecord>>,
    register_lock: Mutex<()>,
    span: Span,
}

impl RegistryProxy {
    pub fn new(client: JsonClient, profile: RegistrationProfile) -> Self {
        let span = info_span!("registry", container = %profile.name);
        Self {
            client,
            profile,
            ready: AtomicBool::new(false),
            record: RwLock::new(None),
            register_lock: Mutex::new(()),
            span,
        }
    }

    /// Build a proxy for the `registry` inbox of `config`.
    pub fn from_config(config: &ContainerDaemonConfig) -> Result<Self, RegistryError> {
        let endpoint = config
            .registry_endpoint()
            .ok_or_else(|| RegistryError::Endpoint("no registry inbox configured".into()))?;
        let inbox = if endpoint.contains("://") {
            endpoint.to_owned()
        } else {
            format!("{}://{}", config.registry.scheme, endpoint)
        };
        let client = JsonClient::new(&inbox, &config.registry.base_path, config.registry.timeout)?;
        Ok(Self::new(client, RegistrationProfile::from_config(config)))
    }

    pub fn profile(&self) -> &RegistrationProfile {
        &self.profile
    }

    pub fn base_url(&self) -> &str {
        self.client.base()
    }

    async fn check_readiness(&self) -> Result<bool, RegistryError> {
        let body = self.client.get(STATUS_PATH).await?;
        let response: ReadinessResponse = serde_json::from_slice(&body)?;
        debug!(status = %response.status, "registry readiness checked");
        Ok(response.status == REGISTRY_READY)
    }

    async fn try_register(&self) -> Result<RegistrationRecord, RegistryError> {
        if !self.is_ready().await {
            return Err(RegistryError::NotReady);
        }

        let _guard = self.register_lock.lock().await;
        if let Some(record) = self.registration() {
            debug!(tmgc_id = %record.tmgc_id, "already registered; reusing identifiers");
            return Ok(record);
        }

        let request = RegistrationRequest {
            name: self.profile.name.clone(),
            host: self.profile.host.clone(),
            port: self.profile.port,
            agent_port: self.profile.agent_port,
            status: REGISTERING.to_owned(),
        };
        let path = self.profile.registration_path();
        info!(%path, "registering with registry");
        let body = self.client.post(&path, &request).await?;
        debug!(response = %String::from_utf8_lossy(&body), "registration response");

        let response: RegistrationResponse = serde_json::from_slice(&body)?;
        if response.status != REGISTERED {
            return Err(RegistryError::Rejected {
                status: response.status,
            });
        }
        let record = RegistrationRecord {
            tmgc_id: response
                .tmgc_id
                .ok_or(RegistryError::IncompleteRecord("tmgcId"))?,
            zone_id: response
                .zone_id
                .ok_or(RegistryError::IncompleteRecord("zoneId"))?,
            cluster_id: response
                .cluster_id
                .ok_or(RegistryError::IncompleteRecord("clusterId"))?,
        };
        *self.record.write() = Some(record.clone());
        Ok(record)
    }

    async fn try_update_status(&self, state: &str) -> Result<(), RegistryError> {
        if !self.is_ready().await {
            return Err(RegistryError::NotReady);
        }
        let record = self.registration().ok_or(RegistryError::NotRegistered)?;
        let path = self.profile.status_path(&record);
        debug!(%path, state, "pushing lifecycle status");
        let update = StatusUpdate {
            status: state.to_owned(),
        };
        let body = self.client.put(&path, &update).await?;
        debug!(response = %String::from_utf8_lossy(&body), "status update response");
        Ok(())
    }
}

#[async_trait]
impl Registry for RegistryProxy {
    async fn is_ready(&self) -> bool {
        if self.ready.load(Ordering::Acquire) {
            return true;
        }
        match self.check_readiness().instrument(self.span.clone()).await {
            Ok(true) => {
                self.ready.store(true, Ordering::Release);
                self.span.in_scope(|| info!("registry is ready"));
                true
            }
            Ok(false) => {
                self.span.in_scope(|| info!("registry is not ready"));
                false
            }
            Err(err) => {
                self.span
                    .in_scope(|| warn!(error = %err, "registry readiness check failed"));
                false
            }
        }
    }

    async fn register(&self) -> bool {
        match self.try_register().instrument(self.span.clone()).await {
            Ok(record) => {
                self.span.in_scope(|| {
                    info!(
                        tmgc_id = %record.tmgc_id,
                        zone_id = %record.zone_id,
                        cluster_id = %record.cluster_id,
                        "registration succeeded"
                    )
                });
                true
            }
            Err(err) => {
                self.span
                    .in_scope(|| warn!(error = %err, "registration failed"));
                false
            }
        }
    }

    async fn update_status(&self, state: &str) -> bool {
        match self.try_update_status(state).instrument(self.span.clone()).await {
            Ok(()) => {
                self.span
                    .in_scope(|| info!(state, "registry status updated"));
                true
            }
            Err(err) => {
                self.span
                    .in_scope(|| warn!(state, error = %err, "registry status update failed"));
                false
            }
        }
    }

    fn registration(&self) -> Option<RegistrationRecord> {
        self.record.read().clone()
    }
}
