//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Container agent startup, control loop, and ordered shutdown."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use lifeline_common::ContainerDaemonConfig;
use lifeline_component::ComponentRegistry;
use lifeline_lifecycle::{LifecycleAggregator, LifecycleState};
use lifeline_registry::{Registry, RegistryProxy};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::http::router;
use crate::AgentError;

/// A configured agent that has not started yet.
#[derive(Debug)]
pub struct ContainerAgent {
    config: Arc<ContainerDaemonConfig>,
    aggregator: Arc<LifecycleAggregator>,
    bind: SocketAddr,
}

impl ContainerAgent {
    /// Build the registry proxy and every managed component from `config`.
    pub fn new(config: ContainerDaemonConfig) -> Result<Self, AgentError> {
        config.validate()?;
        let registry = Arc::new(RegistryProxy::from_config(&config)?);
        info!(
            registry = %registry.base_url(),
            component_type = %registry.profile().component_type,
            "registry proxy configured"
        );
        Self::with_registry(config, registry, &ComponentRegistry::with_builtins())
    }

    /// Build an agent around an existing registry and component factories.
    pub fn with_registry(
        config: ContainerDaemonConfig,
        registry: Arc<dyn Registry>,
        components: &ComponentRegistry,
    ) -> Result<Self, AgentError> {
        config.validate()?;
        let aggregator = LifecycleAggregator::new(&config, registry, components)?;
        let bind = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.agent_port()));
        Ok(Self {
            config: Arc::new(config),
            aggregator: Arc::new(aggregator),
            bind,
        })
    }

    /// Override the listener address (`0.0.0.0:{agentPort}` by default).
    pub fn with_bind_addr(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }

    pub fn config(&self) -> &ContainerDaemonConfig {
        &self.config
    }

    pub fn aggregator(&self) -> &Arc<LifecycleAggregator> {
        &self.aggregator
    }

    /// Bind the status listener and spawn the server and the control loop.
    pub async fn start(self) -> Result<AgentHandle, AgentError> {
        let listener = TcpListener::bind(self.bind)
            .await
            .map_err(|source| AgentError::Bind {
                addr: self.bind,
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| AgentError::Bind {
            addr: self.bind,
            source,
        })?;
        info!(address = %local_addr, container = %self.config.name, "status listener bound");

        let app = router(&self.config.name, self.aggregator.clone());
        let (server_stop, mut server_rx) = watch::channel(false);
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = server_rx.changed().await;
        });
        let server = tokio::spawn(async move {
            if let Err(err) = server.await {
                warn!(error = %err, "status server exited with error");
            }
        });

        let (control_stop, control_rx) = watch::channel(false);
        let control = tokio::spawn(control_loop(
            self.aggregator.clone(),
            self.config.heartbeat.interval,
            control_rx,
        ));

        Ok(AgentHandle {
            local_addr,
            aggregator: self.aggregator,
            grace: self.config.heartbeat.shutdown_grace,
            control,
            control_stop,
            server,
            server_stop,
        })
    }

    /// Start, wait for `signal`, then shut down in order.
    pub async fn run_until<F>(self, signal: F) -> Result<ShutdownReport, AgentError>
    where
        F: Future<Output = ()>,
    {
        let handle = self.start().await?;
        signal.await;
        info!("shutdown requested");
        handle.shutdown().await
    }
}

async fn control_loop(
    aggregator: Arc<LifecycleAggregator>,
    interval: Duration,
    mut stop: watch::Receiver<bool>,
) -> u64 {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks = 0u64;
    loop {
        tokio::select! {
            biased;
            _ = stop.changed() => break,
            _ = ticker.tick() => {
                ticks += 1;
                let advanced = aggregator.check_state().await;
                debug!(tick = ticks, advanced, state = %aggregator.current_state(), "heartbeat");
            }
        }
    }
    info!(ticks, "heartbeat stopped");
    ticks
}

/// Outcome of [`AgentHandle::shutdown`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Heartbeats run before the loop stopped.
    pub ticks: u64,
    /// Whether any component took the deactivate edge.
    pub deactivated: bool,
    /// Container state after deactivation.
    pub final_state: LifecycleState,
    /// `false` when the listener had to be aborted after the grace period.
    pub drained: bool,
}

/// Running agent.
#[derive(Debug)]
pub struct AgentHandle {
    local_addr: SocketAddr,
    aggregator: Arc<LifecycleAggregator>,
    grace: Duration,
    control: JoinHandle<u64>,
    control_stop: watch::Sender<bool>,
    server: JoinHandle<()>,
    server_stop: watch::Sender<bool>,
}

impl AgentHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn aggregator(&self) -> &Arc<LifecycleAggregator> {
        &self.aggregator
    }

    /// Stop ticking, push a final deactivation, then drain the listener for
    /// at most the configured grace period.
    pub async fn shutdown(self) -> Result<ShutdownReport, AgentError> {
        let AgentHandle {
            aggregator,
            grace,
            control,
            control_stop,
            mut server,
            server_stop,
            ..
        } = self;

        let _ = control_stop.send(true);
        let ticks = control.await?;

        let deactivated = aggregator.deactivate().await;
        let final_state = aggregator.current_state();
        info!(deactivated, state = %final_state, "final state pushed");

        let _ = server_stop.send(true);
        let drained = match tokio::time::timeout(grace, &mut server).await {
            Ok(joined) => {
                joined?;
                true
            }
            Err(_) => {
                warn!(grace_ms = grace.as_millis() as u64, "status listener did not drain; aborting");
                server.abort();
                false
            }
        };
        info!(ticks, drained, "agent stopped");

        Ok(ShutdownReport {
            ticks,
            deactivated,
            final_state,
            drained,
        })
    }
}
