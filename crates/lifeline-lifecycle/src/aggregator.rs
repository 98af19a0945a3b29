//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Fan-out of heartbeat ticks across all managed components."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use lifeline_common::ContainerDaemonConfig;
use lifeline_component::{ComponentRegistry, ManagedComponent};
use lifeline_registry::Registry;
use tracing::{debug, info};

use crate::machine::LifecycleStateMachine;
use crate::state::LifecycleState;
use crate::LifecycleError;

/// All state machines of one container, kept in configuration order.
pub struct LifecycleAggregator {
    registry: Arc<dyn Registry>,
    machines: IndexMap<String, LifecycleStateMachine>,
}

impl LifecycleAggregator {
    /// Build one machine per configured component. Unknown type tags fail here,
    /// before any heartbeat runs.
    pub fn new(
        config: &ContainerDaemonConfig,
        registry: Arc<dyn Registry>,
        components: &ComponentRegistry,
    ) -> Result<Self, LifecycleError> {
        let built = config
            .components
            .iter()
            .map(|spec| components.build(spec))
            .collect::<Result<Vec<_>, _>>()?;
        Self::with_components(registry, built)
    }

    pub fn with_components(
        registry: Arc<dyn Registry>,
        components: impl IntoIterator<Item = Arc<dyn ManagedComponent>>,
    ) -> Result<Self, LifecycleError> {
        let mut machines = IndexMap::new();
        for component in components {
            let name = component.name().to_owned();
            if machines.contains_key(&name) {
                return Err(LifecycleError::DuplicateComponent(name));
            }
            info!(component = %name, kind = %component.kind(), "managed component added");
            machines.insert(name, LifecycleStateMachine::new(component, registry.clone()));
        }
        Ok(Self { registry, machines })
    }

    /// One heartbeat: `false` without touching any component while the
    /// registry is not ready, otherwise whether any component transitioned.
    pub async fn check_state(&self) -> bool {
        if !self.registry.is_ready().await {
            debug!("registry not ready; skipping tick");
            return false;
        }

        let mut advanced = false;
        let mut stalled = Vec::new();
        for (name, machine) in &self.machines {
            if machine.check_state().await {
                advanced = true;
            } else {
                stalled.push(name.as_str());
            }
        }
        if !stalled.is_empty() {
            debug!(?stalled, "components did not transition this tick");
        }
        advanced
    }

    /// Deactivate every component; `true` if any was active.
    pub async fn deactivate(&self) -> bool {
        let mut deactivated = false;
        for machine in self.machines.values() {
            deactivated |= machine.deactivate().await;
        }
        deactivated
    }

    /// Snapshot of `(component, state)` in configuration order.
    pub fn states(&self) -> Vec<(String, LifecycleState)> {
        self.machines
            .iter()
            .map(|(name, machine)| (name.clone(), machine.state()))
            .collect()
    }

    /// The container's overall state: the least progressed component.
    pub fn current_state(&self) -> LifecycleState {
        self.machines
            .values()
            .map(LifecycleStateMachine::state)
            .min()
            .unwrap_or_default()
    }

    pub fn machines(&self) -> impl Iterator<Item = &LifecycleStateMachine> {
        self.machines.values()
    }

    pub fn registry(&self) -> &Arc<dyn Registry> {
        &self.registry
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }
}

impl fmt::Debug for LifecycleAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleAggregator")
            .field("machines", &self.machines)
            .finish()
    }
}
