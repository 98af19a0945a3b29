//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "State machine driving one managed component."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fmt;
use std::sync::Arc;

use lifeline_component::ManagedComponent;
use lifeline_registry::Registry;
use parking_lot::RwLock;
use tracing::{debug, error, info, info_span, warn, Instrument, Span};

use crate::state::{transition, LifecycleEvent, LifecycleState};
use crate::LifecycleError;

/// Owns the lifecycle state of exactly one managed component.
///
/// Each [`check_state`](Self::check_state) runs the hook for the current
/// state and, when it succeeds, commits one transition and pushes the new
/// state to the registry. The state is readable concurrently through
/// [`state`](Self::state).
pub struct LifecycleStateMachine {
    component: Arc<dyn ManagedComponent>,
    registry: Arc<dyn Registry>,
    state: RwLock<LifecycleState>,
    span: Span,
}

impl LifecycleStateMachine {
    pub fn new(component: Arc<dyn ManagedComponent>, registry: Arc<dyn Registry>) -> Self {
        let span = info_span!(
            "lifecycle",
            component = %component.name(),
            kind = %component.kind()
        );
        Self {
            component,
            registry,
            state: RwLock::new(LifecycleState::Unknown),
            span,
        }
    }

    pub fn name(&self) -> &str {
        self.component.name()
    }

    pub fn kind(&self) -> &str {
        self.component.kind()
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.read()
    }

    /// Attempt one forward transition. Returns whether a transition committed.
    pub async fn check_state(&self) -> bool {
        self.tick().instrument(self.span.clone()).await
    }

    /// Take the deactivate edge (`ACTIVE -> UNKNOWN`) and report it.
    pub async fn deactivate(&self) -> bool {
        let span = self.span.clone();
        async move {
            match self.commit(LifecycleEvent::Deactivate) {
                Ok(next) => {
                    info!(state = %next, "deactivated");
                    self.report(next).await;
                    true
                }
                Err(err) => {
                    info!(error = %err, "nothing to deactivate");
                    false
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn tick(&self) -> bool {
        let current = self.state();
        let event = current.forward_event();
        if !self.run_hook(current).await {
            debug!(state = %current, %event, "hook not satisfied; staying put");
            return false;
        }

        match self.commit(event) {
            Ok(next) => {
                if next != current {
                    info!(from = %current, to = %next, "state transition");
                } else {
                    debug!(state = %next, "monitor");
                }
                self.report(next).await;
                true
            }
            Err(err) => {
                error!(error = %err, "illegal transition; resetting to RESOLVED");
                *self.state.write() = LifecycleState::Resolved;
                false
            }
        }
    }

    async fn run_hook(&self, state: LifecycleState) -> bool {
        match state {
            LifecycleState::Unknown => {
                if !self.component.bootup().await {
                    return false;
                }
                let registered = self.registry.register().await;
                if registered {
                    info!("registration succeeded");
                } else {
                    info!("registration failed");
                }
                registered
            }
            LifecycleState::Unsatisfied => self.component.build_configuration().await,
            LifecycleState::Resolved => self.component.launch_component().await,
            LifecycleState::Standby => self.component.prepare_for_active().await,
            LifecycleState::Active => self.component.watch_component().await,
        }
    }

    fn commit(&self, event: LifecycleEvent) -> Result<LifecycleState, LifecycleError> {
        let mut state = self.state.write();
        let next = transition(*state, event).ok_or(LifecycleError::IllegalTransition {
            from: *state,
            event,
        })?;
        *state = next;
        Ok(next)
    }

    /// Push `state` to the registry. All components of the container share
    /// one registry status resource, so the registry holds the last push.
    async fn report(&self, state: LifecycleState) {
        let component = self.component.name();
        if self.registry.update_status(state.as_str()).await {
            debug!(component, state = %state, "status pushed");
        } else {
            warn!(
                component,
                local = %state,
                "status push failed; registry view diverges from local state"
            );
        }
    }
}

impl fmt::Debug for LifecycleStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleStateMachine")
            .field("component", &self.component.name())
            .field("state", &self.state())
            .finish()
    }
}
