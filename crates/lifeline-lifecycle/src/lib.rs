//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Lifecycle state machine and aggregator."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Drives managed components through
//! `UNKNOWN -> UNSATISFIED -> RESOLVED -> STANDBY -> ACTIVE`, one step per
//! heartbeat, and reports every committed step to the registry.

mod aggregator;
mod machine;
mod state;

use lifeline_component::ComponentError;
use thiserror::Error;

pub use aggregator::LifecycleAggregator;
pub use machine::LifecycleStateMachine;
pub use state::{transition, LifecycleEvent, LifecycleState};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("event '{event}' is not permitted in state {from}")]
    IllegalTransition {
        from: LifecycleState,
        event: LifecycleEvent,
    },
    #[error(transparent)]
    Component(#[from] ComponentError),
    #[error("component '{0}' is declared more than once")]
    DuplicateComponent(String),
}
