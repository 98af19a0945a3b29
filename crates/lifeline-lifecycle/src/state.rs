//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Lifecycle states, events, and the transition table."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fmt;

use serde::Serialize;

/// Operational state of one managed component, ordered by progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    #[default]
    Unknown,
    Unsatisfied,
    Resolved,
    Standby,
    Active,
}

impl LifecycleState {
    pub const ALL: [LifecycleState; 5] = [
        LifecycleState::Unknown,
        LifecycleState::Unsatisfied,
        LifecycleState::Resolved,
        LifecycleState::Standby,
        LifecycleState::Active,
    ];

    /// Wire representation pushed to the registry.
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Unknown => "UNKNOWN",
            LifecycleState::Unsatisfied => "UNSATISFIED",
            LifecycleState::Resolved => "RESOLVED",
            LifecycleState::Standby => "STANDBY",
            LifecycleState::Active => "ACTIVE",
        }
    }

    /// Event a heartbeat attempts from this state.
    pub fn forward_event(self) -> LifecycleEvent {
        match self {
            LifecycleState::Unknown => LifecycleEvent::Initialize,
            LifecycleState::Unsatisfied => LifecycleEvent::ResolveDependencies,
            LifecycleState::Resolved => LifecycleEvent::Activate,
            LifecycleState::Standby => LifecycleEvent::Standby,
            LifecycleState::Active => LifecycleEvent::Monitor,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    Initialize,
    ResolveDependencies,
    Activate,
    Standby,
    Monitor,
    Deactivate,
}

impl LifecycleEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleEvent::Initialize => "initialize",
            LifecycleEvent::ResolveDependencies => "resolveDependencies",
            LifecycleEvent::Activate => "activate",
            LifecycleEvent::Standby => "standby",
            LifecycleEvent::Monitor => "monitor",
            LifecycleEvent::Deactivate => "deactivate",
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The complete transition table. `None` means the event is illegal in `from`.
pub fn transition(from: LifecycleState, event: LifecycleEvent) -> Option<LifecycleState> {
    use LifecycleEvent as E;
    use LifecycleState as S;

    match (from, event) {
        (S::Unknown, E::Initialize) => Some(S::Unsatisfied),
        (S::Unsatisfied, E::ResolveDependencies) => Some(S::Resolved),
        (S::Resolved, E::Activate) => Some(S::Standby),
        (S::Standby, E::Standby) => Some(S::Active),
        (S::Active, E::Monitor) => Some(S::Active),
        (S::Active, E::Deactivate) => Some(S::Unknown),
        _ => None,
    }
}
