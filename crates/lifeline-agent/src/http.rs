//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Status HTTP surface of the container agent."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use lifeline_lifecycle::LifecycleAggregator;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

/// Body of `GET /{name}/status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContainerStatus {
    pub name: String,
    pub status: String,
}

/// One entry of `GET /{name}/components`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComponentStatus {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
}

#[derive(Clone)]
struct StatusState {
    name: Arc<str>,
    aggregator: Arc<LifecycleAggregator>,
}

/// Routes served by the agent listener. Every answer is read from the
/// aggregator at request time.
pub fn router(name: &str, aggregator: Arc<LifecycleAggregator>) -> Router {
    let state = StatusState {
        name: Arc::from(name),
        aggregator,
    };
    Router::new()
        .route(&format!("/{name}/status"), get(container_status))
        .route(&format!("/{name}/components"), get(component_statuses))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn container_status(State(state): State<StatusState>) -> Json<ContainerStatus> {
    Json(ContainerStatus {
        name: state.name.to_string(),
        status: state.aggregator.current_state().as_str().to_owned(),
    })
}

async fn component_statuses(State(state): State<StatusState>) -> Json<Vec<ComponentStatus>> {
    let statuses = state
        .aggregator
        .machines()
        .map(|machine| ComponentStatus {
            name: machine.name().to_owned(),
            kind: machine.kind().to_owned(),
            status: machine.state().as_str().to_owned(),
        })
        .collect();
    Json(statuses)
}
