//! ---
//! ems_section: "15-testing-qa-runbook"
//! ems_subsection: "integration-tests"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "The shipped sample configuration loads and builds."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};
use std::time::Duration;

use lifeline_common::{ContainerDaemonConfig, LogFormat};
use lifeline_component::ComponentRegistry;
use lifeline_registry::RegistryProxy;

fn sample_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../configs/example.json")
}

#[test]
fn sample_config_parses_with_defaults_applied() {
    let config = ContainerDaemonConfig::from_path(&sample_path())
        .unwrap_or_else(|err| panic!("failed to load sample config: {err}"));

    assert_eq!(config.name, "edge-01");
    assert_eq!(config.component_type(), "lfa");
    assert_eq!(config.registry_endpoint(), Some("registry.payments.svc:8500"));
    assert_eq!(config.agent_port(), 9090);
    assert_eq!(config.heartbeat.interval, Duration::from_secs(2));
    assert_eq!(config.heartbeat.shutdown_grace, Duration::from_secs(5));
    assert_eq!(config.registry.scheme, "http");
    assert_eq!(config.logging.format, LogFormat::StructuredJson);
    let names: Vec<_> = config.components.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["lfa", "mgw"]);
}

#[test]
fn sample_components_all_have_builtin_variants() {
    let config = ContainerDaemonConfig::from_path(&sample_path()).unwrap();
    let registry = ComponentRegistry::with_builtins();
    for spec in &config.components {
        let component = registry
            .build(spec)
            .unwrap_or_else(|err| panic!("component {} failed to build: {err}", spec.name));
        assert_eq!(component.kind(), spec.kind);
    }
}

#[test]
fn sample_registry_endpoint_resolves() {
    let config = ContainerDaemonConfig::from_path(&sample_path()).unwrap();
    let proxy = RegistryProxy::from_config(&config).unwrap();
    assert_eq!(
        proxy.base_url(),
        "http://registry.payments.svc:8500/registry/rest/v1"
    );
}
