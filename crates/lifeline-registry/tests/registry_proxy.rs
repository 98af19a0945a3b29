//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Registry proxy behaviour against a mocked registry."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::time::Duration;

use lifeline_common::ContainerDaemonConfig;
use lifeline_registry::{RegistrationProfile, Registry, RegistryProxy};
use lifeline_transport::JsonClient;
use mockito::{Matcher, Server};
use serde_json::json;

const CONTEXT: &str = "registry/rest/v1";
const REGISTER_PATH: &str = "/registry/rest/v1/clusters/c1/zones/z1/lfa";
const STATUS_PUT_PATH: &str = "/registry/rest/v1/clusters/C-9/zones/Z-3/lfa/T-42/status";

fn profile() -> RegistrationProfile {
    RegistrationProfile {
        name: "edge-01".into(),
        host: "10.0.0.5".into(),
        port: 8080,
        agent_port: 9090,
        cluster: "c1".into(),
        zone: "z1".into(),
        component_type: "lfa".into(),
    }
}

fn proxy_for(server: &Server) -> RegistryProxy {
    let client = JsonClient::new(server.url(), CONTEXT, Duration::from_secs(2)).unwrap();
    RegistryProxy::new(client, profile())
}

async fn mock_ready(server: &mut Server) -> mockito::Mock {
    server
        .mock("GET", "/registry/rest/v1/status")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status":"REGISTRY_READY"}"#)
        .create_async()
        .await
}

async fn mock_registered(server: &mut Server) -> mockito::Mock {
    server
        .mock("POST", REGISTER_PATH)
        .match_body(Matcher::Json(json!({
            "name": "edge-01",
            "host": "10.0.0.5",
            "port": 8080,
            "agentPort": 9090,
            "status": "registering"
        })))
        .with_status(200)
        .with_body(
            r#"{"status":"registered","tmgcId":"T-42","zoneId":"Z-3","clusterId":"C-9","registrationTime":"2024-01-01T00:00:00Z"}"#,
        )
        .expect(1)
        .create_async()
        .await
}

#[tokio::test]
async fn readiness_latches_after_first_ready_answer() {
    let mut server = Server::new_async().await;
    let ready = mock_ready(&mut server).await;
    let proxy = proxy_for(&server);

    assert!(proxy.is_ready().await);
    ready.assert_async().await;
    ready.remove_async().await;

    let not_ready = server
        .mock("GET", "/registry/rest/v1/status")
        .with_status(200)
        .with_body(r#"{"status":"STARTING"}"#)
        .expect(0)
        .create_async()
        .await;

    assert!(proxy.is_ready().await);
    assert!(proxy.is_ready().await);
    not_ready.assert_async().await;
}

#[tokio::test]
async fn not_ready_answer_is_checked_again() {
    let mut server = Server::new_async().await;
    let starting = server
        .mock("GET", "/registry/rest/v1/status")
        .with_status(200)
        .with_body(r#"{"status":"STARTING"}"#)
        .expect(2)
        .create_async()
        .await;
    let proxy = proxy_for(&server);

    assert!(!proxy.is_ready().await);
    assert!(!proxy.is_ready().await);
    starting.assert_async().await;
    starting.remove_async().await;

    let _ready = mock_ready(&mut server).await;
    assert!(proxy.is_ready().await);
}

#[tokio::test]
async fn undecodable_readiness_body_counts_as_not_ready() {
    let mut server = Server::new_async().await;
    let _garbage = server
        .mock("GET", "/registry/rest/v1/status")
        .with_status(200)
        .with_body("<html>maintenance</html>")
        .create_async()
        .await;
    let proxy = proxy_for(&server);

    assert!(!proxy.is_ready().await);
}

#[tokio::test]
async fn register_posts_once_and_caches_identifiers() {
    let mut server = Server::new_async().await;
    let _ready = mock_ready(&mut server).await;
    let register = mock_registered(&mut server).await;
    let proxy = proxy_for(&server);

    assert!(proxy.registration().is_none());
    assert!(proxy.register().await);
    assert!(proxy.register().await);
    register.assert_async().await;

    let record = proxy.registration().expect("record cached");
    assert_eq!(record.tmgc_id, "T-42");
    assert_eq!(record.zone_id, "Z-3");
    assert_eq!(record.cluster_id, "C-9");
}

#[tokio::test]
async fn register_is_refused_before_readiness() {
    let mut server = Server::new_async().await;
    let _starting = server
        .mock("GET", "/registry/rest/v1/status")
        .with_status(200)
        .with_body(r#"{"status":"STARTING"}"#)
        .create_async()
        .await;
    let register = server
        .mock("POST", REGISTER_PATH)
        .expect(0)
        .create_async()
        .await;
    let proxy = proxy_for(&server);

    assert!(!proxy.register().await);
    register.assert_async().await;
}

#[tokio::test]
async fn rejected_registration_is_retried_on_next_call() {
    let mut server = Server::new_async().await;
    let _ready = mock_ready(&mut server).await;
    let rejected = server
        .mock("POST", REGISTER_PATH)
        .with_status(200)
        .with_body(r#"{"status":"rejected"}"#)
        .expect(1)
        .create_async()
        .await;
    let proxy = proxy_for(&server);

    assert!(!proxy.register().await);
    assert!(proxy.registration().is_none());
    rejected.assert_async().await;
    rejected.remove_async().await;

    let accepted = mock_registered(&mut server).await;
    assert!(proxy.register().await);
    accepted.assert_async().await;
    assert_eq!(proxy.registration().unwrap().tmgc_id, "T-42");
}

#[tokio::test]
async fn registration_missing_identifiers_is_not_cached() {
    let mut server = Server::new_async().await;
    let _ready = mock_ready(&mut server).await;
    let _partial = server
        .mock("POST", REGISTER_PATH)
        .with_status(200)
        .with_body(r#"{"status":"registered","tmgcId":"T-42"}"#)
        .create_async()
        .await;
    let proxy = proxy_for(&server);

    assert!(!proxy.register().await);
    assert!(proxy.registration().is_none());
}

#[tokio::test]
async fn status_update_requires_registration() {
    let mut server = Server::new_async().await;
    let _ready = mock_ready(&mut server).await;
    let put = server
        .mock("PUT", Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let proxy = proxy_for(&server);

    assert!(!proxy.update_status("RESOLVED").await);
    put.assert_async().await;
}

#[tokio::test]
async fn status_update_is_addressed_by_registration_record() {
    let mut server = Server::new_async().await;
    let _ready = mock_ready(&mut server).await;
    let _register = mock_registered(&mut server).await;
    let put = server
        .mock("PUT", STATUS_PUT_PATH)
        .match_body(Matcher::Json(json!({ "status": "ACTIVE" })))
        .with_status(204)
        .expect(1)
        .create_async()
        .await;
    let proxy = proxy_for(&server);

    assert!(proxy.register().await);
    assert!(proxy.update_status("ACTIVE").await);
    put.assert_async().await;
}

#[tokio::test]
async fn status_update_server_error_reports_failure() {
    let mut server = Server::new_async().await;
    let _ready = mock_ready(&mut server).await;
    let _register = mock_registered(&mut server).await;
    let _put = server
        .mock("PUT", STATUS_PUT_PATH)
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;
    let proxy = proxy_for(&server);

    assert!(proxy.register().await);
    assert!(!proxy.update_status("STANDBY").await);
    assert!(proxy.registration().is_some());
}

#[tokio::test]
async fn unreachable_registry_is_never_ready() {
    let client = JsonClient::new("http://127.0.0.1:1", CONTEXT, Duration::from_millis(500)).unwrap();
    let proxy = RegistryProxy::new(client, profile());

    assert!(!proxy.is_ready().await);
    assert!(!proxy.register().await);
    assert!(!proxy.update_status("UNKNOWN").await);
}

#[tokio::test]
async fn hung_registry_is_not_ready_within_timeout() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _held = tokio::spawn(async move {
        let mut open = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            open.push(socket);
        }
    });
    let client =
        JsonClient::new(format!("http://{addr}"), CONTEXT, Duration::from_millis(300)).unwrap();
    let proxy = RegistryProxy::new(client, profile());

    let started = std::time::Instant::now();
    assert!(!proxy.is_ready().await);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(250), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(5), "{elapsed:?}");
}

#[test]
fn proxy_from_config_prefixes_scheme_and_base_path() {
    let config: ContainerDaemonConfig = r#"{
        "name": "edge-01",
        "cluster": "c1",
        "zone": "z1",
        "type": "lfa",
        "inboxes": { "registry": "registry.local:8500" },
        "transportSettings": { "ip": "10.0.0.5", "port": 8080 },
        "components": [ { "name": "lfa", "type": "noop" } ]
    }"#
    .parse()
    .unwrap();

    let proxy = RegistryProxy::from_config(&config).unwrap();
    assert_eq!(proxy.base_url(), "http://registry.local:8500/registry/rest/v1");
    assert_eq!(proxy.profile().agent_port, 8080);
    assert_eq!(proxy.profile().component_type, "lfa");
}
