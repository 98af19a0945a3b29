//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Gateway service component variant."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use async_trait::async_trait;
use lifeline_common::ManagedComponentSpec;
use tracing::{info, info_span, warn, Span};

use crate::script::ScriptLauncher;
use crate::{ComponentError, ManagedComponent};

/// A gateway service instance identified by its service and factory names.
#[derive(Debug)]
pub struct GatewayComponent {
    name: String,
    kind: String,
    service: String,
    factory: Option<String>,
    launcher: ScriptLauncher,
    span: Span,
}

impl GatewayComponent {
    pub fn from_spec(spec: &ManagedComponentSpec) -> Result<Self, ComponentError> {
        let service = spec
            .service
            .clone()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ComponentError::MissingField {
                component: spec.name.clone(),
                field: "service",
            })?;
        let span = info_span!(
            "component",
            name = %spec.name,
            kind = %spec.kind,
            service = %service
        );
        Ok(Self {
            name: spec.name.clone(),
            kind: spec.kind.clone(),
            service,
            factory: spec.factory.clone(),
            launcher: ScriptLauncher::new(spec.script.clone()),
            span,
        })
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn factory(&self) -> Option<&str> {
        self.factory.as_deref()
    }
}

#[async_trait]
impl ManagedComponent for GatewayComponent {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        &self.kind
    }

    async fn bootup(&self) -> bool {
        self.span
            .in_scope(|| info!(factory = ?self.factory, "gateway bootup"));
        true
    }

    async fn build_configuration(&self) -> bool {
        self.span.in_scope(|| match self.launcher.resolve() {
            Ok(_) => true,
            Err(err) => {
                warn!(error = %err, "gateway launcher unresolved");
                false
            }
        })
    }

    async fn launch_component(&self) -> bool {
        self.span.in_scope(|| info!("gateway launch"));
        true
    }

    async fn prepare_for_active(&self) -> bool {
        self.span.in_scope(|| match self.launcher.launch() {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "gateway failed to start");
                false
            }
        })
    }

    async fn watch_component(&self) -> bool {
        self.span.in_scope(|| self.launcher.healthy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_name_is_required() {
        let spec = ManagedComponentSpec::new("mgw", "microgateway");
        assert!(matches!(
            GatewayComponent::from_spec(&spec),
            Err(ComponentError::MissingField { field: "service", .. })
        ));
    }

    #[tokio::test]
    async fn gateway_without_launcher_walks_all_hooks() {
        let mut spec = ManagedComponentSpec::new("mgw", "microgateway").with_service("orders-api");
        spec.factory = Some("default".into());
        let gateway = GatewayComponent::from_spec(&spec).unwrap();

        assert_eq!(gateway.service(), "orders-api");
        assert_eq!(gateway.factory(), Some("default"));
        assert!(gateway.bootup().await);
        assert!(gateway.build_configuration().await);
        assert!(gateway.launch_component().await);
        assert!(gateway.prepare_for_active().await);
        assert!(gateway.watch_component().await);
    }
}
