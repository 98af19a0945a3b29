//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Type-tag registry building managed components from configuration."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use lifeline_common::ManagedComponentSpec;
use tracing::debug;

use crate::gateway::GatewayComponent;
use crate::script::ScriptComponent;
use crate::{ComponentError, ManagedComponent};

/// Builds one component instance from its configuration entry.
pub type ComponentFactory = Arc<
    dyn Fn(&ManagedComponentSpec) -> Result<Arc<dyn ManagedComponent>, ComponentError>
        + Send
        + Sync,
>;

/// Maps `type` tags to component factories.
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    factories: IndexMap<String, ComponentFactory>,
}

impl ComponentRegistry {
    /// Empty registry; every tag must be registered explicitly.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the script and gateway variants installed.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for tag in ["script", "noop", "lfa"] {
            registry.register(tag, |spec| {
                Ok(Arc::new(ScriptComponent::from_spec(spec)?) as Arc<dyn ManagedComponent>)
            });
        }
        for tag in ["microgateway", "gateway"] {
            registry.register(tag, |spec| {
                Ok(Arc::new(GatewayComponent::from_spec(spec)?) as Arc<dyn ManagedComponent>)
            });
        }
        registry
    }

    /// Install or replace the factory for `tag`.
    pub fn register<F>(&mut self, tag: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&ManagedComponentSpec) -> Result<Arc<dyn ManagedComponent>, ComponentError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(tag.into(), Arc::new(factory));
        self
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.factories.contains_key(tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Instantiate the component described by `spec`.
    pub fn build(
        &self,
        spec: &ManagedComponentSpec,
    ) -> Result<Arc<dyn ManagedComponent>, ComponentError> {
        let factory =
            self.factories
                .get(&spec.kind)
                .ok_or_else(|| ComponentError::UnknownType {
                    component: spec.name.clone(),
                    kind: spec.kind.clone(),
                })?;
        debug!(component = %spec.name, kind = %spec.kind, "building managed component");
        factory(spec)
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("tags", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
