//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Script-driven component variant and the detached script launcher."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use lifeline_common::ManagedComponentSpec;
use parking_lot::Mutex;
use tokio::process::{Child, Command};
use tracing::{debug, info, info_span, warn, Span};

use crate::{ComponentError, ManagedComponent};

/// Launches a configured command line as a detached child and tracks its exit.
///
/// The command line is split on whitespace; the first token is the program.
#[derive(Debug)]
pub struct ScriptLauncher {
    command: Option<String>,
    child: Mutex<Option<Child>>,
}

impl ScriptLauncher {
    pub fn new(command: Option<String>) -> Self {
        let command = command.filter(|c| !c.trim().is_empty());
        Self {
            command,
            child: Mutex::new(None),
        }
    }

    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    fn program(&self) -> Option<&str> {
        self.command.as_deref().and_then(|c| c.split_whitespace().next())
    }

    /// Resolve the program to an existing file, searching `PATH` for bare names.
    pub fn resolve(&self) -> Result<Option<PathBuf>, ComponentError> {
        let Some(program) = self.program() else {
            return Ok(None);
        };
        let found = if program.contains(std::path::MAIN_SEPARATOR) {
            let path = Path::new(program);
            path.is_file().then(|| path.to_path_buf())
        } else {
            std::env::var_os("PATH").and_then(|paths| {
                std::env::split_paths(&paths)
                    .map(|dir| dir.join(program))
                    .find(|candidate| candidate.is_file())
            })
        };
        found
            .map(Some)
            .ok_or_else(|| ComponentError::ScriptNotFound(program.to_owned()))
    }

    /// Spawn the command unless a previous launch is still running.
    pub fn launch(&self) -> Result<(), ComponentError> {
        let Some(command) = self.command.as_deref() else {
            return Ok(());
        };
        let mut slot = self.child.lock();
        if let Some(child) = slot.as_mut() {
            if matches!(child.try_wait(), Ok(None)) {
                debug!(script = command, "script already running");
                return Ok(());
            }
        }

        let mut tokens = command.split_whitespace();
        let program = tokens.next().unwrap_or_default();
        info!(script = command, "running script");
        let child = Command::new(program)
            .args(tokens)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| ComponentError::Spawn {
                script: command.to_owned(),
                source,
            })?;
        *slot = Some(child);
        Ok(())
    }

    /// `false` once a launched command has exited with a failure status.
    pub fn healthy(&self) -> bool {
        let mut slot = self.child.lock();
        let Some(child) = slot.as_mut() else {
            return true;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) if status.success() => true,
            Ok(Some(status)) => {
                warn!(script = ?self.command, %status, "script exited with failure");
                false
            }
            Err(err) => {
                warn!(script = ?self.command, error = %err, "unable to poll script");
                false
            }
        }
    }
}

/// Component whose only side effect is an optional script run on the way to
/// `ACTIVE`. Covers the `script`, `noop` and `lfa` type tags.
#[derive(Debug)]
pub struct ScriptComponent {
    name: String,
    kind: String,
    launcher: ScriptLauncher,
    span: Span,
}

impl ScriptComponent {
    pub fn from_spec(spec: &ManagedComponentSpec) -> Result<Self, ComponentError> {
        if spec.kind == "script" && spec.script.is_none() {
            return Err(ComponentError::MissingField {
                component: spec.name.clone(),
                field: "script",
            });
        }
        Ok(Self {
            name: spec.name.clone(),
            kind: spec.kind.clone(),
            launcher: ScriptLauncher::new(spec.script.clone()),
            span: info_span!("component", name = %spec.name, kind = %spec.kind),
        })
    }
}

#[async_trait]
impl ManagedComponent for ScriptComponent {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        &self.kind
    }

    async fn bootup(&self) -> bool {
        self.span.in_scope(|| info!("bootup"));
        true
    }

    async fn build_configuration(&self) -> bool {
        self.span.in_scope(|| match self.launcher.resolve() {
            Ok(path) => {
                info!(script = ?path, "configuration built");
                true
            }
            Err(err) => {
                warn!(error = %err, "dependencies unresolved");
                false
            }
        })
    }

    async fn launch_component(&self) -> bool {
        self.span.in_scope(|| info!("launch"));
        true
    }

    async fn prepare_for_active(&self) -> bool {
        self.span.in_scope(|| match self.launcher.launch() {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "prepare for active failed");
                false
            }
        })
    }

    async fn watch_component(&self) -> bool {
        self.span.in_scope(|| self.launcher.healthy())
    }
}
