//! The assembled labeling workspace and its input dispatch.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::config::ProjectConfiguration;
use crate::error::UnknownClassError;
use crate::pipeline::{CommandListener, DataHandler};
use crate::registry::LabelClassRegistry;
use crate::session::SessionGuard;
use crate::ui::{InterfaceAction, UiController};

/// Interface command produced by the command listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    LoadNextBatch,
    SetAction(InterfaceAction),
    Quit,
}

/// What a key or click did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Input is blocked; nothing happened.
    Blocked,
    ClassActivated(String),
    BatchLoaded(usize),
    ActionChanged(InterfaceAction),
    Quit,
    /// The key is not bound to anything.
    Ignored,
}

/// Everything the bootstrap produced, with one entry point for input.
pub struct LabelingWorkspace {
    ui: Arc<UiController>,
    guard: Arc<SessionGuard>,
    configuration: ProjectConfiguration,
    listener: Box<dyn CommandListener>,
    registry: LabelClassRegistry,
    data: Arc<dyn DataHandler>,
}

impl LabelingWorkspace {
    #[must_use]
    pub fn new(
        ui: Arc<UiController>,
        guard: Arc<SessionGuard>,
        configuration: ProjectConfiguration,
        listener: Box<dyn CommandListener>,
        registry: LabelClassRegistry,
        data: Arc<dyn DataHandler>,
    ) -> Self {
        Self {
            ui,
            guard,
            configuration,
            listener,
            registry,
            data,
        }
    }

    /// Dispatch a released key.
    ///
    /// Commands bound by the listener take precedence over the digit
    /// shortcuts. Nothing happens while the interface is blocked.
    pub async fn on_key_up(&mut self, key: &str) -> Result<KeyOutcome> {
        if self.ui.is_blocked() {
            debug!(key = %key, "Input blocked, ignoring key");
            return Ok(KeyOutcome::Blocked);
        }

        if let Some(command) = self.listener.on_key_up(key) {
            return self.execute(command).await;
        }

        Ok(match self.registry.handle_key(key) {
            Some(id) => KeyOutcome::ClassActivated(id),
            None => KeyOutcome::Ignored,
        })
    }

    /// Run an interface command.
    pub async fn execute(&mut self, command: Command) -> Result<KeyOutcome> {
        match command {
            Command::LoadNextBatch => Ok(KeyOutcome::BatchLoaded(self.load_next_batch().await?)),
            Command::SetAction(action) => {
                self.ui.set_action(action);
                debug!(?action, "Interface action changed");
                Ok(KeyOutcome::ActionChanged(action))
            }
            Command::Quit => Ok(KeyOutcome::Quit),
        }
    }

    /// Activate the class whose legend row was clicked.
    pub fn on_legend_click(&mut self, class_id: &str) -> Result<KeyOutcome, UnknownClassError> {
        if self.ui.is_blocked() {
            return Ok(KeyOutcome::Blocked);
        }
        self.registry.set_active(class_id)?;
        Ok(KeyOutcome::ClassActivated(class_id.to_string()))
    }

    /// Request the next batch from the data handler.
    pub async fn load_next_batch(&self) -> Result<usize> {
        let loaded = self.data.load_next_batch().await?;
        info!(entries = loaded, "Batch loaded");
        Ok(loaded)
    }

    pub fn registry(&self) -> &LabelClassRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut LabelClassRegistry {
        &mut self.registry
    }

    pub fn ui(&self) -> &Arc<UiController> {
        &self.ui
    }

    pub fn guard(&self) -> &Arc<SessionGuard> {
        &self.guard
    }

    pub fn configuration(&self) -> &ProjectConfiguration {
        &self.configuration
    }
}
