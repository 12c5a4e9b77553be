//! Collaborators consumed by the initialization pipeline.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::ProjectConfiguration;
use crate::ui::{InterfaceAction, RevealHandle};
use crate::workspace::Command;

/// Loads the project configuration, including the class catalogue.
#[async_trait]
pub trait ConfigurationLoader: Send + Sync {
    async fn load_configuration(&self) -> Result<ProjectConfiguration>;
}

/// Translates keys into interface commands.
pub trait CommandListener: Send + Sync {
    /// Command bound to `key`, if any. Unbound keys fall through to the
    /// class shortcuts.
    fn on_key_up(&mut self, key: &str) -> Option<Command>;
}

/// Constructs the command listener.
pub trait ListenerFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn CommandListener>>;
}

/// Loads batches of entries to annotate.
#[async_trait]
pub trait DataHandler: Send + Sync {
    /// Request the next batch; returns the number of entries received.
    async fn load_next_batch(&self) -> Result<usize>;
}

/// Constructs the data handler once the configuration is known.
pub trait DataHandlerFactory: Send + Sync {
    fn create(&self, configuration: &ProjectConfiguration) -> Result<Arc<dyn DataHandler>>;
}

/// Onboarding content shown after initialization.
///
/// Implementations call [`RevealHandle::reveal`] when the user dismisses
/// the tutorial; until then the interface stays blocked.
#[async_trait]
pub trait Tutorial: Send + Sync {
    async fn show(&self, reveal: RevealHandle);
}

/// Default key bindings.
#[derive(Debug, Default)]
pub struct KeyCommandListener;

impl CommandListener for KeyCommandListener {
    fn on_key_up(&mut self, key: &str) -> Option<Command> {
        match key {
            "n" => Some(Command::LoadNextBatch),
            "a" => Some(Command::SetAction(InterfaceAction::AddAnnotation)),
            "r" => Some(Command::SetAction(InterfaceAction::RemoveAnnotations)),
            "Escape" => Some(Command::SetAction(InterfaceAction::DoNothing)),
            "q" => Some(Command::Quit),
            _ => None,
        }
    }
}

/// Factory for [`KeyCommandListener`].
#[derive(Debug, Default)]
pub struct DefaultListenerFactory;

impl ListenerFactory for DefaultListenerFactory {
    fn create(&self) -> Result<Box<dyn CommandListener>> {
        Ok(Box::new(KeyCommandListener))
    }
}
