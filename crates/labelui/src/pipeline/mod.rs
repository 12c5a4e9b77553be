//! Initialization pipeline - runs the bootstrap steps strictly in order.
//!
//! The interface is held blocked from the start of the pipeline. Completing
//! the pipeline does not release it: the tutorial shown afterwards receives a
//! [`RevealHandle`](crate::ui::RevealHandle) and releases the hold when it is
//! dismissed.

mod collaborators;
mod steps;

pub use collaborators::{
    CommandListener, ConfigurationLoader, DataHandler, DataHandlerFactory, DefaultListenerFactory,
    KeyCommandListener, ListenerFactory, Tutorial,
};
pub use steps::{
    BuildClassRegistry, CreateCommandListener, LoadConfiguration, LoadFirstBatch, VerifySession,
};

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{error, info};

use crate::config::ProjectConfiguration;
use crate::error::{PipelineError, RemoteError, SessionError};
use crate::registry::{LabelClassRegistry, Legend};
use crate::session::SessionGuard;
use crate::ui::UiController;
use crate::workspace::LabelingWorkspace;

/// One ordered unit of initialization work.
#[async_trait]
pub trait PipelineStep: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &'static str;

    async fn run(&self, ctx: &mut BootstrapContext) -> Result<()>;
}

/// State threaded through the pipeline steps.
pub struct BootstrapContext {
    pub ui: Arc<UiController>,
    pub guard: Arc<SessionGuard>,
    /// Render target handed to the registry.
    pub legend: Arc<dyn Legend>,
    pub configuration: Option<ProjectConfiguration>,
    pub listener: Option<Box<dyn CommandListener>>,
    pub registry: Option<LabelClassRegistry>,
    pub data: Option<Arc<dyn DataHandler>>,
}

impl BootstrapContext {
    #[must_use]
    pub fn new(ui: Arc<UiController>, guard: Arc<SessionGuard>, legend: Arc<dyn Legend>) -> Self {
        Self {
            ui,
            guard,
            legend,
            configuration: None,
            listener: None,
            registry: None,
            data: None,
        }
    }

    /// Assemble the workspace from what the steps produced.
    pub fn into_workspace(self) -> Result<LabelingWorkspace, PipelineError> {
        let configuration = self
            .configuration
            .ok_or(PipelineError::Incomplete("a configuration"))?;
        let listener = self
            .listener
            .ok_or(PipelineError::Incomplete("a command listener"))?;
        let registry = self
            .registry
            .ok_or(PipelineError::Incomplete("a class registry"))?;
        let data = self
            .data
            .ok_or(PipelineError::Incomplete("a data handler"))?;

        Ok(LabelingWorkspace::new(
            self.ui,
            self.guard,
            configuration,
            listener,
            registry,
            data,
        ))
    }
}

/// Ordered list of initialization steps.
#[derive(Default)]
pub struct InitializationPipeline {
    steps: Vec<Box<dyn PipelineStep>>,
}

impl InitializationPipeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step after the existing ones.
    #[must_use]
    pub fn with_step(mut self, step: impl PipelineStep + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// The standard bootstrap: session, configuration, command listener,
    /// class registry, first batch.
    #[must_use]
    pub fn standard(
        loader: Arc<dyn ConfigurationLoader>,
        listeners: Arc<dyn ListenerFactory>,
        data: Arc<dyn DataHandlerFactory>,
    ) -> Self {
        Self::new()
            .with_step(VerifySession)
            .with_step(LoadConfiguration::new(loader))
            .with_step(CreateCommandListener::new(listeners))
            .with_step(BuildClassRegistry)
            .with_step(LoadFirstBatch::new(data))
    }

    /// Step names in execution order.
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Hold the interface and run every step in order, stopping at the
    /// first failure.
    pub async fn run(&self, ctx: &mut BootstrapContext) -> Result<(), PipelineError> {
        ctx.ui.hold();
        let total = self.steps.len();

        for (position, step) in self.steps.iter().enumerate() {
            info!(
                step = step.name(),
                position = position + 1,
                total,
                "Running initialization step"
            );
            if let Err(e) = step.run(ctx).await {
                return Err(classify(step.name(), e));
            }
        }

        info!(steps = total, "Initialization complete");
        Ok(())
    }
}

fn session_error(err: &anyhow::Error) -> Option<&SessionError> {
    err.downcast_ref::<SessionError>()
        .or_else(|| match err.downcast_ref::<RemoteError>() {
            Some(RemoteError::Session(e)) => Some(e),
            _ => None,
        })
}

fn classify(step: &'static str, err: anyhow::Error) -> PipelineError {
    match session_error(&err) {
        Some(SessionError::AuthRequired) => PipelineError::AuthRequired,
        Some(SessionError::Aborted) => PipelineError::Aborted,
        _ => {
            error!(step, error = %err, "Initialization step failed");
            PipelineError::Step {
                step,
                source: err.into(),
            }
        }
    }
}

/// Run the pipeline, assemble the workspace and show the tutorial.
///
/// The interface stays blocked after this returns unless the tutorial
/// has already been dismissed.
pub async fn bootstrap(
    pipeline: &InitializationPipeline,
    mut ctx: BootstrapContext,
    tutorial: &dyn Tutorial,
) -> Result<LabelingWorkspace, PipelineError> {
    pipeline.run(&mut ctx).await?;
    let reveal = ctx.ui.reveal_handle();
    let workspace = ctx.into_workspace()?;
    tutorial.show(reveal).await;
    Ok(workspace)
}
