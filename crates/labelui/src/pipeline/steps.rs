//! The standard initialization steps, in the order they run.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use super::collaborators::{ConfigurationLoader, DataHandlerFactory, ListenerFactory};
use super::{BootstrapContext, PipelineStep};
use crate::registry::LabelClassRegistry;

/// Step 1: require an authenticated session.
pub struct VerifySession;

#[async_trait]
impl PipelineStep for VerifySession {
    fn name(&self) -> &'static str {
        "verify-session"
    }

    async fn run(&self, ctx: &mut BootstrapContext) -> Result<()> {
        ctx.guard.require_session().await?;
        Ok(())
    }
}

/// Step 2: load the project configuration.
pub struct LoadConfiguration {
    loader: Arc<dyn ConfigurationLoader>,
}

impl LoadConfiguration {
    #[must_use]
    pub fn new(loader: Arc<dyn ConfigurationLoader>) -> Self {
        Self { loader }
    }
}

#[async_trait]
impl PipelineStep for LoadConfiguration {
    fn name(&self) -> &'static str {
        "load-configuration"
    }

    async fn run(&self, ctx: &mut BootstrapContext) -> Result<()> {
        let configuration = self.loader.load_configuration().await?;
        info!(
            project = %configuration.project_name,
            classes = configuration.classes.len(),
            "Configuration loaded"
        );
        ctx.configuration = Some(configuration);
        Ok(())
    }
}

/// Step 3: construct the command listener.
pub struct CreateCommandListener {
    factory: Arc<dyn ListenerFactory>,
}

impl CreateCommandListener {
    #[must_use]
    pub fn new(factory: Arc<dyn ListenerFactory>) -> Self {
        Self { factory }
    }
}

#[async_trait]
impl PipelineStep for CreateCommandListener {
    fn name(&self) -> &'static str {
        "create-command-listener"
    }

    async fn run(&self, ctx: &mut BootstrapContext) -> Result<()> {
        ctx.listener = Some(self.factory.create()?);
        Ok(())
    }
}

/// Step 4: build the label-class registry into the legend.
pub struct BuildClassRegistry;

#[async_trait]
impl PipelineStep for BuildClassRegistry {
    fn name(&self) -> &'static str {
        "build-class-registry"
    }

    async fn run(&self, ctx: &mut BootstrapContext) -> Result<()> {
        let configuration = ctx
            .configuration
            .as_ref()
            .context("configuration has not been loaded")?;
        let registry = LabelClassRegistry::build(&configuration.classes, Arc::clone(&ctx.legend))?;
        ctx.registry = Some(registry);
        Ok(())
    }
}

/// Step 5: construct the data handler and request the first batch.
pub struct LoadFirstBatch {
    factory: Arc<dyn DataHandlerFactory>,
}

impl LoadFirstBatch {
    #[must_use]
    pub fn new(factory: Arc<dyn DataHandlerFactory>) -> Self {
        Self { factory }
    }
}

#[async_trait]
impl PipelineStep for LoadFirstBatch {
    fn name(&self) -> &'static str {
        "load-first-batch"
    }

    async fn run(&self, ctx: &mut BootstrapContext) -> Result<()> {
        let configuration = ctx
            .configuration
            .as_ref()
            .context("configuration has not been loaded")?;
        let handler = self.factory.create(configuration)?;
        let loaded = handler.load_next_batch().await?;
        info!(entries = loaded, "First batch loaded");
        ctx.data = Some(handler);
        Ok(())
    }
}
