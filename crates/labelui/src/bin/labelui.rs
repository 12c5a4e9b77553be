//! labelui CLI - terminal client for a labeling project.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use labelui::pipeline::DefaultListenerFactory;
use labelui::remote::{HttpConfigLoader, HttpDataHandlerFactory};
use labelui::session::AuthApi;
use labelui::terminal::{
    CredentialPrompt, TerminalLegend, TerminalNavigator, TerminalSurface, TerminalTutorial,
};
use labelui::{
    bootstrap, BootstrapContext, ClientConfig, HttpAuthApi, InitializationPipeline, KeyOutcome,
    LabelClassRegistry, PipelineError, SessionGuard, SessionPhase, UiController,
};

/// labelui - Label images from the terminal.
#[derive(Parser)]
#[command(name = "labelui")]
#[command(about = "Terminal client for a labeling project")]
#[command(version)]
pub struct Cli {
    /// Labeling server URL
    #[arg(long, global = true, env = "LABELUI_SERVER_URL")]
    server_url: Option<String>,

    /// Username used for session renewal
    #[arg(long, global = true, env = "LABELUI_USERNAME")]
    username: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check whether the current session is valid
    Check,

    /// Bootstrap the interface and start labeling
    Start {
        /// Do not wait for Enter after the tutorial
        #[arg(long)]
        no_wait: bool,
    },

    /// Print the project's label classes
    Classes,
}

/// Terminal collaborators sharing one HTTP client.
struct Session {
    config: ClientConfig,
    client: reqwest::Client,
    ui: Arc<UiController>,
    guard: Arc<SessionGuard>,
}

impl Session {
    fn connect(config: ClientConfig) -> Result<Self> {
        let client = config
            .http_client()
            .context("Failed to build HTTP client")?;
        let ui = Arc::new(UiController::new(Arc::new(TerminalSurface)));
        match &config.username {
            Some(username) => ui.set_displayed_user(username),
            None => tracing::warn!("No username configured, session renewal will fail"),
        }

        let api = Arc::new(HttpAuthApi::new(client.clone(), &config.server_url));
        let guard = Arc::new(SessionGuard::new(
            api,
            ui.clone(),
            Arc::new(TerminalNavigator::new(&config.server_url)),
            config.landing_path.clone(),
        ));

        Ok(Self {
            config,
            client,
            ui,
            guard,
        })
    }

    fn config_loader(&self) -> HttpConfigLoader {
        HttpConfigLoader::new(
            self.client.clone(),
            &self.config.server_url,
            self.guard.clone(),
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("labelui=debug,info")
    } else {
        EnvFilter::new("labelui=info,warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let mut config = ClientConfig::from_env();
    if let Some(url) = &cli.server_url {
        config = config.with_server_url(url);
    }
    if let Some(username) = cli.username {
        config = config.with_username(username);
    }
    tracing::info!(server = %config.server_url, "Using labeling server");

    match cli.command {
        Commands::Check => run_check(&config).await,
        Commands::Start { no_wait } => run_start(config, !no_wait).await,
        Commands::Classes => run_classes(config).await,
    }
}

async fn run_check(config: &ClientConfig) -> Result<()> {
    let api = HttpAuthApi::from_config(config).context("Failed to build HTTP client")?;

    match api.login_check().await {
        Ok(()) => {
            println!("{} {}", "✓".green().bold(), "Session is valid".green());
            Ok(())
        }
        Err(e) => {
            println!("{} {}", "✗".red().bold(), "No valid session".red());
            bail!("session check failed: {e}")
        }
    }
}

async fn run_classes(config: ClientConfig) -> Result<()> {
    let session = Session::connect(config)?;
    let _prompt = CredentialPrompt::terminal(session.guard.clone());
    session.guard.require_session().await?;

    let configuration = session
        .config_loader()
        .fetch()
        .await
        .context("Failed to load project settings")?;

    let legend = Arc::new(TerminalLegend::default());
    let registry = LabelClassRegistry::build(&configuration.classes, legend.clone())?;

    println!("{}", configuration.project_name.cyan().bold());
    if let Some(description) = &configuration.project_description {
        println!("{}", description.bright_black());
    }
    println!();
    legend.print();
    println!();
    println!("{} classes", registry.len());
    Ok(())
}

async fn run_start(config: ClientConfig, wait_for_enter: bool) -> Result<()> {
    let session = Session::connect(config)?;
    let _prompt = CredentialPrompt::terminal(session.guard.clone());

    let legend = Arc::new(TerminalLegend::default());
    let pipeline = InitializationPipeline::standard(
        Arc::new(session.config_loader()),
        Arc::new(DefaultListenerFactory),
        Arc::new(HttpDataHandlerFactory::new(
            session.client.clone(),
            &session.config,
            session.guard.clone(),
        )),
    );
    let ctx = BootstrapContext::new(session.ui.clone(), session.guard.clone(), legend.clone());
    let tutorial = TerminalTutorial::new(legend.clone(), wait_for_enter);

    let mut workspace = match bootstrap(&pipeline, ctx, &tutorial).await {
        Ok(workspace) => workspace,
        Err(PipelineError::AuthRequired | PipelineError::Aborted) => return Ok(()),
        Err(e) => return Err(e).context("Initialization failed"),
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let key = match line.trim() {
            "" => continue,
            "esc" | "escape" => "Escape",
            other => other,
        };

        match workspace.on_key_up(key).await {
            Ok(KeyOutcome::Quit) => break,
            Ok(KeyOutcome::Blocked) => println!("{}", "Interface is locked".yellow()),
            Ok(KeyOutcome::Ignored) => println!("{} {}", "Unbound key:".bright_black(), key),
            Ok(KeyOutcome::BatchLoaded(count)) => println!("Loaded {count} entries"),
            Ok(KeyOutcome::ActionChanged(action)) => println!("Action: {action:?}"),
            Ok(KeyOutcome::ClassActivated(_)) => {}
            Err(e) => println!("{} {e:#}", "✗".red().bold()),
        }

        if workspace.guard().phase() == SessionPhase::Aborted {
            break;
        }
    }

    Ok(())
}
