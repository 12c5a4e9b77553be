//! Terminal collaborators used by the `labelui` binary.

use std::io::BufRead;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use colored::{ColoredString, Colorize};
use dialoguer::theme::ColorfulTheme;
use dialoguer::Password;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::join_url;
use crate::pipeline::Tutorial;
use crate::registry::{Legend, LegendEntry};
use crate::session::{SessionGuard, SessionPhase};
use crate::ui::{
    Navigator, OverlayContent, RevealHandle, Surface, INVALID_PASSWORD_NOTICE,
    SESSION_RENEWAL_TITLE,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Parse `#rrggbb` into its components.
pub fn parse_hex_color(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

fn paint(text: &str, color: &str) -> ColoredString {
    match parse_hex_color(color) {
        Some((r, g, b)) => text.truecolor(r, g, b).bold(),
        None => text.bold(),
    }
}

/// Prints overlay changes and the logged-in user.
#[derive(Debug, Default)]
pub struct TerminalSurface;

impl Surface for TerminalSurface {
    fn render_overlay(&self, content: Option<&OverlayContent>) {
        match content {
            Some(OverlayContent::SessionRenewal {
                username,
                invalid_password,
            }) => {
                println!();
                println!("{}", SESSION_RENEWAL_TITLE.cyan().bold());
                println!(
                    "  Your session has expired. Enter the password for {}.",
                    username.bold()
                );
                if *invalid_password {
                    println!("  {} {}", "✗".red().bold(), INVALID_PASSWORD_NOTICE.red());
                }
            }
            Some(OverlayContent::Message { title, body }) => {
                println!();
                println!("{}", title.cyan().bold());
                println!("  {body}");
            }
            None => println!("{}", "✓ Interface unlocked".green()),
        }
    }

    fn render_user(&self, username: &str) {
        println!("{} {}", "Logged in as".bright_black(), username.bold());
    }
}

/// Legend kept in memory and printed on demand.
#[derive(Debug, Default)]
pub struct TerminalLegend {
    rows: Mutex<Vec<LegendEntry>>,
    active: Mutex<Option<String>>,
}

impl TerminalLegend {
    /// Print every row, marking the active one.
    pub fn print(&self) {
        let active = lock(&self.active).clone();
        for row in lock(&self.rows).iter() {
            let marker = if active.as_deref() == Some(row.class_id.as_str()) {
                "▶".cyan()
            } else {
                " ".normal()
            };
            println!(
                "{} {} {}",
                marker,
                paint(&row.label, &row.color),
                row.class_id.bright_black()
            );
        }
    }

    /// Id of the row shown as active.
    pub fn active(&self) -> Option<String> {
        lock(&self.active).clone()
    }
}

impl Legend for TerminalLegend {
    fn clear(&self) {
        lock(&self.rows).clear();
        *lock(&self.active) = None;
    }

    fn append(&self, entry: &LegendEntry) {
        lock(&self.rows).push(entry.clone());
    }

    fn set_active(&self, class_id: &str, active: bool) {
        let mut current = lock(&self.active);
        if active {
            *current = Some(class_id.to_string());
            drop(current);
            if let Some(row) = lock(&self.rows).iter().find(|r| r.class_id == class_id) {
                println!("{} {}", "Active class:".bright_black(), paint(&row.label, &row.color));
            }
        } else if current.as_deref() == Some(class_id) {
            *current = None;
        }
    }
}

/// Reports the landing redirect; a terminal client has nowhere to go.
#[derive(Debug)]
pub struct TerminalNavigator {
    server_url: String,
}

impl TerminalNavigator {
    #[must_use]
    pub fn new(server_url: &str) -> Self {
        Self {
            server_url: server_url.to_string(),
        }
    }
}

impl Navigator for TerminalNavigator {
    fn navigate(&self, path: &str) {
        println!(
            "{} {}",
            "Not logged in. Sign in at".yellow(),
            join_url(&self.server_url, path).underline()
        );
    }
}

/// Prints the controls and the legend, then waits for Enter.
pub struct TerminalTutorial {
    legend: Arc<TerminalLegend>,
    wait_for_enter: bool,
}

impl TerminalTutorial {
    #[must_use]
    pub fn new(legend: Arc<TerminalLegend>, wait_for_enter: bool) -> Self {
        Self {
            legend,
            wait_for_enter,
        }
    }
}

#[async_trait]
impl Tutorial for TerminalTutorial {
    async fn show(&self, reveal: RevealHandle) {
        println!();
        println!("{}", "Controls".cyan().bold());
        println!("  {}  select a label class", "1-9".bold());
        println!("  {}    load the next batch", "n".bold());
        println!("  {}    add annotations", "a".bold());
        println!("  {}    remove annotations", "r".bold());
        println!("  {}    quit", "q".bold());
        println!();
        println!("{}", "Label classes".cyan().bold());
        self.legend.print();

        if self.wait_for_enter {
            println!();
            println!("{}", "Press Enter to start labeling".bright_black());
            let read = tokio::task::spawn_blocking(|| {
                let mut line = String::new();
                std::io::stdin().lock().read_line(&mut line).map(|_| ())
            })
            .await;
            if !matches!(read, Ok(Ok(()))) {
                warn!("Could not read tutorial confirmation, continuing");
            }
        }

        reveal.reveal();
    }
}

/// Blocking source of renewal passwords.
pub trait PasswordSource: Send + 'static {
    /// Read one password. An empty password cancels the renewal.
    fn read_password(&mut self) -> std::io::Result<String>;
}

/// Reads the password from the terminal without echo.
#[derive(Debug, Default)]
pub struct TerminalPassword;

impl PasswordSource for TerminalPassword {
    fn read_password(&mut self) -> std::io::Result<String> {
        Password::with_theme(&ColorfulTheme::default())
            .with_prompt("Password (empty to cancel)")
            .allow_empty_password(true)
            .interact()
            .map_err(std::io::Error::other)
    }
}

/// Answers renewal prompts until the guard aborts or this value is dropped.
///
/// Every command that issues authenticated requests must hold one, or an
/// expired session leaves the request waiting on a form nobody fills in.
pub struct CredentialPrompt {
    task: JoinHandle<()>,
}

impl CredentialPrompt {
    /// Drive renewals with passwords from `source`.
    pub fn spawn(guard: Arc<SessionGuard>, source: impl PasswordSource) -> Self {
        Self {
            task: tokio::spawn(answer_prompts(guard, source)),
        }
    }

    /// Drive renewals from the terminal.
    pub fn terminal(guard: Arc<SessionGuard>) -> Self {
        Self::spawn(guard, TerminalPassword)
    }

    /// Whether the driver has stopped, which happens once the guard aborts.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for CredentialPrompt {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn answer_prompts<S: PasswordSource>(guard: Arc<SessionGuard>, mut source: S) {
    let mut phases = guard.subscribe();
    loop {
        let phase = match phases
            .wait_for(|p| matches!(p, SessionPhase::ReauthPrompted | SessionPhase::Aborted))
            .await
        {
            Ok(phase) => *phase,
            Err(_) => break,
        };
        if phase == SessionPhase::Aborted {
            debug!("Session aborted, stopping credential prompt");
            break;
        }

        let read = tokio::task::spawn_blocking(move || {
            let password = source.read_password();
            (source, password)
        })
        .await;

        let password = match read {
            Ok((returned, password)) => {
                source = returned;
                password
            }
            Err(e) => {
                warn!(error = %e, "Password prompt task failed");
                guard.cancel();
                break;
            }
        };

        match password {
            Ok(password) if !password.is_empty() => {
                if let Err(e) = guard.submit_credentials(&password).await {
                    debug!(error = %e, "Renewal attempt failed");
                }
            }
            Ok(_) => guard.cancel(),
            Err(e) => {
                warn!(error = %e, "Password prompt failed");
                guard.cancel();
            }
        }
    }
}
