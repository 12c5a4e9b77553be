//! Interface state shared by the bootstrap, the session guard and input
//! handlers.
//!
//! Input handlers must check [`UiController::is_blocked`] before acting. The
//! only input allowed through while blocked is the overlay's own form.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

/// Title of the session renewal overlay.
pub const SESSION_RENEWAL_TITLE: &str = "Renew Session";

/// Inline notice shown after a rejected renewal.
pub const INVALID_PASSWORD_NOTICE: &str = "invalid password entered";

/// Content displayed in the blocking overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayContent {
    /// Password form for renewing an expired session.
    SessionRenewal {
        /// Username the renewal will be submitted for.
        username: String,
        /// Whether the "invalid password" notice is visible.
        invalid_password: bool,
    },
    /// Free-form message card.
    Message { title: String, body: String },
}

impl OverlayContent {
    /// Renewal form with the notice hidden.
    #[must_use]
    pub fn session_renewal(username: impl Into<String>) -> Self {
        Self::SessionRenewal {
            username: username.into(),
            invalid_password: false,
        }
    }

    /// Same content with the "invalid password" notice shown.
    #[must_use]
    pub fn with_invalid_password(self) -> Self {
        match self {
            Self::SessionRenewal { username, .. } => Self::SessionRenewal {
                username,
                invalid_password: true,
            },
            other => other,
        }
    }

    /// Card title.
    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::SessionRenewal { .. } => SESSION_RENEWAL_TITLE,
            Self::Message { title, .. } => title,
        }
    }
}

/// What a pointer action on the canvas currently does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InterfaceAction {
    #[default]
    DoNothing,
    AddAnnotation,
    RemoveAnnotations,
}

/// Render target for interface-level state.
pub trait Surface: Send + Sync {
    /// Show the overlay card, or hide it when `None`.
    fn render_overlay(&self, content: Option<&OverlayContent>);

    /// Show the logged-in username in the navigation area.
    fn render_user(&self, username: &str);
}

/// Hard navigation away from the interface.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

#[derive(Debug, Default)]
struct UiState {
    held: bool,
    overlay: Option<OverlayContent>,
    displayed_user: Option<String>,
    action: InterfaceAction,
}

/// Owner of the interface-blocked flag and the overlay.
///
/// Two things block input: the bootstrap hold, set when initialization
/// starts and released by [`UiController::reveal`], and an open overlay.
/// Clearing the overlay never releases the bootstrap hold.
pub struct UiController {
    surface: Arc<dyn Surface>,
    state: Mutex<UiState>,
}

impl UiController {
    #[must_use]
    pub fn new(surface: Arc<dyn Surface>) -> Self {
        Self {
            surface,
            state: Mutex::new(UiState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, UiState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether input handlers must ignore input.
    pub fn is_blocked(&self) -> bool {
        let state = self.state();
        state.held || state.overlay.is_some()
    }

    /// Whether the bootstrap hold is still in place.
    pub fn is_held(&self) -> bool {
        self.state().held
    }

    /// Block input until [`UiController::reveal`] is called.
    pub fn hold(&self) {
        debug!("Interface held");
        self.state().held = true;
    }

    /// Release the bootstrap hold.
    pub fn reveal(&self) {
        debug!("Interface revealed");
        self.state().held = false;
    }

    /// Handle that releases the bootstrap hold when invoked.
    #[must_use]
    pub fn reveal_handle(self: &Arc<Self>) -> RevealHandle {
        RevealHandle {
            ui: Arc::clone(self),
        }
    }

    /// Display overlay content and block input, or clear it with `None`.
    pub fn show_overlay(&self, content: Option<OverlayContent>) {
        {
            let mut state = self.state();
            if state.overlay.is_none() && content.is_none() {
                return;
            }
            state.overlay.clone_from(&content);
        }
        debug!(visible = content.is_some(), "Overlay updated");
        self.surface.render_overlay(content.as_ref());
    }

    /// Content currently shown in the overlay.
    pub fn overlay(&self) -> Option<OverlayContent> {
        self.state().overlay.clone()
    }

    /// Set the username shown in the navigation area.
    pub fn set_displayed_user(&self, username: &str) {
        self.state().displayed_user = Some(username.to_string());
        self.surface.render_user(username);
    }

    /// Username last shown in the navigation area.
    pub fn displayed_user(&self) -> Option<String> {
        self.state().displayed_user.clone()
    }

    pub fn action(&self) -> InterfaceAction {
        self.state().action
    }

    pub fn set_action(&self, action: InterfaceAction) {
        self.state().action = action;
    }
}

/// Releases the bootstrap hold; handed to the tutorial so that its
/// dismissal unblocks the interface.
#[derive(Clone)]
pub struct RevealHandle {
    ui: Arc<UiController>,
}

impl RevealHandle {
    pub fn reveal(&self) {
        self.ui.reveal();
    }
}
