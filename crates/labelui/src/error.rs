//! Error types for the labeling client.

use thiserror::Error;

/// Errors returned by the authentication endpoints.
#[derive(Debug, Error)]
pub enum AuthError {
    /// HTTP request failed before a status was received.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("Authentication rejected with status {status}")]
    Rejected { status: u16 },
}

/// Errors surfaced by the session guard.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No valid session exists at all; the client was sent to the landing view.
    #[error("Authentication required")]
    AuthRequired,

    /// The renewal submission was rejected.
    #[error("invalid password entered")]
    InvalidCredentials,

    /// The user cancelled session renewal; the client was sent to the landing view.
    #[error("Session renewal aborted")]
    Aborted,

    /// Credentials were submitted while no renewal prompt was open.
    #[error("No session renewal prompt is open")]
    NoPendingPrompt,
}

/// A class id that is not part of the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown label class: {id}")]
pub struct UnknownClassError {
    /// The id that was looked up.
    pub id: String,
}

/// Errors raised while building the label-class registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Two classes claim the same digit shortcut.
    #[error("Shortcut index {index} claimed by both '{first}' and '{second}'")]
    DuplicateShortcut {
        index: u32,
        first: String,
        second: String,
    },
}

/// Errors returned by the remote configuration and data endpoints.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response body could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Session renewal did not complete.
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Errors that may mean the session has expired.
pub trait AuthFailure {
    /// Whether the server refused the request because the session is gone.
    fn is_auth_failure(&self) -> bool;
}

impl AuthFailure for RemoteError {
    fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Api { status: 401 | 403, .. })
    }
}

/// Errors that stop the initialization pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The initial session check failed; the client was redirected.
    #[error("Authentication required")]
    AuthRequired,

    /// Session renewal was cancelled while a step was running.
    #[error("Session renewal aborted")]
    Aborted,

    /// A step failed; no later step ran.
    #[error("Initialization step '{step}' failed: {source}")]
    Step {
        step: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// The pipeline finished without producing a required component.
    #[error("Initialization finished without {0}")]
    Incomplete(&'static str),
}
