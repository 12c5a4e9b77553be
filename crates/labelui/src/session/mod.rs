//! Session verification and renewal.
//!
//! [`SessionGuard`] wraps authenticated calls. When the server reports that
//! the session is gone, the guard blocks the interface with a renewal form,
//! keeps the interrupted action as a pending continuation and resumes it
//! once the user has re-entered their password.

mod auth;
mod guard;

pub use auth::{AuthApi, HttpAuthApi, LOGIN_CHECK_PATH, LOGIN_PATH};
pub use guard::{SessionGuard, SessionPhase, VerifyOutcome};
