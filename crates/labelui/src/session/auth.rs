//! Authentication endpoints.

use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::debug;

use crate::config::{join_url, ClientConfig};
use crate::error::AuthError;

/// Session check endpoint; any success status means authenticated.
pub const LOGIN_CHECK_PATH: &str = "/loginCheck";

/// Credential submission endpoint.
pub const LOGIN_PATH: &str = "/login";

/// Remote authentication calls used by the session guard.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Check whether the current session is still valid.
    async fn login_check(&self) -> Result<(), AuthError>;

    /// Open a new session with the given credentials.
    async fn login(&self, username: &str, password: &str) -> Result<(), AuthError>;
}

/// [`AuthApi`] over HTTP.
///
/// Share the client with the other remote collaborators so the session
/// cookie set by `/login` is sent with their requests.
#[derive(Clone)]
pub struct HttpAuthApi {
    client: Client,
    server_url: String,
}

impl HttpAuthApi {
    #[must_use]
    pub fn new(client: Client, server_url: &str) -> Self {
        Self {
            client,
            server_url: server_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create from configuration with a fresh client.
    pub fn from_config(config: &ClientConfig) -> Result<Self, AuthError> {
        Ok(Self::new(config.http_client()?, &config.server_url))
    }

    fn check_status(response: &Response) -> Result<(), AuthError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(AuthError::Rejected {
                status: status.as_u16(),
            })
        }
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn login_check(&self) -> Result<(), AuthError> {
        let url = join_url(&self.server_url, LOGIN_CHECK_PATH);
        debug!(url = %url, "POST login check");

        let response = self.client.post(&url).send().await?;
        Self::check_status(&response)
    }

    async fn login(&self, username: &str, password: &str) -> Result<(), AuthError> {
        let url = join_url(&self.server_url, LOGIN_PATH);
        debug!(url = %url, username = %username, "POST login");

        let response = self
            .client
            .post(&url)
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;
        Self::check_status(&response)
    }
}
