//! HTTP implementations of the configuration loader and the data handler.
//!
//! Both go through [`SessionGuard::run_authenticated`], so a request refused
//! because the session expired opens the renewal prompt and is retried once
//! the session is renewed.

use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{join_url, ClientConfig, ProjectConfiguration};
use crate::error::RemoteError;
use crate::pipeline::{ConfigurationLoader, DataHandler, DataHandlerFactory};
use crate::session::SessionGuard;

/// Project settings endpoint.
pub const PROJECT_SETTINGS_PATH: &str = "/getProjectSettings";

/// Batch endpoint.
pub const LATEST_IMAGES_PATH: &str = "/getLatestImages";

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
    let status = response.status();
    if !status.is_success() {
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".into());
        return Err(RemoteError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

/// Loads the project configuration from `GET /getProjectSettings`.
pub struct HttpConfigLoader {
    client: Client,
    server_url: String,
    guard: Arc<SessionGuard>,
}

impl HttpConfigLoader {
    #[must_use]
    pub fn new(client: Client, server_url: &str, guard: Arc<SessionGuard>) -> Self {
        Self {
            client,
            server_url: server_url.trim_end_matches('/').to_string(),
            guard,
        }
    }

    /// Fetch the project settings.
    pub async fn fetch(&self) -> Result<ProjectConfiguration, RemoteError> {
        let url = join_url(&self.server_url, PROJECT_SETTINGS_PATH);
        let (client, url) = (&self.client, url.as_str());
        self.guard
            .run_authenticated(|| async move {
                debug!(url = %url, "GET project settings");
                let response = client.get(url).send().await?;
                decode(response).await
            })
            .await
    }
}

#[async_trait]
impl ConfigurationLoader for HttpConfigLoader {
    async fn load_configuration(&self) -> Result<ProjectConfiguration> {
        Ok(self.fetch().await?)
    }
}

#[derive(Debug, Serialize)]
struct BatchRequest {
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    #[serde(default)]
    entries: IndexMap<String, serde_json::Value>,
}

/// Requests batches of entries from `POST /getLatestImages`.
pub struct HttpDataHandler {
    client: Client,
    server_url: String,
    batch_size: usize,
    guard: Arc<SessionGuard>,
    entries: Mutex<Vec<String>>,
}

impl HttpDataHandler {
    #[must_use]
    pub fn new(
        client: Client,
        server_url: &str,
        batch_size: usize,
        guard: Arc<SessionGuard>,
    ) -> Self {
        Self {
            client,
            server_url: server_url.trim_end_matches('/').to_string(),
            batch_size,
            guard,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Ids of the entries in the current batch, in server order.
    pub fn entry_ids(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Fetch the next batch and replace the current entries.
    pub async fn fetch_batch(&self) -> Result<usize, RemoteError> {
        let url = join_url(&self.server_url, LATEST_IMAGES_PATH);
        let request = BatchRequest {
            limit: self.batch_size,
        };
        let (client, url, request) = (&self.client, url.as_str(), &request);

        let batch: BatchResponse = self
            .guard
            .run_authenticated(|| async move {
                debug!(url = %url, limit = request.limit, "POST batch request");
                let response = client.post(url).json(request).send().await?;
                decode(response).await
            })
            .await?;

        let ids: Vec<String> = batch.entries.into_keys().collect();
        let count = ids.len();
        *self.entries.lock().unwrap_or_else(PoisonError::into_inner) = ids;
        Ok(count)
    }
}

#[async_trait]
impl DataHandler for HttpDataHandler {
    async fn load_next_batch(&self) -> Result<usize> {
        Ok(self.fetch_batch().await?)
    }
}

/// Builds an [`HttpDataHandler`] sharing the session client.
pub struct HttpDataHandlerFactory {
    client: Client,
    server_url: String,
    batch_size: usize,
    guard: Arc<SessionGuard>,
}

impl HttpDataHandlerFactory {
    #[must_use]
    pub fn new(client: Client, config: &ClientConfig, guard: Arc<SessionGuard>) -> Self {
        Self {
            client,
            server_url: config.server_url.clone(),
            batch_size: config.batch_size,
            guard,
        }
    }
}

impl DataHandlerFactory for HttpDataHandlerFactory {
    fn create(&self, configuration: &ProjectConfiguration) -> Result<Arc<dyn DataHandler>> {
        debug!(project = %configuration.project_name, "Creating data handler");
        Ok(Arc::new(HttpDataHandler::new(
            self.client.clone(),
            &self.server_url,
            self.batch_size,
            Arc::clone(&self.guard),
        )))
    }
}
