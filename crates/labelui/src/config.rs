//! Client and project configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::registry::ClassCatalogue;

/// Default labeling server.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";

/// Default timeout for HTTP requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of entries requested per batch.
pub const DEFAULT_BATCH_SIZE: usize = 12;

/// Default unauthenticated landing view.
pub const DEFAULT_LANDING_PATH: &str = "/";

/// Connection settings for the labeling client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the labeling server, without trailing slash.
    pub server_url: String,
    /// Username shown in the interface; used for session renewal.
    pub username: Option<String>,
    /// Timeout applied to every HTTP request.
    pub timeout: Duration,
    /// Entries requested per data batch.
    pub batch_size: usize,
    /// Path of the unauthenticated landing view.
    pub landing_path: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            username: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            batch_size: DEFAULT_BATCH_SIZE,
            landing_path: DEFAULT_LANDING_PATH.to_string(),
        }
    }
}

impl ClientConfig {
    /// Create configuration from environment variables.
    ///
    /// # Optional Environment Variables
    /// - `LABELUI_SERVER_URL`: Server base URL (default: http://localhost:8080)
    /// - `LABELUI_USERNAME`: Displayed username
    /// - `LABELUI_TIMEOUT_SECS`: Request timeout (default: 30)
    /// - `LABELUI_BATCH_SIZE`: Entries per batch (default: 12)
    /// - `LABELUI_LANDING_PATH`: Landing view path (default: /)
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let server_url = lookup("LABELUI_SERVER_URL")
            .filter(|v| !v.trim().is_empty())
            .map_or(defaults.server_url, |v| normalize_url(&v));

        let username = lookup("LABELUI_USERNAME").filter(|v| !v.trim().is_empty());

        let timeout = lookup("LABELUI_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .map_or(defaults.timeout, Duration::from_secs);

        let batch_size = lookup("LABELUI_BATCH_SIZE")
            .and_then(|v| v.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.batch_size);

        let landing_path = lookup("LABELUI_LANDING_PATH")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.landing_path);

        Self {
            server_url,
            username,
            timeout,
            batch_size,
            landing_path,
        }
    }

    /// Override the server URL.
    #[must_use]
    pub fn with_server_url(mut self, url: &str) -> Self {
        self.server_url = normalize_url(url);
        self
    }

    /// Override the displayed username.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Full URL of a server endpoint.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        join_url(&self.server_url, path)
    }

    /// Build the shared HTTP client.
    ///
    /// The cookie store carries the session cookie between the auth,
    /// configuration and data endpoints.
    pub fn http_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .cookie_store(true)
            .timeout(self.timeout)
            .build()
    }
}

/// Project settings delivered by the configuration loader.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfiguration {
    /// Display name of the project.
    #[serde(default)]
    pub project_name: String,
    /// Optional project description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_description: Option<String>,
    /// Label classes in server order.
    #[serde(default)]
    pub classes: ClassCatalogue,
    /// Remaining settings, passed through untouched.
    #[serde(flatten)]
    pub settings: serde_json::Map<String, serde_json::Value>,
}

pub(crate) fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ClientConfig::from_lookup(|_| None);
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.endpoint("/loginCheck"), "http://localhost:8080/loginCheck");
    }

    #[test]
    fn test_overrides_from_lookup() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("LABELUI_SERVER_URL", "https://label.example.org/project/"),
            ("LABELUI_USERNAME", "alice"),
            ("LABELUI_TIMEOUT_SECS", "5"),
            ("LABELUI_BATCH_SIZE", "40"),
            ("LABELUI_LANDING_PATH", "/welcome"),
        ]));

        assert_eq!(config.server_url, "https://label.example.org/project");
        assert_eq!(config.username.as_deref(), Some("alice"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.batch_size, 40);
        assert_eq!(config.landing_path, "/welcome");
        assert_eq!(
            config.endpoint("login"),
            "https://label.example.org/project/login"
        );
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("LABELUI_TIMEOUT_SECS", "soon"),
            ("LABELUI_BATCH_SIZE", "0"),
            ("LABELUI_USERNAME", "  "),
        ]));

        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert!(config.username.is_none());
    }

    #[test]
    fn test_project_configuration_keeps_class_order() {
        let json = r##"{
            "projectName": "Wildlife",
            "classes": {
                "zebra": {"name": "Zebra"},
                "antelope": {"name": "Antelope", "color": "#aa0000"},
                "buffalo": {}
            },
            "minObjSize": 20
        }"##;

        let config: ProjectConfiguration = serde_json::from_str(json).unwrap();
        let ids: Vec<&str> = config.classes.keys().map(String::as_str).collect();

        assert_eq!(config.project_name, "Wildlife");
        assert_eq!(ids, vec!["zebra", "antelope", "buffalo"]);
        assert_eq!(config.settings.get("minObjSize"), Some(&serde_json::json!(20)));
    }
}
