//! Client configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default API endpoint of a locally running server.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for connecting to a versioned data-store server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base API URL, e.g. `http://host:8000/api`.
    pub api_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: format!("dvid-client/{}", crate::VERSION),
        }
    }
}

impl ClientConfig {
    /// Loads configuration from a YAML file. Missing fields take their
    /// default values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or parsed.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        let config: Self = serde_yaml::from_str(&contents)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), api_url = %config.api_url, "Loaded client configuration");
        Ok(config)
    }

    /// Overrides the API URL.
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Returns the request timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.user_agent.starts_with("dvid-client/"));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api_url: http://emdata:7000/api").unwrap();

        let config = ClientConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.api_url, "http://emdata:7000/api");
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_override_wins_over_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api_url: http://from-file/api\ntimeout_secs: 5").unwrap();

        let config = ClientConfig::from_yaml_file(file.path())
            .unwrap()
            .with_api_url("http://from-flag/api");
        assert_eq!(config.api_url, "http://from-flag/api");
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = ClientConfig::from_yaml_file("/nonexistent/dvid.yaml").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
