//! # Server
//!
//! Handle to one remote service instance, identified by its API base URL.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::repository::Repository;
use crate::transport::Transport;
use crate::types::{CreateRepoRequest, CreateRepoResponse, RepositorySummary};

/// A remote versioned data-store server.
///
/// Immutable after construction and cheaply cloneable; every
/// [`Repository`], [`Node`](crate::Node) and dataset handle derived from it
/// shares the same instance.
///
/// # Examples
///
/// ```rust,ignore
/// use dvid_client::Server;
///
/// let server = Server::new("http://emdata:8000/api")?;
/// let repo = server.create_repository("fib25", "seven column medulla").await?;
/// let root = repo.root_node();
/// ```
#[derive(Debug, Clone)]
pub struct Server {
    inner: Arc<ServerInner>,
}

#[derive(Debug)]
struct ServerInner {
    api_url: String,
    transport: Transport,
}

impl Server {
    /// Creates a server handle with default transport settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the HTTP client cannot be built.
    pub fn new(api_url: impl Into<String>) -> Result<Self> {
        let config = ClientConfig::default().with_api_url(api_url);
        Self::with_config(&config)
    }

    /// Creates a server handle from a [`ClientConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the HTTP client cannot be built.
    pub fn with_config(config: &ClientConfig) -> Result<Self> {
        let transport = Transport::from_config(config)?;
        Ok(Self::with_transport(config.api_url.clone(), transport))
    }

    /// Creates a server handle over an existing transport.
    #[must_use]
    pub fn with_transport(api_url: impl Into<String>, transport: Transport) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self {
            inner: Arc::new(ServerInner { api_url, transport }),
        }
    }

    /// Returns the API base URL.
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.inner.api_url
    }

    pub(crate) fn transport(&self) -> &Transport {
        &self.inner.transport
    }

    /// Creates a new repository and returns a handle bound to the
    /// server-assigned uuid.
    ///
    /// # Errors
    ///
    /// * [`Error::MalformedInput`] - empty alias
    /// * [`Error::Remote`] - the server rejected the repository
    /// * [`Error::Transport`] - the server could not be reached
    pub async fn create_repository(&self, alias: &str, description: &str) -> Result<Repository> {
        if alias.trim().is_empty() {
            return Err(Error::malformed("alias", "cannot be empty"));
        }
        let request = CreateRepoRequest {
            alias: alias.to_string(),
            description: description.to_string(),
        };
        let url = format!("{}/repo", self.api_url());
        let response: CreateRepoResponse = self.transport().post_json(&url, &request).await?;
        if response.root.is_empty() {
            return Err(Error::InvalidResponse("repository uuid is empty".to_string()));
        }
        tracing::info!(%alias, uuid = %response.root, "Created repository");
        Ok(Repository::new(self.clone(), response.root))
    }

    /// Lists the repositories hosted by the server, sorted by uuid.
    ///
    /// # Errors
    ///
    /// See [`Server::create_repository`]; additionally
    /// [`Error::InvalidResponse`] for an unexpected body.
    pub async fn list_repositories(&self) -> Result<Vec<RepositorySummary>> {
        let url = format!("{}/repos/info", self.api_url());
        let repos: BTreeMap<String, RepositorySummary> = self.transport().get_json(&url).await?;
        Ok(repos
            .into_iter()
            .map(|(uuid, mut summary)| {
                if summary.uuid.is_empty() {
                    summary.uuid = uuid;
                }
                summary
            })
            .collect())
    }

    /// Opens an existing repository by uuid. No request is issued.
    #[must_use]
    pub fn open_repository(&self, uuid: impl Into<String>) -> Repository {
        Repository::new(self.clone(), uuid.into())
    }

    /// Lists the dataset type names the server supports.
    ///
    /// # Errors
    ///
    /// See [`Server::list_repositories`].
    pub async fn server_types(&self) -> Result<Vec<String>> {
        let url = format!("{}/server/types", self.api_url());
        let types: BTreeMap<String, serde_json::Value> = self.transport().get_json(&url).await?;
        Ok(types.into_keys().collect())
    }
}
