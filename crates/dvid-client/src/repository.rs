//! # Repository
//!
//! One version-graph namespace on a [`Server`].

use crate::error::Result;
use crate::node::Node;
use crate::server::Server;
use crate::types::RepositoryInfo;

/// A repository, identified by its server-assigned uuid.
///
/// Two handles are equal when they point at the same server URL and carry
/// the same uuid.
#[derive(Debug, Clone)]
pub struct Repository {
    server: Server,
    uuid: String,
}

impl PartialEq for Repository {
    fn eq(&self, other: &Self) -> bool {
        self.server.api_url() == other.server.api_url() && self.uuid == other.uuid
    }
}

impl Eq for Repository {}

impl Repository {
    pub(crate) fn new(server: Server, uuid: String) -> Self {
        Self { server, uuid }
    }

    /// Returns the repository uuid.
    #[must_use]
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// Returns the owning server.
    #[must_use]
    pub fn server(&self) -> &Server {
        &self.server
    }

    /// Returns the root node. The root node uuid is the repository uuid, so
    /// no request is issued.
    #[must_use]
    pub fn root_node(&self) -> Node {
        Node::new(self.uuid.clone(), self.clone())
    }

    /// Returns a handle for an existing node of this repository. No request
    /// is issued; the uuid may be abbreviated.
    #[must_use]
    pub fn node(&self, uuid: impl Into<String>) -> Node {
        Node::new(uuid.into(), self.clone())
    }

    /// Base URL of the repository endpoints, `{api}/repo/{uuid}`.
    #[must_use]
    pub fn url(&self) -> String {
        format!("{}/repo/{}", self.server.api_url(), self.uuid)
    }

    /// Fetches repository metadata, including the version graph.
    ///
    /// # Errors
    ///
    /// * [`Error::Remote`](crate::Error::Remote) - unknown repository
    /// * [`Error::Transport`](crate::Error::Transport) - server unreachable
    /// * [`Error::InvalidResponse`](crate::Error::InvalidResponse) - unexpected body
    pub async fn info(&self) -> Result<RepositoryInfo> {
        let url = format!("{}/info", self.url());
        self.server.transport().get_json(&url).await
    }

    /// Deletes the repository and every dataset in it, returning the raw
    /// status code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`](crate::Error::Transport) only if no
    /// response was received.
    pub async fn delete(&self) -> Result<u16> {
        let url = format!("{}?imsure=true", self.url());
        let status = self.server.transport().delete_status(&url).await?;
        tracing::info!(uuid = %self.uuid, status, "Deleted repository");
        Ok(status)
    }
}
