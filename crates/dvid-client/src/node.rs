//! # Node
//!
//! A commit/checkout in a repository's version graph.
//!
//! Nodes are created by [`Node::branch`] and locked by [`Node::commit`].
//! Datasets live at the repository level; a node is the point through
//! which they are created, deleted and accessed.
//!
//! Commit status is never cached locally: operations against a committed
//! node are sent as-is and the server decides whether to reject them.

use std::collections::HashSet;

use crate::dataset::{validate_name, DataInstance, DatasetHandle};
use crate::error::{Error, Result};
use crate::repository::Repository;
use crate::transport::Transport;
use crate::types::{BranchRequest, BranchResponse, CommitRequest, CreateInstanceRequest};

/// A node of a repository's version graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    uuid: String,
    repository: Repository,
}

/// Result of a parent lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parent {
    /// The node's first parent.
    Node(Node),
    /// The node has no parents.
    Root,
    /// The node does not appear in the repository's version graph, or its
    /// uuid abbreviation is ambiguous.
    Unknown,
}

impl Node {
    /// Creates a node handle. No request is issued.
    #[must_use]
    pub fn new(uuid: impl Into<String>, repository: Repository) -> Self {
        Self {
            uuid: uuid.into(),
            repository,
        }
    }

    /// Returns the node uuid.
    #[must_use]
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// Returns the owning repository.
    #[must_use]
    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Base URL of the node endpoints, `{api}/node/{uuid}`.
    #[must_use]
    pub fn url(&self) -> String {
        format!("{}/node/{}", self.repository.server().api_url(), self.uuid)
    }

    fn transport(&self) -> &Transport {
        self.repository.server().transport()
    }

    /// Commits the node. No further changes are accepted by the server on a
    /// committed node; branch to continue.
    ///
    /// # Errors
    ///
    /// * [`Error::Remote`] - already committed or invalid note
    /// * [`Error::Transport`] - server unreachable
    pub async fn commit(&self, note: &str, log: &[impl AsRef<str>]) -> Result<()> {
        let request = CommitRequest {
            note: note.to_string(),
            log: log.iter().map(|l| l.as_ref().to_string()).collect(),
        };
        let url = format!("{}/commit", self.url());
        self.transport().post_json_discard(&url, &request).await?;
        tracing::info!(uuid = %self.uuid, %note, "Committed node");
        Ok(())
    }

    /// Creates a child node and returns it. The child belongs to the same
    /// repository.
    ///
    /// # Errors
    ///
    /// * [`Error::Remote`] / [`Error::Transport`] - request failed
    /// * [`Error::InvalidResponse`] - response lacks a `child` uuid
    pub async fn branch(&self, note: &str) -> Result<Node> {
        let request = BranchRequest {
            note: note.to_string(),
        };
        let url = format!("{}/branch", self.url());
        let response: BranchResponse = self.transport().post_json(&url, &request).await?;
        if response.child.is_empty() {
            return Err(Error::InvalidResponse("child uuid is empty".to_string()));
        }
        tracing::info!(parent = %self.uuid, child = %response.child, "Branched node");
        Ok(Node::new(response.child, self.repository.clone()))
    }

    /// Creates a dataset and returns the handle matching its type.
    ///
    /// Known type names (any casing) yield their dedicated handle; any other
    /// type name yields [`DatasetHandle::Generic`].
    ///
    /// # Errors
    ///
    /// * [`Error::MalformedInput`] - invalid dataset or sync name; nothing is sent
    /// * [`Error::Remote`] - name collision or type unknown to the server
    /// * [`Error::Transport`] - server unreachable
    pub async fn create_dataset(
        &self,
        name: &str,
        type_name: &str,
        sync: &[impl AsRef<str>],
    ) -> Result<DatasetHandle> {
        validate_name(name)?;
        for other in sync {
            validate_name(other.as_ref())?;
        }
        let request = CreateInstanceRequest::new(name, type_name, sync);
        let url = format!("{}/instance", self.repository.url());
        self.transport().post_json_discard(&url, &request).await?;
        tracing::info!(
            repo = %self.repository.uuid(),
            %name,
            %type_name,
            sync = request.sync.as_deref().unwrap_or(""),
            "Created dataset"
        );
        Ok(DatasetHandle::instantiate(self.clone(), name, type_name))
    }

    /// Creates datasets that are all synced with each other.
    ///
    /// Each dataset's sync list names every other dataset of the group.
    /// Names are validated up front; creation then runs strictly in input
    /// order and stops at the first failure. Datasets created before the
    /// failure are not removed and reference the whole intended group.
    ///
    /// # Errors
    ///
    /// * [`Error::MalformedInput`] - fewer than two datasets, duplicate or
    ///   invalid names; nothing is sent
    /// * [`Error::PartialSyncGroup`] - a creation failed after at least one
    ///   dataset was created
    /// * the error of the first creation, unchanged, if it fails
    pub async fn create_mutually_synced_datasets(
        &self,
        names_and_types: &[(impl AsRef<str>, impl AsRef<str>)],
    ) -> Result<Vec<DatasetHandle>> {
        if names_and_types.len() < 2 {
            return Err(Error::malformed(
                "datasets",
                "a sync group needs at least two datasets",
            ));
        }
        let mut seen = HashSet::new();
        for (name, _) in names_and_types {
            let name = name.as_ref();
            validate_name(name)?;
            if !seen.insert(name) {
                return Err(Error::malformed(
                    "datasets",
                    format!("duplicate dataset name '{name}'"),
                ));
            }
        }

        let mut datasets = Vec::with_capacity(names_and_types.len());
        for (i, (name, type_name)) in names_and_types.iter().enumerate() {
            let sync = sync_list(names_and_types, i);
            match self
                .create_dataset(name.as_ref(), type_name.as_ref(), &sync[..])
                .await
            {
                Ok(dataset) => datasets.push(dataset),
                Err(e) if datasets.is_empty() => return Err(e),
                Err(e) => {
                    let created: Vec<String> =
                        datasets.iter().map(|d| d.name().to_string()).collect();
                    tracing::warn!(
                        failed = %name.as_ref(),
                        ?created,
                        error = %e,
                        "Sync group partially created"
                    );
                    return Err(Error::PartialSyncGroup {
                        created,
                        failed: name.as_ref().to_string(),
                        source: Box::new(e),
                    });
                }
            }
        }
        Ok(datasets)
    }

    /// Deletes a dataset by name and returns the raw status code.
    ///
    /// Non-2xx statuses are returned, not raised; a second delete of the
    /// same name simply returns whatever the server answers.
    ///
    /// # Errors
    ///
    /// * [`Error::MalformedInput`] - empty name, or a name containing `/`,
    ///   `?` or `#`; nothing is sent
    /// * [`Error::Transport`] - no response was received
    pub async fn delete_dataset(&self, name: &str) -> Result<u16> {
        if name.is_empty() {
            return Err(Error::malformed("dataname", "cannot be empty"));
        }
        if let Some(c) = name.chars().find(|c| matches!(c, '/' | '?' | '#')) {
            return Err(Error::malformed(
                "dataname",
                format!("'{name}' contains invalid character {c:?}"),
            ));
        }
        let url = format!("{}/{name}?imsure=true", self.repository.url());
        let status = self.transport().delete_status(&url).await?;
        if (200..300).contains(&status) {
            tracing::info!(repo = %self.repository.uuid(), %name, status, "Deleted dataset");
        } else {
            tracing::warn!(repo = %self.repository.uuid(), %name, status, "Dataset delete not accepted");
        }
        Ok(status)
    }

    /// Deletes the dataset behind a handle. See [`Node::delete_dataset`].
    ///
    /// # Errors
    ///
    /// See [`Node::delete_dataset`].
    pub async fn delete_dataset_handle(&self, dataset: &impl DataInstance) -> Result<u16> {
        self.delete_dataset(dataset.name()).await
    }

    /// Resolves the node's parent from the repository's version graph.
    ///
    /// # Errors
    ///
    /// Errors from fetching repository metadata.
    pub async fn parent(&self) -> Result<Parent> {
        let info = self.repository.info().await?;
        let Some(node) = info.find_node(&self.uuid) else {
            return Ok(Parent::Unknown);
        };
        let Some(&parent_version) = node.parents.first() else {
            return Ok(Parent::Root);
        };
        Ok(match info.uuid_of_version(parent_version) {
            Some(uuid) => Parent::Node(Node::new(uuid, self.repository.clone())),
            None => Parent::Unknown,
        })
    }

    /// Reports whether the server considers this node committed.
    ///
    /// Returns `None` if the node is not in the version graph.
    ///
    /// # Errors
    ///
    /// Errors from fetching repository metadata.
    pub async fn is_locked(&self) -> Result<Option<bool>> {
        let info = self.repository.info().await?;
        Ok(info.find_node(&self.uuid).map(|node| node.locked))
    }
}

/// Names of every dataset except the one at `index`, in input order.
fn sync_list(names_and_types: &[(impl AsRef<str>, impl AsRef<str>)], index: usize) -> Vec<&str> {
    names_and_types
        .iter()
        .enumerate()
        .filter(|&(k, _)| k != index)
        .map(|(_, (name, _))| name.as_ref())
        .collect()
}
