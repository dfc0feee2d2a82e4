//! # Wire Types
//!
//! Request and response bodies exchanged with the server.

use serde::{Deserialize, Serialize};

use crate::uuid::uuids_equivalent;

/// Request to create a new repository.
#[derive(Debug, Clone, Serialize)]
pub struct CreateRepoRequest {
    /// Human-readable repository alias.
    pub alias: String,
    /// Free-form description.
    pub description: String,
}

/// Response after creating a repository.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRepoResponse {
    /// Uuid of the new repository (and of its root node).
    #[serde(alias = "Root", alias = "uuid")]
    pub root: String,
}

/// Request to create a dataset instance.
#[derive(Debug, Clone, Serialize)]
pub struct CreateInstanceRequest {
    /// Dataset name.
    pub dataname: String,
    /// Dataset type name.
    pub typename: String,
    /// Comma-joined names of datasets to sync with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<String>,
}

impl CreateInstanceRequest {
    /// Builds a creation payload, omitting `sync` when the list is empty.
    #[must_use]
    pub fn new(name: &str, type_name: &str, sync: &[impl AsRef<str>]) -> Self {
        let sync = if sync.is_empty() {
            None
        } else {
            Some(
                sync.iter()
                    .map(AsRef::as_ref)
                    .collect::<Vec<_>>()
                    .join(","),
            )
        };
        Self {
            dataname: name.to_string(),
            typename: type_name.to_string(),
            sync,
        }
    }
}

/// Request to commit (lock) a node.
#[derive(Debug, Clone, Serialize)]
pub struct CommitRequest {
    /// Commit note.
    pub note: String,
    /// Commit log lines.
    pub log: Vec<String>,
}

/// Request to branch off a node.
#[derive(Debug, Clone, Serialize)]
pub struct BranchRequest {
    /// Branch note.
    pub note: String,
}

/// Response after branching.
#[derive(Debug, Clone, Deserialize)]
pub struct BranchResponse {
    /// Uuid of the new child node.
    pub child: String,
}

/// Summary of one repository as listed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepositorySummary {
    /// Repository uuid.
    #[serde(rename = "Root", default)]
    pub uuid: String,
    /// Repository alias.
    #[serde(rename = "Alias", default)]
    pub alias: String,
    /// Repository description.
    #[serde(rename = "Description", default)]
    pub description: String,
}

/// Repository metadata including its version graph.
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryInfo {
    /// Root node uuid.
    #[serde(rename = "Root", default)]
    pub root: String,
    /// Repository alias.
    #[serde(rename = "Alias", default)]
    pub alias: String,
    /// Repository description.
    #[serde(rename = "Description", default)]
    pub description: String,
    /// The version graph.
    #[serde(rename = "DAG", default)]
    pub dag: VersionDag,
}

/// The version graph of a repository.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VersionDag {
    /// Nodes keyed by uuid.
    #[serde(rename = "Nodes", default)]
    pub nodes: std::collections::BTreeMap<String, NodeInfo>,
}

/// One node of the version graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NodeInfo {
    /// Full node uuid.
    #[serde(rename = "UUID", default)]
    pub uuid: String,
    /// Server-local version id, referenced by `parents` and `children`.
    #[serde(rename = "VersionID", default)]
    pub version_id: u32,
    /// Whether the node has been committed.
    #[serde(rename = "Locked", default)]
    pub locked: bool,
    /// Version ids of parent nodes.
    #[serde(rename = "Parents", default)]
    pub parents: Vec<u32>,
    /// Version ids of child nodes.
    #[serde(rename = "Children", default)]
    pub children: Vec<u32>,
    /// Commit or branch note.
    #[serde(rename = "Note", default)]
    pub note: String,
}

impl RepositoryInfo {
    /// Finds the node matching a possibly abbreviated uuid.
    ///
    /// Returns `None` if no node matches or the abbreviation is ambiguous.
    #[must_use]
    pub fn find_node(&self, uuid: &str) -> Option<&NodeInfo> {
        let mut matches = self
            .dag
            .nodes
            .iter()
            .filter(|(key, node)| {
                let full = if node.uuid.is_empty() { key.as_str() } else { node.uuid.as_str() };
                uuids_equivalent(full, uuid)
            })
            .map(|(_, node)| node);
        let first = matches.next()?;
        if matches.next().is_some() {
            return None;
        }
        Some(first)
    }

    /// Finds the node with the given version id, returning its uuid.
    #[must_use]
    pub fn uuid_of_version(&self, version_id: u32) -> Option<&str> {
        self.dag
            .nodes
            .iter()
            .find(|(_, node)| node.version_id == version_id)
            .map(|(key, node)| if node.uuid.is_empty() { key.as_str() } else { node.uuid.as_str() })
    }
}
