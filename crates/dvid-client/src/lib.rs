//! # DVID Client
//!
//! Client for versioned data-store services that expose repositories,
//! a version graph of nodes per repository, and typed datasets reachable
//! through those nodes.
//!
//! ## Features
//!
//! - [`Server`] and [`Repository`] handles, repository creation and listing
//! - [`Node`] commit, branch and parent lookup over the version graph
//! - Dataset creation and deletion, including mutually synced groups
//! - Total, case-insensitive dispatch of dataset type names to typed
//!   handles ([`KeyValue`], [`LabelBlk`], [`Uint8Blk`], [`Rgba8Blk`],
//!   [`LabelVol`]) with an identity-only fallback ([`Dataset`])
//! - Prefix-based uuid comparison ([`compare_uuids`], [`uuids_equivalent`])
//!
//! ## Example
//!
//! ```rust,ignore
//! use dvid_client::{DataInstance, Server};
//!
//! #[tokio::main]
//! async fn main() -> dvid_client::Result<()> {
//!     let server = Server::new("http://127.0.0.1:8000/api")?;
//!     let repo = server.create_repository("fib", "fly brain").await?;
//!     let root = repo.root_node();
//!
//!     let bodies = root.create_dataset("bodies", "labelvol", &[] as &[&str]).await?;
//!     assert!(bodies.as_label_vol().is_some());
//!
//!     let status = root.delete_dataset(bodies.name()).await?;
//!     assert!((200..300).contains(&status));
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod dataset;
pub mod error;
pub mod node;
pub mod repository;
pub mod server;
pub mod transport;
pub mod types;
pub mod uuid;

pub use config::ClientConfig;
pub use dataset::{
    BlockVolume, DataInstance, Dataset, DatasetHandle, DatasetKind, KeyValue, LabelBlk, LabelVol,
    Rgba8Blk, SparseVolume, Subvolume, Uint8Blk,
};
pub use error::{Error, Result};
pub use node::{Node, Parent};
pub use repository::Repository;
pub use server::Server;
pub use transport::{Method, Transport};
pub use types::{NodeInfo, RepositoryInfo, RepositorySummary};
pub use uuid::{compare_uuids, uuids_equivalent};

/// Version of the client library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
