//! # Datasets
//!
//! Typed handles for named storage instances.
//!
//! Every dataset exposes its identity through [`DataInstance`]. Known type
//! names are mapped by the registry to concrete handles that add
//! type-appropriate operations; unknown type names yield the identity-only
//! [`Dataset`]. Dispatch is total and case-insensitive.

mod block;
mod keyvalue;
mod labelvol;

pub use block::{BlockVolume, LabelBlk, Rgba8Blk, Subvolume, Uint8Blk};
pub use keyvalue::KeyValue;
pub use labelvol::{LabelVol, SparseVolume, SparseVolumeSize, Span};

use std::fmt;

use crate::error::{Error, Result};
use crate::node::Node;
use crate::transport::Transport;

/// Names that collide with repository-level endpoints.
pub const RESERVED_NAMES: &[&str] = &[
    "branch",
    "commit",
    "info",
    "instance",
    "lock",
    "log",
    "merge",
    "newversion",
    "note",
    "resolve",
    "status",
    "tag",
];

/// Identity shared by every dataset handle.
pub trait DataInstance {
    /// Dataset name.
    fn name(&self) -> &str;

    /// Dataset type name.
    fn type_name(&self) -> &str;

    /// Node through which the dataset is accessed.
    fn node(&self) -> &Node;

    /// Base URL of the dataset endpoints, `{nodeUrl}/{name}`.
    fn url(&self) -> String {
        format!("{}/{}", self.node().url(), self.name())
    }
}

/// Identity-only dataset handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    name: String,
    type_name: String,
    node: Node,
}

impl Dataset {
    /// Creates a handle for an existing dataset. No request is issued.
    #[must_use]
    pub fn new(node: Node, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            node,
        }
    }

    pub(crate) fn transport(&self) -> &Transport {
        self.node.repository().server().transport()
    }
}

impl DataInstance for Dataset {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn node(&self) -> &Node {
        &self.node
    }
}

/// Implements [`DataInstance`] for a handle wrapping a `base: Dataset`.
macro_rules! delegate_data_instance {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::dataset::DataInstance for $ty {
                fn name(&self) -> &str {
                    self.base.name()
                }

                fn type_name(&self) -> &str {
                    self.base.type_name()
                }

                fn node(&self) -> &$crate::node::Node {
                    self.base.node()
                }
            }
        )+
    };
}
pub(crate) use delegate_data_instance;

/// The dataset types the client knows how to drive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DatasetKind {
    /// Generic key-value blob store.
    KeyValue,
    /// Labeled block volume (64-bit labels).
    LabelBlk,
    /// Scalar block volume (8-bit grayscale).
    Uint8Blk,
    /// RGBA block volume.
    Rgba8Blk,
    /// Sparse label volume.
    LabelVol,
    /// Any other type; only identity operations are available.
    Other(String),
}

impl DatasetKind {
    /// Every kind with a dedicated handle.
    pub const KNOWN: [DatasetKind; 5] = [
        DatasetKind::KeyValue,
        DatasetKind::LabelBlk,
        DatasetKind::Uint8Blk,
        DatasetKind::Rgba8Blk,
        DatasetKind::LabelVol,
    ];

    /// Maps a type name to a kind, ignoring case. Matches the canonical
    /// name and every alias. Never fails.
    #[must_use]
    pub fn from_type_name(type_name: &str) -> Self {
        Self::KNOWN
            .into_iter()
            .find(|kind| {
                kind.type_name().eq_ignore_ascii_case(type_name)
                    || kind
                        .aliases()
                        .iter()
                        .any(|alias| alias.eq_ignore_ascii_case(type_name))
            })
            .unwrap_or_else(|| DatasetKind::Other(type_name.to_string()))
    }

    /// Alternate type names accepted for this kind.
    #[must_use]
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            DatasetKind::LabelVol => &["labelvolume"],
            _ => &[],
        }
    }

    /// Canonical type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            DatasetKind::KeyValue => KeyValue::TYPE,
            DatasetKind::LabelBlk => LabelBlk::TYPE,
            DatasetKind::Uint8Blk => Uint8Blk::TYPE,
            DatasetKind::Rgba8Blk => Rgba8Blk::TYPE,
            DatasetKind::LabelVol => LabelVol::TYPE,
            DatasetKind::Other(name) => name,
        }
    }

    /// Returns true for kinds with a dedicated handle.
    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, DatasetKind::Other(_))
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// A dataset handle of whichever type the registry selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetHandle {
    /// Key-value store.
    KeyValue(KeyValue),
    /// Labeled block volume.
    LabelBlk(LabelBlk),
    /// Grayscale block volume.
    Uint8Blk(Uint8Blk),
    /// RGBA block volume.
    Rgba8Blk(Rgba8Blk),
    /// Sparse label volume.
    LabelVol(LabelVol),
    /// Unrecognized type; identity only.
    Generic(Dataset),
}

impl DatasetHandle {
    /// Instantiates the handle matching `type_name`, bound to `node` and
    /// `name`. Unknown type names produce [`DatasetHandle::Generic`].
    #[must_use]
    pub fn instantiate(node: Node, name: impl Into<String>, type_name: &str) -> Self {
        let name = name.into();
        match DatasetKind::from_type_name(type_name) {
            DatasetKind::KeyValue => Self::KeyValue(KeyValue::new(node, name)),
            DatasetKind::LabelBlk => Self::LabelBlk(LabelBlk::new(node, name)),
            DatasetKind::Uint8Blk => Self::Uint8Blk(Uint8Blk::new(node, name)),
            DatasetKind::Rgba8Blk => Self::Rgba8Blk(Rgba8Blk::new(node, name)),
            DatasetKind::LabelVol => Self::LabelVol(LabelVol::new(node, name)),
            DatasetKind::Other(type_name) => Self::Generic(Dataset::new(node, name, type_name)),
        }
    }

    /// The kind of this handle.
    #[must_use]
    pub fn kind(&self) -> DatasetKind {
        DatasetKind::from_type_name(self.type_name())
    }

    fn instance(&self) -> &dyn DataInstance {
        match self {
            Self::KeyValue(d) => d,
            Self::LabelBlk(d) => d,
            Self::Uint8Blk(d) => d,
            Self::Rgba8Blk(d) => d,
            Self::LabelVol(d) => d,
            Self::Generic(d) => d,
        }
    }

    /// Returns the key-value handle, if this is one.
    #[must_use]
    pub fn as_key_value(&self) -> Option<&KeyValue> {
        match self {
            Self::KeyValue(d) => Some(d),
            _ => None,
        }
    }

    /// Returns the labeled block volume handle, if this is one.
    #[must_use]
    pub fn as_label_blk(&self) -> Option<&LabelBlk> {
        match self {
            Self::LabelBlk(d) => Some(d),
            _ => None,
        }
    }

    /// Returns the grayscale block volume handle, if this is one.
    #[must_use]
    pub fn as_uint8_blk(&self) -> Option<&Uint8Blk> {
        match self {
            Self::Uint8Blk(d) => Some(d),
            _ => None,
        }
    }

    /// Returns the RGBA block volume handle, if this is one.
    #[must_use]
    pub fn as_rgba8_blk(&self) -> Option<&Rgba8Blk> {
        match self {
            Self::Rgba8Blk(d) => Some(d),
            _ => None,
        }
    }

    /// Returns the label volume handle, if this is one.
    #[must_use]
    pub fn as_label_vol(&self) -> Option<&LabelVol> {
        match self {
            Self::LabelVol(d) => Some(d),
            _ => None,
        }
    }

    /// Returns the block volume capability, for any of the block types.
    #[must_use]
    pub fn as_block_volume(&self) -> Option<&dyn BlockVolume> {
        match self {
            Self::LabelBlk(d) => Some(d),
            Self::Uint8Blk(d) => Some(d),
            Self::Rgba8Blk(d) => Some(d),
            _ => None,
        }
    }
}

impl DataInstance for DatasetHandle {
    fn name(&self) -> &str {
        self.instance().name()
    }

    fn type_name(&self) -> &str {
        self.instance().type_name()
    }

    fn node(&self) -> &Node {
        self.instance().node()
    }
}

/// Checks that a dataset name can be used in a creation request and in a
/// sync list.
///
/// # Errors
///
/// Returns [`Error::MalformedInput`] for empty or reserved names and names
/// containing `/`, `,`, `?` or whitespace.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::malformed("dataname", "cannot be empty"));
    }
    if let Some(c) = name
        .chars()
        .find(|c| matches!(c, '/' | ',' | '?') || c.is_whitespace())
    {
        return Err(Error::malformed(
            "dataname",
            format!("'{name}' contains invalid character {c:?}"),
        ));
    }
    if RESERVED_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
    {
        return Err(Error::malformed(
            "dataname",
            format!("'{name}' is a reserved identifier"),
        ));
    }
    Ok(())
}
