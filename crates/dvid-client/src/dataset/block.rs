//! Block-volume datasets: labels, grayscale and RGBA.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;

use super::{DataInstance, Dataset};
use crate::error::{Error, Result};
use crate::node::Node;
use crate::transport::Transport;

/// An axis-aligned region of a block volume, in voxels, at a given scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subvolume {
    /// Extent along x, y, z.
    pub size: [u32; 3],
    /// Minimum corner along x, y, z.
    pub offset: [i32; 3],
    /// Downsampling level; 0 is full resolution.
    pub scale: u8,
}

impl Subvolume {
    /// A full-resolution region.
    #[must_use]
    pub fn new(size: [u32; 3], offset: [i32; 3]) -> Self {
        Self {
            size,
            offset,
            scale: 0,
        }
    }

    /// The same region at another scale.
    #[must_use]
    pub fn at_scale(mut self, scale: u8) -> Self {
        self.scale = scale;
        self
    }

    /// Number of voxels in the region, or `None` on overflow.
    #[must_use]
    pub fn voxel_count(&self) -> Option<u64> {
        self.size
            .iter()
            .try_fold(1u64, |acc, &n| acc.checked_mul(u64::from(n)))
    }

    fn raw_path(&self) -> String {
        let [sx, sy, sz] = self.size;
        let [ox, oy, oz] = self.offset;
        let mut path = format!("raw/0_1_2/{sx}_{sy}_{sz}/{ox}_{oy}_{oz}");
        if self.scale > 0 {
            path.push_str(&format!("?scale={}", self.scale));
        }
        path
    }
}

/// Read/write access to a dense block volume.
#[async_trait]
pub trait BlockVolume: DataInstance + Sync {
    /// Bytes stored per voxel.
    fn bytes_per_voxel(&self) -> usize;

    /// Reads a region as raw little-endian voxel data, x fastest.
    ///
    /// # Errors
    ///
    /// [`Error::Remote`] or [`Error::Transport`] from the request.
    async fn get_subvolume(&self, region: &Subvolume) -> Result<Bytes> {
        let url = format!("{}/{}", self.url(), region.raw_path());
        transport(self).get_bytes(&url).await
    }

    /// Writes raw voxel data into a region.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedInput`] if `data` does not hold exactly one voxel
    /// per position of `region`; otherwise errors from the request.
    async fn put_subvolume(&self, region: &Subvolume, data: Bytes) -> Result<()> {
        let expected = region
            .voxel_count()
            .zip(u64::try_from(self.bytes_per_voxel()).ok())
            .and_then(|(voxels, bytes)| voxels.checked_mul(bytes))
            .ok_or_else(|| Error::malformed("size", "region is too large"))?;
        if u64::try_from(data.len()).ok() != Some(expected) {
            return Err(Error::malformed(
                "data",
                format!("expected {expected} bytes for region, got {}", data.len()),
            ));
        }
        let url = format!("{}/{}", self.url(), region.raw_path());
        transport(self).post_bytes(&url, data).await?;
        tracing::debug!(dataset = %self.name(), ?region, "Wrote subvolume");
        Ok(())
    }

    /// Reads `span` consecutive blocks along x starting at block coordinate
    /// `block`, in the server's block encoding.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedInput`] for a zero span; otherwise errors from the
    /// request.
    async fn get_blocks(&self, block: [i32; 3], span: u32) -> Result<Bytes> {
        if span == 0 {
            return Err(Error::malformed("span", "must be at least 1"));
        }
        let [x, y, z] = block;
        let url = format!("{}/blocks/{x}_{y}_{z}/{span}", self.url());
        transport(self).get_bytes(&url).await
    }
}

fn transport<V: BlockVolume + ?Sized>(volume: &V) -> &Transport {
    volume.node().repository().server().transport()
}

macro_rules! block_volume {
    ($(#[$meta:meta])* $ty:ident, $type_name:literal, $bytes:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $ty {
            base: Dataset,
        }

        impl $ty {
            /// Type name understood by the server.
            pub const TYPE: &'static str = $type_name;

            /// Bytes stored per voxel.
            pub const BYTES_PER_VOXEL: usize = $bytes;

            /// Creates a handle for an existing dataset. No request is issued.
            #[must_use]
            pub fn new(node: Node, name: impl Into<String>) -> Self {
                Self {
                    base: Dataset::new(node, name, Self::TYPE),
                }
            }
        }

        super::delegate_data_instance!($ty);

        impl BlockVolume for $ty {
            fn bytes_per_voxel(&self) -> usize {
                Self::BYTES_PER_VOXEL
            }
        }
    };
}

block_volume!(
    /// Labeled block volume with 64-bit labels.
    LabelBlk,
    "labelblk",
    8
);

block_volume!(
    /// Scalar 8-bit (grayscale) block volume.
    Uint8Blk,
    "uint8blk",
    1
);

block_volume!(
    /// RGBA block volume, four bytes per voxel.
    Rgba8Blk,
    "rgba8blk",
    4
);

#[derive(Deserialize)]
struct LabelResponse {
    #[serde(rename = "Label")]
    label: u64,
}

impl LabelBlk {
    /// Returns the label at a single voxel.
    ///
    /// # Errors
    ///
    /// Errors from the request, or [`Error::InvalidResponse`].
    pub async fn label_at(&self, point: [i32; 3]) -> Result<u64> {
        let [x, y, z] = point;
        let url = format!("{}/label/{x}_{y}_{z}", self.url());
        let response: LabelResponse = self.base.transport().get_json(&url).await?;
        Ok(response.label)
    }

    /// Reads a region and decodes it into labels.
    ///
    /// # Errors
    ///
    /// See [`BlockVolume::get_subvolume`] and [`LabelBlk::decode_labels`].
    pub async fn get_labels(&self, region: &Subvolume) -> Result<Vec<u64>> {
        let data = self.get_subvolume(region).await?;
        Self::decode_labels(&data)
    }

    /// Decodes raw little-endian 64-bit labels.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidResponse`] if the length is not a multiple of
    /// eight.
    pub fn decode_labels(data: &[u8]) -> Result<Vec<u64>> {
        if data.len() % Self::BYTES_PER_VOXEL != 0 {
            return Err(Error::InvalidResponse(format!(
                "label data length {} is not a multiple of {}",
                data.len(),
                Self::BYTES_PER_VOXEL
            )));
        }
        Ok(data
            .chunks_exact(Self::BYTES_PER_VOXEL)
            .map(|chunk| {
                let mut word = [0u8; 8];
                word.copy_from_slice(chunk);
                u64::from_le_bytes(word)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Server;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_bytes, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn node(mock: &MockServer) -> Node {
        Server::new(format!("{}/api", mock.uri()))
            .unwrap()
            .open_repository("abcd")
            .root_node()
    }

    #[test]
    fn test_voxel_count() {
        assert_eq!(Subvolume::new([2, 3, 4], [0, 0, 0]).voxel_count(), Some(24));
        assert_eq!(
            Subvolume::new([u32::MAX, u32::MAX, u32::MAX], [0, 0, 0]).voxel_count(),
            None
        );
    }

    #[test]
    fn test_decode_labels() {
        let mut data = Vec::new();
        data.extend_from_slice(&7u64.to_le_bytes());
        data.extend_from_slice(&u64::MAX.to_le_bytes());
        assert_eq!(LabelBlk::decode_labels(&data).unwrap(), vec![7, u64::MAX]);
        assert!(LabelBlk::decode_labels(&data[..9]).is_err());
    }

    #[tokio::test]
    async fn test_get_subvolume_path() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/node/abcd/grayscale/raw/0_1_2/2_2_1/10_-5_0"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3, 4]))
            .mount(&mock_server)
            .await;

        let volume = Uint8Blk::new(node(&mock_server), "grayscale");
        let data = volume
            .get_subvolume(&Subvolume::new([2, 2, 1], [10, -5, 0]))
            .await
            .unwrap();

        assert_eq!(data.as_ref(), &[1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_get_subvolume_at_scale() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/node/abcd/labels/raw/0_1_2/1_1_1/0_0_0"))
            .and(query_param("scale", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(9u64.to_le_bytes().to_vec()))
            .mount(&mock_server)
            .await;

        let volume = LabelBlk::new(node(&mock_server), "labels");
        let labels = volume
            .get_labels(&Subvolume::new([1, 1, 1], [0, 0, 0]).at_scale(2))
            .await
            .unwrap();

        assert_eq!(labels, vec![9]);
    }

    #[tokio::test]
    async fn test_put_subvolume_checks_length_before_sending() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let volume = Rgba8Blk::new(node(&mock_server), "color");
        let err = volume
            .put_subvolume(&Subvolume::new([2, 1, 1], [0, 0, 0]), Bytes::from(vec![0u8; 4]))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::MalformedInput { field: "data", .. }));
    }

    #[tokio::test]
    async fn test_put_subvolume_rejects_region_whose_byte_size_overflows() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        // Voxel count fits in u64, times 8 bytes per label does not.
        let region = Subvolume::new([u32::MAX, u32::MAX, 1], [0, 0, 0]);
        assert!(region.voxel_count().is_some());

        let volume = LabelBlk::new(node(&mock_server), "labels");
        let err = volume
            .put_subvolume(&region, Bytes::from_static(&[0u8; 8]))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::MalformedInput { field: "size", .. }));
    }

    #[tokio::test]
    async fn test_put_subvolume_posts_raw_bytes() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/node/abcd/color/raw/0_1_2/2_1_1/0_0_0"))
            .and(body_bytes(vec![1u8, 2, 3, 4, 5, 6, 7, 8]))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let volume = Rgba8Blk::new(node(&mock_server), "color");
        volume
            .put_subvolume(
                &Subvolume::new([2, 1, 1], [0, 0, 0]),
                Bytes::from(vec![1u8, 2, 3, 4, 5, 6, 7, 8]),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_label_at() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/node/abcd/labels/label/1_2_3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Label": 42})))
            .mount(&mock_server)
            .await;

        let volume = LabelBlk::new(node(&mock_server), "labels");
        assert_eq!(volume.label_at([1, 2, 3]).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_get_blocks_rejects_zero_span() {
        let mock_server = MockServer::start().await;
        let volume = Uint8Blk::new(node(&mock_server), "grayscale");

        let err = volume.get_blocks([0, 0, 0], 0).await.unwrap_err();
        assert!(matches!(err, Error::MalformedInput { field: "span", .. }));
    }

    #[tokio::test]
    async fn test_get_blocks_path() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/node/abcd/grayscale/blocks/1_2_3/4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 16]))
            .mount(&mock_server)
            .await;

        let volume = Uint8Blk::new(node(&mock_server), "grayscale");
        let data = volume.get_blocks([1, 2, 3], 4).await.unwrap();
        assert_eq!(data.len(), 16);
    }
}
