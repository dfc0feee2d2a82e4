//! Sparse label-volume datasets.

use serde::Deserialize;

use super::{DataInstance, Dataset};
use crate::error::{Error, Result};
use crate::node::Node;

/// A label volume stored as run-length encoded sparse volumes per label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelVol {
    base: Dataset,
}

super::delegate_data_instance!(LabelVol);

impl LabelVol {
    /// Type name understood by the server.
    pub const TYPE: &'static str = "labelvol";

    /// Creates a handle for an existing dataset. No request is issued.
    #[must_use]
    pub fn new(node: Node, name: impl Into<String>) -> Self {
        Self {
            base: Dataset::new(node, name, Self::TYPE),
        }
    }

    /// Fetches and decodes the sparse volume of `label`.
    ///
    /// # Errors
    ///
    /// Errors from the request, or [`Error::InvalidResponse`] if the payload
    /// cannot be decoded.
    pub async fn sparse_volume(&self, label: u64) -> Result<SparseVolume> {
        let url = format!("{}/sparsevol/{label}", self.url());
        let data = self.base.transport().get_bytes(&url).await?;
        SparseVolume::decode(&data)
    }

    /// Fetches voxel and block counts for `label` without the spans.
    ///
    /// # Errors
    ///
    /// Errors from the request, or [`Error::InvalidResponse`].
    pub async fn sparse_volume_size(&self, label: u64) -> Result<SparseVolumeSize> {
        let url = format!("{}/sparsevol-size/{label}", self.url());
        self.base.transport().get_json(&url).await
    }

    /// Merges the labels in `from` into `into`.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedInput`] if `from` is empty or contains `into`;
    /// otherwise errors from the request.
    pub async fn merge(&self, into: u64, from: &[u64]) -> Result<()> {
        if from.is_empty() {
            return Err(Error::malformed("from", "no labels to merge"));
        }
        if from.contains(&into) {
            return Err(Error::malformed(
                "from",
                format!("label {into} cannot be merged into itself"),
            ));
        }
        let body: Vec<u64> = std::iter::once(into).chain(from.iter().copied()).collect();
        let url = format!("{}/merge", self.url());
        self.base.transport().post_json_discard(&url, &body).await?;
        tracing::info!(dataset = %self.name(), into, ?from, "Merged labels");
        Ok(())
    }
}

/// Summary counts for one label's sparse volume.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SparseVolumeSize {
    /// Number of voxels carrying the label.
    pub voxels: u64,
    /// Number of blocks touched by the label.
    #[serde(rename = "numblocks")]
    pub num_blocks: u64,
    /// Minimum voxel coordinate.
    #[serde(rename = "minvoxel", default)]
    pub min_voxel: [i32; 3],
    /// Maximum voxel coordinate.
    #[serde(rename = "maxvoxel", default)]
    pub max_voxel: [i32; 3],
}

/// A run of voxels along x.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Start x.
    pub x: i32,
    /// y of the run.
    pub y: i32,
    /// z of the run.
    pub z: i32,
    /// Number of voxels in the run.
    pub length: i32,
}

/// A decoded sparse volume.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseVolume {
    /// Runs in server order.
    pub spans: Vec<Span>,
}

const HEADER_LEN: usize = 12;
const SPAN_LEN: usize = 16;

impl SparseVolume {
    /// Decodes the run-length encoding:
    ///
    /// ```text
    /// byte 0      payload descriptor
    /// byte 1      number of dimensions (3)
    /// byte 2      dimension of run (0 = x)
    /// byte 3      reserved
    /// u32         voxel count (may be 0)
    /// u32         span count
    /// span count  x, y, z, length as i32
    /// ```
    ///
    /// All integers are little-endian.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidResponse`] on a truncated payload, a
    /// non-3D header, or a negative run length.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(Error::InvalidResponse(format!(
                "sparse volume header needs {HEADER_LEN} bytes, got {}",
                data.len()
            )));
        }
        if data[1] != 3 {
            return Err(Error::InvalidResponse(format!(
                "expected 3 dimensions, got {}",
                data[1]
            )));
        }
        let num_spans = read_u32(&data[8..12]) as usize;
        let body = &data[HEADER_LEN..];
        if Some(body.len()) != num_spans.checked_mul(SPAN_LEN) {
            return Err(Error::InvalidResponse(format!(
                "expected {num_spans} spans, payload holds {} bytes",
                body.len()
            )));
        }

        let spans = body
            .chunks_exact(SPAN_LEN)
            .map(|chunk| {
                let span = Span {
                    x: read_i32(&chunk[0..4]),
                    y: read_i32(&chunk[4..8]),
                    z: read_i32(&chunk[8..12]),
                    length: read_i32(&chunk[12..16]),
                };
                if span.length < 0 {
                    return Err(Error::InvalidResponse(format!(
                        "negative run length {}",
                        span.length
                    )));
                }
                Ok(span)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { spans })
    }

    /// Total number of voxels covered by the spans.
    #[must_use]
    pub fn voxel_count(&self) -> u64 {
        self.spans
            .iter()
            .map(|span| u64::try_from(span.length).unwrap_or(0))
            .sum()
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(bytes);
    u32::from_le_bytes(word)
}

fn read_i32(bytes: &[u8]) -> i32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(bytes);
    i32::from_le_bytes(word)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Server;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn encode(spans: &[[i32; 4]]) -> Vec<u8> {
        let mut data = vec![0u8, 3, 0, 0];
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&u32::try_from(spans.len()).unwrap().to_le_bytes());
        for span in spans {
            for v in span {
                data.extend_from_slice(&v.to_le_bytes());
            }
        }
        data
    }

    fn labelvol(mock: &MockServer) -> LabelVol {
        let node = Server::new(format!("{}/api", mock.uri()))
            .unwrap()
            .open_repository("abcd")
            .root_node();
        LabelVol::new(node, "bodies")
    }

    #[test]
    fn test_decode_spans() {
        let volume = SparseVolume::decode(&encode(&[[10, 2, 3, 5], [-4, 0, 0, 1]])).unwrap();

        assert_eq!(volume.spans.len(), 2);
        assert_eq!(
            volume.spans[1],
            Span {
                x: -4,
                y: 0,
                z: 0,
                length: 1
            }
        );
        assert_eq!(volume.voxel_count(), 6);
    }

    #[test]
    fn test_decode_empty_volume() {
        let volume = SparseVolume::decode(&encode(&[])).unwrap();
        assert!(volume.spans.is_empty());
        assert_eq!(volume.voxel_count(), 0);
    }

    #[test]
    fn test_decode_rejects_truncated_payload() {
        let data = encode(&[[0, 0, 0, 4]]);
        assert!(SparseVolume::decode(&data[..data.len() - 1]).is_err());
        assert!(SparseVolume::decode(&data[..5]).is_err());
    }

    #[test]
    fn test_decode_rejects_non_3d_header() {
        let mut data = encode(&[]);
        data[1] = 2;
        assert!(SparseVolume::decode(&data).is_err());
    }

    #[tokio::test]
    async fn test_sparse_volume_fetch() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/node/abcd/bodies/sparsevol/17"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(encode(&[[0, 0, 0, 8]])))
            .mount(&mock_server)
            .await;

        let volume = labelvol(&mock_server).sparse_volume(17).await.unwrap();
        assert_eq!(volume.voxel_count(), 8);
    }

    #[tokio::test]
    async fn test_sparse_volume_size() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/node/abcd/bodies/sparsevol-size/17"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "voxels": 8, "numblocks": 1, "minvoxel": [0, 0, 0], "maxvoxel": [7, 0, 0]
            })))
            .mount(&mock_server)
            .await;

        let size = labelvol(&mock_server).sparse_volume_size(17).await.unwrap();
        assert_eq!(size.voxels, 8);
        assert_eq!(size.max_voxel, [7, 0, 0]);
    }

    #[tokio::test]
    async fn test_merge_posts_target_first() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/node/abcd/bodies/merge"))
            .and(body_json(json!([1, 2, 3])))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        labelvol(&mock_server).merge(1, &[2, 3]).await.unwrap();
    }

    #[tokio::test]
    async fn test_merge_rejects_self_merge() {
        let mock_server = MockServer::start().await;
        let err = labelvol(&mock_server).merge(1, &[1]).await.unwrap_err();
        assert!(matches!(err, Error::MalformedInput { field: "from", .. }));
    }
}
