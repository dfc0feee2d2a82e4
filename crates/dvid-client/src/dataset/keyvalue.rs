//! Key-value blob store datasets.

use bytes::Bytes;

use super::{DataInstance, Dataset};
use crate::error::{Error, Result};
use crate::node::Node;

/// A key-value dataset storing opaque blobs under string keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    base: Dataset,
}

super::delegate_data_instance!(KeyValue);

impl KeyValue {
    /// Type name understood by the server.
    pub const TYPE: &'static str = "keyvalue";

    /// Creates a handle for an existing dataset. No request is issued.
    #[must_use]
    pub fn new(node: Node, name: impl Into<String>) -> Self {
        Self {
            base: Dataset::new(node, name, Self::TYPE),
        }
    }

    fn key_url(&self, key: &str) -> Result<String> {
        validate_key(key)?;
        Ok(format!("{}/key/{key}", self.url()))
    }

    /// Reads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// * [`Error::MalformedInput`] - invalid key
    /// * [`Error::Remote`] - missing key or other rejection
    /// * [`Error::Transport`] - server unreachable
    pub async fn get(&self, key: &str) -> Result<Bytes> {
        let url = self.key_url(key)?;
        self.base.transport().get_bytes(&url).await
    }

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// See [`KeyValue::get`].
    pub async fn put(&self, key: &str, value: Bytes) -> Result<()> {
        let url = self.key_url(key)?;
        self.base.transport().post_bytes(&url, value).await?;
        tracing::debug!(dataset = %self.name(), %key, "Stored value");
        Ok(())
    }

    /// Deletes `key`, returning the raw status code.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedInput`] for an invalid key, [`Error::Transport`] if
    /// no response was received.
    pub async fn delete(&self, key: &str) -> Result<u16> {
        let url = self.key_url(key)?;
        self.base.transport().delete_status(&url).await
    }

    /// Lists every key.
    ///
    /// # Errors
    ///
    /// Errors from the request, or [`Error::InvalidResponse`].
    pub async fn keys(&self) -> Result<Vec<String>> {
        let url = format!("{}/keys", self.url());
        self.base.transport().get_json(&url).await
    }

    /// Lists keys in the inclusive range `first..=last`.
    ///
    /// # Errors
    ///
    /// See [`KeyValue::keys`]; [`Error::MalformedInput`] for invalid keys.
    pub async fn key_range(&self, first: &str, last: &str) -> Result<Vec<String>> {
        validate_key(first)?;
        validate_key(last)?;
        let url = format!("{}/keyrange/{first}/{last}", self.url());
        self.base.transport().get_json(&url).await
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::malformed("key", "cannot be empty"));
    }
    if key.contains(['/', '?', '#']) {
        return Err(Error::malformed(
            "key",
            format!("'{key}' contains a URL delimiter"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Server;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_bytes, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn kv(mock: &MockServer) -> KeyValue {
        let node = Server::new(format!("{}/api", mock.uri()))
            .unwrap()
            .open_repository("abcd")
            .root_node();
        KeyValue::new(node, "annotations")
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/node/abcd/annotations/key/synapses"))
            .and(body_bytes(b"{\"n\":3}".to_vec()))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/node/abcd/annotations/key/synapses"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"{\"n\":3}".to_vec()))
            .mount(&mock_server)
            .await;

        let kv = kv(&mock_server);
        kv.put("synapses", Bytes::from_static(b"{\"n\":3}"))
            .await
            .unwrap();
        let value = kv.get("synapses").await.unwrap();

        assert_eq!(value.as_ref(), b"{\"n\":3}");
    }

    #[tokio::test]
    async fn test_missing_key_is_remote_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/node/abcd/annotations/key/nope"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let err = kv(&mock_server).get("nope").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_keys_and_range() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/node/abcd/annotations/keys"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(["a", "b", "c"])))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/node/abcd/annotations/keyrange/a/b"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(["a", "b"])))
            .mount(&mock_server)
            .await;

        let kv = kv(&mock_server);
        assert_eq!(kv.keys().await.unwrap(), vec!["a", "b", "c"]);
        assert_eq!(kv.key_range("a", "b").await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_delete_returns_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/api/node/abcd/annotations/key/old"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        assert_eq!(kv(&mock_server).delete("old").await.unwrap(), 200);
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("synapses").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("a/b").is_err());
        assert!(validate_key("a?b").is_err());
    }
}
