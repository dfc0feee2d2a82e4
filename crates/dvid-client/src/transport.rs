//! # Transport
//!
//! Single-attempt JSON-over-HTTP request layer shared by every handle.
//!
//! Each call issues exactly one request and reads the response body to
//! completion (or drops it) before returning, so the pooled connection is
//! released on success, on a remote rejection and on a transport failure
//! alike. Nothing is retried.

use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::{Error, Result};

/// HTTP methods used by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `DELETE`
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// HTTP transport for the data-store API.
///
/// Cheaply cloneable; clones share the underlying connection pool but no
/// per-call state.
#[derive(Debug, Clone)]
pub struct Transport {
    http: Client,
}

impl Transport {
    /// Creates a transport with the given timeout and user agent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the HTTP client cannot be built.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let http = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { http })
    }

    /// Creates a transport from a [`ClientConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(config.timeout(), &config.user_agent)
    }

    /// Creates a transport with the default timeout and user agent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the HTTP client cannot be built.
    pub fn default_client() -> Result<Self> {
        Self::from_config(&ClientConfig::default())
    }

    /// Issues a request with an optional JSON body and returns the raw
    /// response body.
    ///
    /// # Errors
    ///
    /// * [`Error::MalformedInput`] - the URL is not a valid request target
    /// * [`Error::Transport`] - the server could not be reached
    /// * [`Error::Remote`] - the server answered with a non-2xx status
    pub async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<Bytes> {
        let mut request = self.builder(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        tracing::debug!(%method, %url, "Sending request");
        let response = request.send().await.map_err(send_error)?;
        read_success(response).await
    }

    /// `GET` returning the raw body.
    ///
    /// # Errors
    ///
    /// See [`Transport::request`].
    pub async fn get_bytes(&self, url: &str) -> Result<Bytes> {
        self.request::<()>(Method::Get, url, None).await
    }

    /// `GET` returning a JSON document.
    ///
    /// # Errors
    ///
    /// See [`Transport::request`]; additionally [`Error::InvalidResponse`]
    /// if the body is not the expected JSON.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self.get_bytes(url).await?;
        parse_json(&body)
    }

    /// `POST` a JSON body and parse a JSON response.
    ///
    /// # Errors
    ///
    /// See [`Transport::get_json`].
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T> {
        let body = self.request(Method::Post, url, Some(body)).await?;
        parse_json(&body)
    }

    /// `POST` a JSON body, ignoring whatever the server answers on success.
    ///
    /// # Errors
    ///
    /// See [`Transport::request`].
    pub async fn post_json_discard<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<()> {
        self.request(Method::Post, url, Some(body)).await?;
        Ok(())
    }

    /// `POST` a raw octet-stream body.
    ///
    /// # Errors
    ///
    /// See [`Transport::request`].
    pub async fn post_bytes(&self, url: &str, data: Bytes) -> Result<Bytes> {
        tracing::debug!(method = %Method::Post, %url, len = data.len(), "Sending request");
        let response = self
            .http
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(data)
            .send()
            .await
            .map_err(send_error)?;
        read_success(response).await
    }

    /// `DELETE` returning the raw status code.
    ///
    /// Non-2xx statuses are not errors here; interpretation is left to the
    /// caller.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedInput`] for an invalid URL, otherwise
    /// [`Error::Transport`] only if no response was received.
    pub async fn delete_status(&self, url: &str) -> Result<u16> {
        tracing::debug!(method = %Method::Delete, %url, "Sending request");
        let response = self
            .builder(Method::Delete, url)
            .send()
            .await
            .map_err(send_error)?;
        let status = response.status().as_u16();
        if let Err(e) = response.bytes().await {
            tracing::debug!(%url, error = %e, "Failed to drain delete response body");
        }
        Ok(status)
    }

    fn builder(&self, method: Method, url: &str) -> RequestBuilder {
        match method {
            Method::Get => self.http.get(url),
            Method::Post => self.http.post(url),
            Method::Delete => self.http.delete(url),
        }
    }
}

/// Requests that could not be built (bad URL) map to `MalformedInput`.
fn send_error(e: reqwest::Error) -> Error {
    if e.is_builder() {
        Error::malformed("url", e.to_string())
    } else {
        Error::Transport(e)
    }
}

async fn read_success(response: Response) -> Result<Bytes> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), %body, "Server rejected request");
        return Err(Error::remote(status.as_u16(), body));
    }
    Ok(response.bytes().await?)
}

fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| Error::InvalidResponse(e.to_string()))
}
