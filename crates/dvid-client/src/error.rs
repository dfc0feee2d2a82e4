//! Error types for versioned data-store operations.

use thiserror::Error;

/// The main error type for client operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The request never reached the server, or no response was received.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("remote service error: {status} - {body}")]
    Remote {
        /// HTTP status code.
        status: u16,
        /// Response body as returned by the server.
        body: String,
    },

    /// The caller supplied input the client refuses to send.
    #[error("malformed input: {field} - {message}")]
    MalformedInput {
        /// The offending field.
        field: &'static str,
        /// Why the input was rejected.
        message: String,
    },

    /// A 2xx response whose body did not have the expected shape.
    #[error("invalid response format: {0}")]
    InvalidResponse(String),

    /// Mutually synced creation stopped after some datasets already existed.
    ///
    /// The datasets in `created` exist server-side and reference the full
    /// intended group in their sync lists. Nothing was rolled back.
    #[error("sync group partially created ({} created), '{failed}' failed: {source}", .created.len())]
    PartialSyncGroup {
        /// Names of datasets created before the failure, in input order.
        created: Vec<String>,
        /// Name of the dataset whose creation failed.
        failed: String,
        /// The error returned for `failed`.
        #[source]
        source: Box<Error>,
    },

    /// Client configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

/// A specialized Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new malformed input error.
    #[must_use]
    pub fn malformed(field: &'static str, message: impl Into<String>) -> Self {
        Self::MalformedInput {
            field,
            message: message.into(),
        }
    }

    /// Creates a new remote service error.
    #[must_use]
    pub fn remote(status: u16, body: impl Into<String>) -> Self {
        Self::Remote {
            status,
            body: body.into(),
        }
    }

    /// Returns true if the server could not be reached.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns true if the server rejected the operation.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }

    /// HTTP status carried by a remote error, looking through partial
    /// sync-group failures.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => Some(*status),
            Self::PartialSyncGroup { source, .. } => source.status(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn error_remote_display() {
        let err = Error::remote(409, "instance already exists");
        assert_eq!(
            err.to_string(),
            "remote service error: 409 - instance already exists"
        );
        assert!(err.is_remote());
        assert!(!err.is_transport());
        assert_eq!(err.status(), Some(409));
    }

    #[test]
    fn error_malformed_display() {
        let err = Error::malformed("dataname", "cannot be empty");
        assert_eq!(err.to_string(), "malformed input: dataname - cannot be empty");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn partial_sync_group_exposes_inner_status() {
        let err = Error::PartialSyncGroup {
            created: vec!["a".to_string()],
            failed: "b".to_string(),
            source: Box::new(Error::remote(400, "bad type")),
        };
        assert_eq!(err.status(), Some(400));
        assert_eq!(
            err.to_string(),
            "sync group partially created (1 created), 'b' failed: remote service error: 400 - bad type"
        );
    }
}
