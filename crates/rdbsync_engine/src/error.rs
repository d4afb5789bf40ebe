//! Error types for the sync engine.

use rdbsync_protocol::ProvenanceError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync and verification.
///
/// None of these are retried internally: every error aborts the current
/// pass, and re-running the pass is the recovery path.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The store answered with a non-success status.
    #[error("{url} returned HTTP {status}: {body}")]
    Remote {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// A result looked up by id does not exist.
    #[error("result not found at {url}: {body}")]
    NotFound {
        /// Requested URL.
        url: String,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The request never got an HTTP answer (connection, TLS, timeout).
    #[error("request to {url} failed: {message}")]
    Transport {
        /// Requested URL.
        url: String,
        /// Underlying error message.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A copied result has missing or malformed provenance annotations.
    #[error("result {id}: {source}")]
    Provenance {
        /// Destination result id.
        id: i64,
        /// What is wrong with the annotations.
        #[source]
        source: ProvenanceError,
    },

    /// A copied result no longer matches its source.
    #[error(
        "destination result {destination_id} does not match source result {source_id}: {reason}"
    )]
    VerificationMismatch {
        /// Destination result id.
        destination_id: i64,
        /// Source result id.
        source_id: i64,
        /// Which part differs.
        reason: String,
    },

    /// HTTP client could not be constructed.
    #[error("http client error: {0}")]
    Client(String),

    /// I/O error (credential file).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Creates a transport error for `url`.
    pub fn transport(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Returns true if this error came from talking to a store.
    ///
    /// `NotFound` is a refinement of a remote error and counts as one.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            SyncError::Remote { .. } | SyncError::NotFound { .. } | SyncError::Transport { .. }
        )
    }

    /// Returns the HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::Remote { status, .. } => Some(*status),
            SyncError::NotFound { .. } => Some(404),
            _ => None,
        }
    }
}
