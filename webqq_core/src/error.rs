//! Error taxonomy for decoded API responses.

use thiserror::Error;

/// Problem reported by the API or found while decoding its response.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The raw HTTP status was not 200.
    #[error("server returned HTTP status {0}")]
    Status(u16),

    /// The envelope carried a non-zero return code.
    #[error("server returned error code {0}")]
    Retcode(i64),

    /// Return code 103: the server no longer recognizes the session and a
    /// fresh login is required.
    #[error("session desynchronized (error code 103), a fresh login is required")]
    SessionDesynced,

    /// A message send was rejected by the application layer.
    #[error("message send rejected with error code {0}")]
    SendRejected(i64),

    /// The response body was not a well-formed envelope.
    #[error("malformed response envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The envelope was well-formed but a field the call relies on was
    /// absent.
    #[error("response missing expected field `{0}`")]
    MissingField(&'static str),
}

impl ApiError {
    /// Whether this is the distinguished session-desync condition, i.e. the
    /// caller should consider a fresh login.
    #[must_use]
    pub const fn is_desync(&self) -> bool {
        matches!(self, Self::SessionDesynced)
    }
}
