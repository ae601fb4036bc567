//! Client error types.

use thiserror::Error;
use webqq_core::error::ApiError;

/// Any failure surfaced by the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The HTTP transport failed before a response was obtained.
    #[error("HTTP request error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The server answered, but the response was rejected.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The operation was canceled by an immediate stop. Not a real failure:
    /// the poll loop treats it as a stop signal and never reports it.
    #[error("operation aborted by caller")]
    Aborted,

    /// An authenticated call was made before `login()` completed.
    #[error("client is not logged in")]
    NotLoggedIn,
}

impl ClientError {
    /// Wrap a transport error.
    pub fn http<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Http(Box::new(error))
    }

    /// Whether the server signaled a desynchronized session (return code
    /// 103), i.e. the caller should consider a fresh login.
    #[must_use]
    pub fn is_desync(&self) -> bool {
        matches!(self, Self::Api(api) if api.is_desync())
    }
}
