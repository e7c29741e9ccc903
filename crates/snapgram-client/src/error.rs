use thiserror::Error;

use snapgram_shared::error::{ModelError, ValidationError};
use snapgram_store::StoreError;

/// Failure reported by (or while talking to) the remote service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// The conditional update lost against a concurrent write.
    #[error("Document was modified concurrently")]
    PreconditionFailed,

    #[error("Rate limited by the service")]
    RateLimited,

    #[error("Service error ({status}): {message}")]
    Service { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Preview unavailable: {0}")]
    Preview(String),
}

impl RemoteError {
    /// Map an HTTP status and error message onto the taxonomy.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => RemoteError::Unauthorized(message),
            404 => RemoteError::NotFound(message),
            409 => RemoteError::AlreadyExists(message),
            412 => RemoteError::PreconditionFailed,
            429 => RemoteError::RateLimited,
            _ => RemoteError::Service { status, message },
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            RemoteError::Decode(e.to_string())
        } else {
            RemoteError::Transport(e.to_string())
        }
    }
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Uniform error returned by every adapter operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Local storage error: {0}")]
    Store(String),

    #[error("Not signed in")]
    Unauthenticated,

    #[error("{0} not found")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A version-checked edit kept losing to concurrent writers.
    #[error("Gave up updating {collection}/{id} after {attempts} conflicting writes")]
    Contended {
        collection: String,
        id: String,
        attempts: usize,
    },
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Store(e.to_string())
    }
}

impl ApiError {
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            ApiError::Unauthenticated | ApiError::Remote(RemoteError::Unauthorized(_))
        )
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            RemoteError::from_status(404, "missing"),
            RemoteError::NotFound("missing".into())
        );
        assert_eq!(RemoteError::from_status(412, "x"), RemoteError::PreconditionFailed);
        assert!(matches!(
            RemoteError::from_status(500, "boom"),
            RemoteError::Service { status: 500, .. }
        ));
    }

    #[test]
    fn unauthorized_counts_as_unauthenticated() {
        let err: ApiError = RemoteError::Unauthorized("guest".into()).into();
        assert!(err.is_unauthenticated());
        assert!(!ApiError::Forbidden("x".into()).is_unauthenticated());
    }
}
