//! Error types shared across the workspace.
//!
//! `StoreError` is raised by data-access implementations and travels inside
//! `anyhow::Error`, so callers can downcast it when they need to tell a
//! missing row apart from a backend outage.

use thiserror::Error;

/// Errors that can occur when talking to the backing data store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend rejected the credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The backend returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The backend answered with a body we could not decode.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// A failure injected by a test double.
    #[error("injected failure: {0}")]
    Injected(String),
}

impl StoreError {
    /// Returns `true` if the error means the row is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Returns `true` if `err` wraps a [`StoreError::NotFound`].
pub fn is_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<StoreError>()
        .is_some_and(StoreError::is_not_found)
}
