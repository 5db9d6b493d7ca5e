use thiserror::Error;

/// Errors surfaced by the stores.
///
/// A failed authentication is not in here: `UserStore::authenticate` returns
/// `Ok(None)` for both an unknown username and a wrong password.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Malformed input, rejected before anything is written.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("username already taken: {0}")]
    DuplicateUsername(String),

    #[error("{0} not found")]
    NotFound(String),

    /// Engine-level failure. Any in-flight transaction has rolled back.
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Storage(e.to_string())
    }
}
