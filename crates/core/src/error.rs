#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The monitoring platform could not be reached or answered with
    /// something unusable.
    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
