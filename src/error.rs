use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("not found")]
    NotFound,

    /// Rendered exactly like `NotFound` at the HTTP boundary.
    #[error("feature disabled")]
    FeatureDisabled,

    #[error("already exists")]
    AlreadyExists,

    #[error("token lookup collision")]
    TokenLookupCollision,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("invalid token format")]
    InvalidTokenFormat,

    #[error("token expired")]
    TokenExpired,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid permission: {0}")]
    InvalidPermission(String),

    #[error("identity lookup failed: {0}")]
    Identity(String),

    #[error("timed out")]
    Timeout,
}

pub type Result<T> = std::result::Result<T, Error>;
