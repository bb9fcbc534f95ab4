use thiserror::Error;

/// Errors surfaced by the scoring service.
///
/// `NotFound` and `InvalidInput` are caused by the caller and carry a message
/// that is safe to show. `Storage` wraps persistence failures; its detail is
/// meant for logs only.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn member_not_found() -> Self {
        Error::NotFound("Member not found".to_string())
    }

    pub fn category_not_found() -> Self {
        Error::NotFound("Category not found".to_string())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidInput(message.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Storage(format!("IO error: {}", e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Storage(format!("JSON error: {}", e))
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Error::Storage(format!("Storage task failed: {}", e))
    }
}
