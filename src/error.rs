use thiserror::Error;

pub type Result<T> = std::result::Result<T, BoardError>;

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid item ID format: {0}")]
    InvalidItemId(String),

    #[error("Invalid lane: {0}")]
    InvalidLane(String),

    #[error("Board not initialized")]
    BoardNotInitialized,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl BoardError {
    /// Whether re-issuing the identical call may succeed.
    ///
    /// Every mutation aborts as a whole, so a retryable failure leaves
    /// storage exactly as it was before the call.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::IoError(_))
    }
}

impl From<toml::de::Error> for BoardError {
    fn from(err: toml::de::Error) -> Self {
        Self::ConfigError(err.to_string())
    }
}

#[cfg(feature = "sqlite-storage")]
impl From<rusqlite::Error> for BoardError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, _)
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::ConstraintViolation(err.to_string())
            }
            _ => Self::StoreUnavailable(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(BoardError::StoreUnavailable("locked".to_string()).is_retryable());
        assert!(!BoardError::ConstraintViolation("dup".to_string()).is_retryable());
        assert!(!BoardError::NotFound("x".to_string()).is_retryable());
    }
}
