//! Error types for the widerow persistence provider

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PersistenceError>;

#[derive(Error, Debug)]
pub enum PersistenceError {
    /// A conditional write reported `[applied] = false` at commit.
    #[error("Optimistic locking violation: {0}")]
    OptimisticLock(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Data corruption: {0}")]
    Corruption(String),
}

impl PersistenceError {
    /// Whether retrying the whole transaction may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::OptimisticLock(_) | Self::Store(_))
    }
}

impl From<bincode::Error> for PersistenceError {
    fn from(err: bincode::Error) -> Self {
        PersistenceError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::Serialization(err.to_string())
    }
}

impl From<snap::Error> for PersistenceError {
    fn from(err: snap::Error) -> Self {
        PersistenceError::Corruption(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(PersistenceError::OptimisticLock("x".into()).is_retryable());
        assert!(PersistenceError::Store("timeout".into()).is_retryable());
        assert!(!PersistenceError::Configuration("no loader".into()).is_retryable());
        assert!(!PersistenceError::InvalidData("bad row".into()).is_retryable());
    }

    #[test]
    fn test_display() {
        let err = PersistenceError::OptimisticLock("entity p1".into());
        assert_eq!(err.to_string(), "Optimistic locking violation: entity p1");
    }
}
