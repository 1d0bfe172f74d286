use entangle_types::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("database is corrupted: {0}")]
    Corruption(String),
}

impl StoreError {
    /// Storage failures cannot be retried inside a block.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::FatalInvariant
    }
}
