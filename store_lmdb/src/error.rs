use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmdbError {
    #[error("LMDB error: {0}")]
    Heed(#[from] heed::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("data directory is invalid: {0}")]
    DataDir(String),

    #[error("database handle cache poisoned")]
    Poisoned,
}

impl From<LmdbError> for entangle_store::StoreError {
    fn from(e: LmdbError) -> Self {
        match e {
            LmdbError::DataDir(msg) => entangle_store::StoreError::Corruption(msg),
            other => entangle_store::StoreError::Backend(other.to_string()),
        }
    }
}
