//! LMDB storage backend.
//!
//! Implements [`entangle_store::KvStore`] with the `heed` LMDB bindings.
//! Every bucket is its own named LMDB database inside a single environment.

pub mod environment;
pub mod error;
pub mod integrity;
pub mod kv;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use integrity::{check_data_dir, check_integrity, IntegrityReport};
pub use kv::LmdbKvStore;
