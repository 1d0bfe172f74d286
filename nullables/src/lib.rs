//! Nullable infrastructure for deterministic testing.
//!
//! Everything the engine reaches outside itself (storage, the host script
//! layer, foreign chain nodes) sits behind a trait. This crate provides
//! in-memory implementations that:
//! - Return deterministic values
//! - Can be scripted and inspected from tests
//! - Never touch the filesystem or network

pub mod foreign;
pub mod script;
pub mod store;

pub use foreign::NullForeignChain;
pub use script::NullScriptEngine;
pub use store::NullKvStore;
