//! Entanglement node.
//!
//! Ties the engine together for a running host node:
//! - TOML configuration and structured logging
//! - LMDB-backed snapshots and foreign transaction dedupe
//! - The per-block pipeline: verify, apply, sweep, persist

pub mod config;
pub mod error;
pub mod logging;
pub mod node;
pub mod processor;
pub mod shutdown;

pub use config::NodeConfig;
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use node::{EntangleNode, Endpoints};
pub use processor::{verify_tx, Accepted, BlockProcessor, BlockReport, Rejected};
pub use shutdown::{ShutdownController, StopMode};
