//! Error taxonomy shared across crates, plus collaborator error types.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// How a failure must be handled by the block pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed payload or out-of-range parameter. Rejected, never retried.
    Validation,
    /// Conflicts with current state (duplicate, repeat proof, no quota).
    StateConflict,
    /// Foreign evidence unavailable or not yet mature. Retried later.
    ExternalEvidence,
    /// Corruption or impossible arithmetic. Aborts the whole block.
    FatalInvariant,
}

impl ErrorKind {
    pub fn is_fatal(self) -> bool {
        self == ErrorKind::FatalInvariant
    }

    pub fn is_retryable(self) -> bool {
        self == ErrorKind::ExternalEvidence
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::StateConflict => "state-conflict",
            ErrorKind::ExternalEvidence => "external-evidence",
            ErrorKind::FatalInvariant => "fatal-invariant",
        };
        f.write_str(s)
    }
}

/// Failure reported by a foreign-chain RPC endpoint.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RpcError {
    #[error("endpoint unreachable: {0}")]
    Unreachable(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Failure reported by the script collaborator.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("cannot recover signer public key: {0}")]
    NoSigner(String),

    #[error("invalid public key")]
    InvalidPubkey,

    #[error("payload too large: {0} bytes")]
    PayloadTooLarge(usize),
}
