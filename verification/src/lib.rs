//! Verification of special host transactions.
//!
//! Deposits are checked against the foreign chain they claim to come from,
//! through per-asset endpoint pools with ordered failover. Beacon
//! lifecycle records, burns and proofs are checked for shape and against a
//! read-only view of the entangle state. Nothing here mutates state; the
//! block processor applies what passes.

pub mod deposit;
pub mod error;
pub mod pool;
pub mod verifier;

pub use error::VerifyError;
pub use pool::{ClientPool, ForeignClients, RetryPolicy};
pub use verifier::{VerifiedBurnProof, VerifiedEntangle, VerifiedExchange, Verifier};
