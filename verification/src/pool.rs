//! Foreign RPC endpoints with ordered failover.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use entangle_types::{AssetType, ForeignChainClient, RpcError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::VerifyError;

/// How hard to try before treating foreign evidence as unavailable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Rounds over the whole endpoint list.
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Pause between rounds.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    250
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

/// Endpoints for one foreign asset, tried in order on every round.
pub struct ClientPool {
    asset: AssetType,
    endpoints: Vec<Arc<dyn ForeignChainClient>>,
    policy: RetryPolicy,
}

impl ClientPool {
    pub fn new(
        asset: AssetType,
        endpoints: Vec<Arc<dyn ForeignChainClient>>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            asset,
            endpoints,
            policy,
        }
    }

    pub fn asset(&self) -> AssetType {
        self.asset
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Run `f` against each endpoint until one answers. Blocks the calling
    /// thread while backing off.
    pub fn call<T>(
        &self,
        call: &'static str,
        f: impl Fn(&dyn ForeignChainClient) -> Result<T, RpcError>,
    ) -> Result<T, VerifyError> {
        if self.endpoints.is_empty() {
            return Err(VerifyError::NoEndpoints(self.asset));
        }
        let rounds = self.policy.attempts.max(1);
        let mut last = None;
        for round in 0..rounds {
            if round > 0 && self.policy.backoff_ms > 0 {
                thread::sleep(Duration::from_millis(self.policy.backoff_ms));
            }
            for (i, endpoint) in self.endpoints.iter().enumerate() {
                match f(endpoint.as_ref()) {
                    Ok(v) => return Ok(v),
                    Err(e) => {
                        debug!(asset = %self.asset, call, endpoint = i, round, error = %e, "foreign call failed");
                        last = Some(e);
                    }
                }
            }
        }
        let source = last.unwrap_or_else(|| RpcError::Unreachable("no attempt made".into()));
        warn!(asset = %self.asset, call, rounds, error = %source, "all endpoints failed");
        Err(VerifyError::Rpc {
            asset: self.asset,
            call,
            source,
        })
    }
}

/// One endpoint pool per foreign asset.
#[derive(Default)]
pub struct ForeignClients {
    pools: BTreeMap<AssetType, ClientPool>,
}

impl ForeignClients {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pool: ClientPool) {
        self.pools.insert(pool.asset(), pool);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, pool: ClientPool) -> Self {
        self.insert(pool);
        self
    }

    pub fn pool(&self, asset: AssetType) -> Result<&ClientPool, VerifyError> {
        self.pools.get(&asset).ok_or(VerifyError::NoEndpoints(asset))
    }
}
