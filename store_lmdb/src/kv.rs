//! [`KvStore`] over LMDB: one named database per bucket.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use heed::types::Bytes;
use heed::Database;
use tracing::debug;

use entangle_store::{KvStore, StoreError};

use crate::environment::LmdbEnvironment;
use crate::LmdbError;

type BucketDb = Database<Bytes, Bytes>;

pub struct LmdbKvStore {
    env: LmdbEnvironment,
    dbs: Mutex<HashMap<String, BucketDb>>,
}

impl LmdbKvStore {
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        Ok(Self {
            env: LmdbEnvironment::open(path, map_size)?,
            dbs: Mutex::new(HashMap::new()),
        })
    }

    pub fn environment(&self) -> &LmdbEnvironment {
        &self.env
    }

    /// Handle for `bucket`, creating the database on first use.
    fn db(&self, bucket: &str) -> Result<BucketDb, LmdbError> {
        let mut dbs = self.dbs.lock().map_err(|_| LmdbError::Poisoned)?;
        if let Some(db) = dbs.get(bucket) {
            return Ok(*db);
        }
        let env = self.env.env();
        let mut wtxn = env.write_txn()?;
        let db: BucketDb = env.create_database(&mut wtxn, Some(bucket))?;
        wtxn.commit()?;
        debug!(bucket, "LMDB database opened");
        dbs.insert(bucket.to_string(), db);
        Ok(db)
    }

    /// Number of entries in `bucket`.
    pub fn len(&self, bucket: &str) -> Result<u64, StoreError> {
        let db = self.db(bucket)?;
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        Ok(db.len(&rtxn).map_err(LmdbError::from)?)
    }
}

impl KvStore for LmdbKvStore {
    fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let db = self.db(bucket)?;
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        let value = db.get(&rtxn, key).map_err(LmdbError::from)?;
        Ok(value.map(<[u8]>::to_vec))
    }

    fn put(&self, bucket: &str, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        let db = self.db(bucket)?;
        let mut wtxn = self.env.env().write_txn().map_err(LmdbError::from)?;
        db.put(&mut wtxn, key, value).map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn put_batch(&self, bucket: &str, pairs: &[(Vec<u8>, Vec<u8>)]) -> Result<(), StoreError> {
        let db = self.db(bucket)?;
        let mut wtxn = self.env.env().write_txn().map_err(LmdbError::from)?;
        for (key, value) in pairs {
            db.put(&mut wtxn, key, value).map_err(LmdbError::from)?;
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}
