//! LMDB environment setup.

use std::path::{Path, PathBuf};

use heed::{Env, EnvOpenOptions};
use tracing::info;

use crate::integrity::check_data_dir;
use crate::LmdbError;

/// Named databases the environment may hold.
pub const MAX_DBS: u32 = 8;

/// An open LMDB environment rooted at a data directory.
pub struct LmdbEnvironment {
    env: Env,
    path: PathBuf,
}

impl LmdbEnvironment {
    /// Open or create an environment at `path`, creating the directory when
    /// it does not exist yet.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        check_data_dir(path).map_err(LmdbError::DataDir)?;
        std::fs::create_dir_all(path)?;
        // SAFETY: the environment is opened once per process for this path
        // and never mapped twice concurrently.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };
        info!(path = %path.display(), map_size, "LMDB environment opened");
        Ok(Self {
            env,
            path: path.to_path_buf(),
        })
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
