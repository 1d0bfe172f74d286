//! Startup checks on the LMDB data directory.

use std::path::Path;

use heed::types::Bytes;
use heed::Env;

use entangle_store::{ENTANGLE_STATE_BUCKET, ENTANGLE_TX_BUCKET};

use crate::LmdbError;

/// Summary of an integrity check run.
#[derive(Debug, Default)]
pub struct IntegrityReport {
    pub databases_checked: u32,
    pub total_entries: u64,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }
}

const EXPECTED_DATABASES: &[&str] = &[ENTANGLE_TX_BUCKET, ENTANGLE_STATE_BUCKET];

/// Open every known bucket and count its entries. Read failures land in
/// the report instead of failing the call; a missing bucket is fine.
pub fn check_integrity(env: &Env) -> Result<IntegrityReport, LmdbError> {
    let mut report = IntegrityReport::default();
    let rtxn = env.read_txn()?;

    for &name in EXPECTED_DATABASES {
        match env.open_database::<Bytes, Bytes>(&rtxn, Some(name)) {
            Ok(Some(db)) => {
                report.databases_checked += 1;
                match db.len(&rtxn) {
                    Ok(count) => report.total_entries += count,
                    Err(e) => report
                        .errors
                        .push(format!("failed to read database '{name}': {e}")),
                }
            }
            Ok(None) => {}
            Err(e) => report
                .errors
                .push(format!("failed to open database '{name}': {e}")),
        }
    }

    Ok(report)
}

/// A fresh (nonexistent) directory is fine. An existing directory without
/// `data.mdb` is not.
pub fn check_data_dir(path: &Path) -> Result<(), String> {
    if !path.exists() {
        return Ok(());
    }
    if path.read_dir().map(|mut d| d.next().is_none()).unwrap_or(false) {
        return Ok(());
    }
    let data_file = path.join("data.mdb");
    if !data_file.exists() {
        return Err(format!(
            "LMDB directory exists but data.mdb is missing at {}",
            path.display()
        ));
    }
    Ok(())
}
