// src/registry.rs
//
// =============================================================================
// DURALOG: PROCESS-GLOBAL ACCESSOR (optional façade)
// =============================================================================
//
// The core (`DuraLog::open`) hands the caller an explicit handle — no hidden
// global state. This module is the opt-in shell for callers who want the
// source's "reconstructing with the same path observes the existing
// instance" policy without forcing every caller through a singleton. Callers
// who don't need that can ignore this module entirely.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, Weak};

use crate::durlog::{DuraLog, DuraLogConfig};
use crate::error::DuraLogError;

type Registry = Mutex<HashMap<PathBuf, Weak<DuraLog>>>;

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Returns the live `DuraLog` for `path` if one is already open in this
/// process, otherwise opens a new one with `config` and registers it.
///
/// Only one instance per process per path: a second call with the same path
/// (while the first instance is still alive) returns a clone of the same
/// `Arc`, regardless of the `config` passed the second time.
pub fn get_or_open(
    path: impl AsRef<Path>,
    config: DuraLogConfig,
) -> Result<Arc<DuraLog>, DuraLogError> {
    let path = path.as_ref().to_path_buf();
    let mut table = registry().lock().unwrap();

    if let Some(existing) = table.get(&path).and_then(Weak::upgrade) {
        return Ok(existing);
    }

    let log = DuraLog::open_with_config(&path, config)?;
    table.insert(path, Arc::downgrade(&log));
    Ok(log)
}
