// src/durlog.rs
//
// =============================================================================
// DURALOG: LIFECYCLE FAÇADE
// =============================================================================
//
// `DuraLogConfig` + `DuraLog`: construction, configuration validation,
// `append`/`append_value`/`replay`/`close`. Wires the submission queue, file
// handle, and committer thread together; every other module in this crate is
// an implementation detail behind this type.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::codec::Record;
use crate::committer::Committer;
use crate::error::DuraLogError;
use crate::file_handle::FileHandle;
use crate::queue::{QueueHandle, SubmissionQueue};
use crate::replay::Replay;

/// Construction parameters for a [`DuraLog`].
#[derive(Debug, Clone)]
pub struct DuraLogConfig {
    pub commit_interval: Duration,
    pub max_queue_size: usize,
}

impl Default for DuraLogConfig {
    fn default() -> Self {
        DuraLogConfig {
            commit_interval: Duration::from_secs(1),
            max_queue_size: 100_000,
        }
    }
}

impl DuraLogConfig {
    fn validate(&self) -> Result<(), DuraLogError> {
        if self.commit_interval.is_zero() {
            return Err(DuraLogError::Configuration(
                "commit_interval must be positive".into(),
            ));
        }
        if self.max_queue_size == 0 {
            return Err(DuraLogError::Configuration(
                "max_queue_size must be nonzero".into(),
            ));
        }
        Ok(())
    }
}

/// Fails with `Configuration`, not `Io`, if `path`'s parent directory cannot
/// be created — this runs before any thread is spawned or file is opened.
fn ensure_parent_creatable(path: &Path) -> Result<(), DuraLogError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                DuraLogError::Configuration(format!(
                    "parent directory {parent:?} of {path:?} is not creatable: {e}"
                ))
            })?;
        }
    }
    Ok(())
}

/// An embeddable, crash-resilient append-only log.
///
/// Append from any thread; a dedicated background thread batches, locks,
/// writes, and fsyncs on a fixed interval; `replay()` gives a point-in-time,
/// corruption-tolerant scan; `close()` flushes everything queued and must be
/// called exactly once.
pub struct DuraLog {
    path: PathBuf,
    queue_handle: QueueHandle,
    committer: Mutex<Option<Committer>>,
}

impl DuraLog {
    /// Opens (creating if missing) the log at `path` and starts the
    /// background committer.
    pub fn open(path: impl AsRef<Path>) -> Result<Arc<Self>, DuraLogError> {
        Self::open_with_config(path, DuraLogConfig::default())
    }

    /// Same as [`DuraLog::open`] with explicit commit interval / queue
    /// capacity.
    pub fn open_with_config(
        path: impl AsRef<Path>,
        config: DuraLogConfig,
    ) -> Result<Arc<Self>, DuraLogError> {
        config.validate()?;
        let path = path.as_ref().to_path_buf();
        ensure_parent_creatable(&path)?;

        let file_handle = FileHandle::open(&path)?;
        let file = Arc::new(Mutex::new(file_handle));
        let (queue_handle, queue) = SubmissionQueue::bounded(config.max_queue_size);

        let committer = Committer::spawn(file, queue, path.clone(), config.commit_interval);

        log::debug!(
            "DuraLog opened at {:?} (commit_interval={:?}, max_queue_size={})",
            path,
            config.commit_interval,
            config.max_queue_size
        );

        Ok(Arc::new(DuraLog {
            path,
            queue_handle,
            committer: Mutex::new(Some(committer)),
        }))
    }

    /// Appends a record built from a typed [`Record`]. Infallible: the
    /// `Record` type itself already rules out the "wrong input shape" case
    /// the spec calls a programmer error.
    pub fn append(&self, record: impl Into<Record>) {
        self.queue_handle.put(record.into());
    }

    /// Appends any `Serialize` value, dynamically routing it to `Record::Json`
    /// (when it serializes to a JSON object) or `Record::Text` (when it's a
    /// string). Any other shape — arrays, numbers, booleans, null — is a
    /// programmer error, matching the dynamically-typed source's runtime
    /// check on `append`'s input.
    pub fn append_value<T: serde::Serialize>(&self, value: &T) -> Result<(), DuraLogError> {
        let json = serde_json::to_value(value).map_err(|e| {
            DuraLogError::Programmer(format!("value could not be serialized to JSON: {e}"))
        })?;
        let record = match json {
            serde_json::Value::Object(map) => Record::Json(map),
            serde_json::Value::String(s) => Record::Text(s),
            other => {
                return Err(DuraLogError::Programmer(format!(
                    "append() requires a structured map or a string, got {other}"
                )))
            }
        };
        self.queue_handle.put(record);
        Ok(())
    }

    /// Returns a lazy, finite, corruption-tolerant iterator over every
    /// well-formed record committed to disk before this call.
    pub fn replay(&self) -> Result<Replay, DuraLogError> {
        Replay::open(&self.path)
    }

    /// Flushes all queued records and shuts down the committer thread.
    /// Idempotent: safe to call more than once.
    pub fn close(&self) -> Result<(), DuraLogError> {
        let mut slot = self.committer.lock().unwrap();
        if let Some(mut committer) = slot.take() {
            committer.shutdown_and_join()
        } else {
            Ok(())
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DuraLog {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::error!("error flushing DuraLog at {:?} during drop: {e}", self.path);
        }
    }
}
