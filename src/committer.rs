// src/committer.rs
//
// =============================================================================
// DURALOG: COMMITTER
// =============================================================================
//
// The single background worker: wakes on a fixed interval or a shutdown
// signal, drains the queue, encodes the batch, takes the advisory lock,
// writes, flushes, fsyncs, unlocks.
//
// Implementation note (see DESIGN.md / SPEC_FULL.md §9 "Open questions"):
// the committer thread itself performs the final synchronous commit cycle
// just before it exits, rather than handing the queue back to the caller's
// thread — it is the sole owner of the `SubmissionQueue` receiver, and
// `close()` already blocks on `JoinHandle::join` until that final cycle has
// run, which is observably identical to "the caller performs one final
// commit before returning". Committer I/O errors are cached and surfaced
// from `close()` rather than reported to producers, matching the source.

use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::codec::encode;
use crate::error::DuraLogError;
use crate::file_handle::FileHandle;
use crate::queue::SubmissionQueue;

struct ShutdownSignal {
    requested: Mutex<bool>,
    condvar: Condvar,
}

impl ShutdownSignal {
    fn new() -> Self {
        ShutdownSignal {
            requested: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    fn signal(&self) {
        let mut requested = self.requested.lock().unwrap();
        *requested = true;
        self.condvar.notify_all();
    }

    /// Waits up to `interval` for a shutdown signal. Returns `true` if shut
    /// down was requested, `false` if the interval simply elapsed.
    fn wait(&self, interval: Duration) -> bool {
        let requested = self.requested.lock().unwrap();
        let (guard, _timeout) = self
            .condvar
            .wait_timeout_while(requested, interval, |r| !*r)
            .unwrap();
        *guard
    }
}

pub struct Committer {
    shutdown: Arc<ShutdownSignal>,
    thread: Option<JoinHandle<()>>,
    last_error: Arc<Mutex<Option<DuraLogError>>>,
}

impl Committer {
    /// Spawns the background worker thread.
    pub fn spawn(
        file: Arc<Mutex<FileHandle>>,
        queue: SubmissionQueue,
        path: PathBuf,
        commit_interval: Duration,
    ) -> Self {
        let shutdown = Arc::new(ShutdownSignal::new());
        let last_error = Arc::new(Mutex::new(None));

        let thread_shutdown = Arc::clone(&shutdown);
        let thread_last_error = Arc::clone(&last_error);
        let thread = std::thread::spawn(move || {
            loop {
                let shutdown_requested = thread_shutdown.wait(commit_interval);
                if let Err(e) = commit_cycle(&file, &queue, &path) {
                    log::error!("commit cycle failed for {:?}: {e}", path);
                    *thread_last_error.lock().unwrap() = Some(e);
                }
                if shutdown_requested {
                    break;
                }
            }
        });

        Committer {
            shutdown,
            thread: Some(thread),
            last_error,
        }
    }

    /// Signals shutdown and blocks until the committer thread's final commit
    /// cycle has completed. Idempotent: a second call is a no-op.
    pub fn shutdown_and_join(&mut self) -> Result<(), DuraLogError> {
        if let Some(thread) = self.thread.take() {
            self.shutdown.signal();
            let _ = thread.join();
        }
        if let Some(err) = self.last_error.lock().unwrap().take() {
            return Err(err);
        }
        Ok(())
    }
}

/// One drain-encode-lock-write-fsync-unlock pass. Returns the number of
/// records committed (`0` if the queue was empty).
fn commit_cycle(
    file: &Mutex<FileHandle>,
    queue: &SubmissionQueue,
    path: &std::path::Path,
) -> Result<usize, DuraLogError> {
    let drained = queue.drain_nowait();
    if drained.is_empty() {
        return Ok(0);
    }

    let mut batch = Vec::new();
    for record in &drained {
        batch.extend(encode(record));
    }
    let bytes_written = batch.len();

    use fs2::FileExt;

    // The advisory lock is acquired on a cloned descriptor *before* the
    // process-internal mutex is taken: a peer process can hold the flock for
    // an unbounded time, and that wait must not block every other thread in
    // this process behind the same mutex. Only the rotation check and the
    // write/flush/fsync below run with the mutex held.
    let lock_file = {
        let mut guard = file.lock().unwrap();
        guard
            .file_mut()
            .try_clone()
            .map_err(|e| DuraLogError::io(path, e))?
    };
    lock_file
        .lock_exclusive()
        .map_err(|e| DuraLogError::io(path, e))?;

    let result: Result<(), DuraLogError> = (|| {
        let mut guard = file.lock().unwrap();
        guard.ensure_current()?;
        let f = guard.file_mut();
        std::io::Write::write_all(f, &batch).map_err(|e| DuraLogError::io(path, e))?;
        std::io::Write::flush(f).map_err(|e| DuraLogError::io(path, e))?;
        f.sync_all().map_err(|e| DuraLogError::io(path, e))?;
        Ok(())
    })();

    let _ = lock_file.unlock();

    result?;
    log::debug!(
        "commit cycle wrote {} record(s), {bytes_written} byte(s) to {:?}",
        drained.len(),
        path
    );
    Ok(drained.len())
}
