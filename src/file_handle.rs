// src/file_handle.rs
//
// =============================================================================
// DURALOG: FILE HANDLE MANAGER
// =============================================================================
//
// Owns the single append-mode descriptor the committer writes through, plus
// the inode identity recorded at open time. No other component reads or
// writes through this descriptor.

use std::fs::{self, File, OpenOptions};
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use crate::error::DuraLogError;

pub struct FileHandle {
    path: PathBuf,
    file: Option<File>,
    inode: u64,
}

impl FileHandle {
    /// Creates parent directories if missing, opens `path` in append mode,
    /// and caches its inode.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DuraLogError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| DuraLogError::io(&path, e))?;
            }
        }

        let mut handle = FileHandle {
            path,
            file: None,
            inode: 0,
        };
        handle.reopen()?;
        Ok(handle)
    }

    fn reopen(&mut self) -> Result<(), DuraLogError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&self.path)
            .map_err(|e| DuraLogError::io(&self.path, e))?;
        let metadata = file.metadata().map_err(|e| DuraLogError::io(&self.path, e))?;
        self.inode = metadata.ino();
        self.file = Some(file);
        log::debug!("opened log file {:?} (inode {})", self.path, self.inode);
        Ok(())
    }

    /// Stats the path by name; if it no longer exists or its inode differs
    /// from the one we have open, reopens. Supports external rename+recreate
    /// log rotation.
    pub fn ensure_current(&mut self) -> Result<(), DuraLogError> {
        let reopen_needed = match fs::metadata(&self.path) {
            Ok(metadata) => metadata.ino() != self.inode,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => return Err(DuraLogError::io(&self.path, e)),
        };

        if reopen_needed {
            log::warn!(
                "log file {:?} rotated out from under the writer, reopening",
                self.path
            );
            self.reopen()?;
        }
        Ok(())
    }

    pub fn file_mut(&mut self) -> &mut File {
        self.file.as_mut().expect("FileHandle always holds an open file")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Releases the descriptor. Idempotent.
    pub fn close(&mut self) {
        self.file = None;
    }
}
