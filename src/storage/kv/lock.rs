//! Exclusive directory lock so only one handle owns a key-value store.
//!
//! Released when the lock file is closed on drop.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Error as IoError, ErrorKind, Result as IoResult};
use std::path::Path;

const LOCK_FILE: &str = ".lock";

#[derive(Debug)]
pub struct FileLock {
    _file: File,
}

impl FileLock {
    /// Take the lock on `dir`, failing with `ErrorKind::WouldBlock` if
    /// another handle holds it.
    pub fn acquire(dir: &Path) -> IoResult<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))?;

        file.try_lock_exclusive().map_err(|err| {
            if err.raw_os_error() == fs2::lock_contended_error().raw_os_error() {
                IoError::new(ErrorKind::WouldBlock, "store is locked by another handle")
            } else {
                err
            }
        })?;

        Ok(Self { _file: file })
    }
}
