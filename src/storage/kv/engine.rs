//! Embedded ordered key-value engine.
//!
//! State is a `BTreeMap` rebuilt on open by replaying an append-only log of
//! write batches. A batch is one checksummed frame appended and synced in a
//! single write, so after a crash it is either fully replayed or dropped as a
//! torn tail. There is no query language: callers get point lookups and
//! ordered prefix scans.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Error as IoError, ErrorKind, Read, Result as IoResult, Write};
use std::path::{Path, PathBuf};
use super::codec::{self, HEADER_LEN, Op};
use super::lock::FileLock;

const LOG_FILE: &str = "store.log";

/// Writes that become visible together
#[derive(Debug, Default)]
pub struct WriteBatch {
    ops: Vec<Op>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.ops.push((key.into(), value.into()));
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

pub struct KvEngine {
    path: PathBuf,
    log: File,
    log_len: u64,
    map: BTreeMap<Vec<u8>, Vec<u8>>,
    _lock: FileLock,
}

impl KvEngine {
    /// Open or create the store in `dir`, replaying its log.
    ///
    /// # Errors
    /// - `ErrorKind::WouldBlock` if another handle holds the directory lock
    /// - `ErrorKind::InvalidData` if the log is corrupt before its tail
    pub fn open(dir: &Path) -> IoResult<Self> {
        fs::create_dir_all(dir)?;
        let lock = FileLock::acquire(dir)?;
        let path = dir.join(LOG_FILE);

        let mut log = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)?;

        let mut bytes = Vec::new();
        log.read_to_end(&mut bytes)?;

        let mut map = BTreeMap::new();
        let log_len = if bytes.is_empty() {
            let mut header = Vec::with_capacity(HEADER_LEN);
            codec::write_header(&mut header)?;
            log.write_all(&header)?;
            log.sync_all()?;
            HEADER_LEN as u64
        } else {
            if bytes.len() < HEADER_LEN {
                return Err(IoError::new(ErrorKind::InvalidData, "log header truncated"));
            }
            codec::read_header(&mut &bytes[..HEADER_LEN])?;
            let replay = codec::read_frames(&bytes[HEADER_LEN..])?;
            for batch in replay.batches {
                map.extend(batch);
            }

            let valid = (HEADER_LEN + replay.valid_len) as u64;
            if replay.torn {
                tracing::warn!(
                    "Discarding torn tail of {} ({} bytes)",
                    path.display(),
                    bytes.len() as u64 - valid
                );
                log.set_len(valid)?;
                log.sync_all()?;
            }
            valid
        };

        tracing::debug!("Opened key-value log {} ({} keys)", path.display(), map.len());
        Ok(Self { path, log, log_len, map, _lock: lock })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.map.get(key).map(Vec::as_slice)
    }

    /// Entries whose key starts with `prefix`, in key order
    pub fn scan_prefix<'a>(&'a self, prefix: &'a [u8]) -> impl Iterator<Item = (&'a [u8], &'a [u8])> + 'a {
        self.map
            .range(prefix.to_vec()..)
            .take_while(move |(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Durably apply `batch`. Nothing is visible unless the whole batch is.
    pub fn write(&mut self, batch: WriteBatch) -> IoResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let frame = codec::encode_frame(&batch.ops);
        let appended = self
            .log
            .write_all(&frame)
            .and_then(|_| self.log.sync_data());

        if let Err(e) = appended {
            // Cut back to the last good frame so nothing follows a torn one
            if let Err(trunc) = self.log.set_len(self.log_len) {
                tracing::warn!("Could not truncate {} after failed write: {}", self.path.display(), trunc);
            }
            return Err(e);
        }

        self.log_len += frame.len() as u64;
        self.map.extend(batch.ops);
        Ok(())
    }
}
