//! Proverb store on top of the key-value engine.
//!
//! Key layout:
//! - `meta/next_id` -> next identity, u64 big-endian
//! - `proverb/<id>` -> JSON `{text, tags}`; `<id>` is a big-endian u64 so the
//!   primary store scans in insertion order
//! - `tag/<len><tag><id>` -> empty; the secondary index. `<len>` is the tag's
//!   byte length as a big-endian u32, which keeps `go` and `gopher` in
//!   disjoint ranges.
//!
//! A scope stages a single `WriteBatch`. Each insert adds its primary record
//! and its index entries to that batch and commit adds the id counter, so the
//! index and the records it points at are always written together.

use std::collections::BTreeSet;
use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::proverb::{NewProverb, Proverb, ProverbId};
use crate::{Error, Result};
use crate::storage::{BackendKind, BulkLoad, ScopeTracker, StorageBackend};
use super::engine::{KvEngine, WriteBatch};

const NEXT_ID_KEY: &[u8] = b"meta/next_id";
const PROVERB_PREFIX: &[u8] = b"proverb/";
const TAG_PREFIX: &[u8] = b"tag/";

const FIRST_ID: u64 = 1;

#[derive(Serialize, Deserialize)]
struct StoredProverb {
    text: String,
    tags: BTreeSet<String>,
}

fn proverb_key(id: u64) -> Vec<u8> {
    let mut key = PROVERB_PREFIX.to_vec();
    key.extend_from_slice(&id.to_be_bytes());
    key
}

fn tag_prefix(tag: &str) -> Vec<u8> {
    let mut key = TAG_PREFIX.to_vec();
    key.extend_from_slice(&(tag.len() as u32).to_be_bytes());
    key.extend_from_slice(tag.as_bytes());
    key
}

fn tag_key(tag: &str, id: u64) -> Vec<u8> {
    let mut key = tag_prefix(tag);
    key.extend_from_slice(&id.to_be_bytes());
    key
}

/// Trailing big-endian id of a primary or index key
fn id_suffix(key: &[u8], prefix_len: usize) -> Option<u64> {
    let bytes: [u8; 8] = key.get(prefix_len..)?.try_into().ok()?;
    Some(u64::from_be_bytes(bytes))
}

struct Pending {
    batch: WriteBatch,
    next_id: u64,
}

/// Embedded key-value proverb store
pub struct KvStore {
    engine: KvEngine,
    pending: Option<Pending>,
    scopes: ScopeTracker,
}

impl KvStore {
    pub fn open(dir: &Path) -> Result<Self> {
        let engine = KvEngine::open(dir)
            .map_err(|e| Error::Connection(format!("cannot open key-value store in {}: {}", dir.display(), e)))?;
        let store = Self { engine, pending: None, scopes: ScopeTracker::default() };
        store.next_id()?;
        tracing::info!("Opened key-value store at {}", store.engine.path().display());
        Ok(store)
    }

    fn next_id(&self) -> Result<u64> {
        match self.engine.get(NEXT_ID_KEY) {
            None => Ok(FIRST_ID),
            Some(raw) => raw
                .try_into()
                .map(u64::from_be_bytes)
                .map_err(|_| Error::Connection("corrupt id counter".to_string())),
        }
    }

    fn decode(&self, id: u64, raw: &[u8]) -> Result<Proverb> {
        let stored: StoredProverb = serde_json::from_slice(raw)
            .map_err(|e| Error::Query(format!("proverb {} is unreadable: {}", id, e)))?;
        Ok(Proverb { id: ProverbId::new(id.to_string()), text: stored.text, tags: stored.tags })
    }

    fn scan_proverbs(&self) -> impl Iterator<Item = Result<Proverb>> + '_ {
        self.engine.scan_prefix(PROVERB_PREFIX).map(move |(key, raw)| {
            let id = id_suffix(key, PROVERB_PREFIX.len())
                .ok_or_else(|| Error::Query("malformed primary key".to_string()))?;
            self.decode(id, raw)
        })
    }
}

impl StorageBackend for KvStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Kv
    }

    fn begin_bulk_load(&mut self) -> Result<BulkLoad> {
        let next_id = self.next_id()?;
        let scope = self.scopes.begin()?;
        self.pending = Some(Pending { batch: WriteBatch::new(), next_id });
        Ok(scope)
    }

    fn insert_proverb(&mut self, scope: &BulkLoad, proverb: &NewProverb) -> Result<ProverbId> {
        self.scopes.check(scope)?;
        let pending = self
            .pending
            .as_mut()
            .ok_or_else(|| Error::State("no staged batch for open scope".to_string()))?;

        let stored = StoredProverb { text: proverb.text().to_string(), tags: proverb.tags().clone() };
        let value = serde_json::to_vec(&stored).map_err(|e| Error::Write(e.to_string()))?;

        let id = pending.next_id;
        pending.next_id += 1;
        pending.batch.put(proverb_key(id), value);
        for tag in proverb.tags() {
            pending.batch.put(tag_key(tag, id), Vec::new());
        }
        Ok(ProverbId::new(id.to_string()))
    }

    fn commit_bulk_load(&mut self, scope: BulkLoad) -> Result<()> {
        self.scopes.check(&scope)?;
        let Some(Pending { mut batch, next_id }) = self.pending.take() else {
            return Err(Error::State("no staged batch for open scope".to_string()));
        };
        if !batch.is_empty() {
            batch.put(NEXT_ID_KEY.to_vec(), next_id.to_be_bytes().to_vec());
        }
        let ops = batch.len();

        if let Err(e) = self.engine.write(batch) {
            self.scopes.reset();
            return Err(Error::Connection(format!(
                "cannot append to {}: {}",
                self.engine.path().display(),
                e
            )));
        }
        self.scopes.finish(&scope)?;
        tracing::info!("Committed bulk load {} ({} keys)", scope.scope(), ops);
        Ok(())
    }

    fn abort_bulk_load(&mut self, scope: BulkLoad) -> Result<()> {
        self.scopes.finish(&scope)?;
        if let Some(pending) = self.pending.take() {
            tracing::debug!("Discarded {} staged keys", pending.batch.len());
        }
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<Proverb>> {
        self.scan_proverbs().collect()
    }

    /// Full scan of the primary store; there is no text index
    fn find_contains(&self, needle: &str) -> Result<Vec<Proverb>> {
        self.scan_proverbs()
            .filter(|p| p.as_ref().map_or(true, |p| p.matches_text(needle)))
            .collect()
    }

    fn find_by_tag(&self, tag: &str) -> Result<Vec<Proverb>> {
        let prefix = tag_prefix(tag);
        self.engine
            .scan_prefix(&prefix)
            .map(|(key, _)| {
                let id = id_suffix(key, prefix.len())
                    .ok_or_else(|| Error::Query(format!("malformed index key for tag {:?}", tag)))?;
                let raw = self.engine.get(&proverb_key(id)).ok_or_else(|| {
                    Error::Query(format!("tag index for {:?} points at missing proverb {}", tag, id))
                })?;
                self.decode(id, raw)
            })
            .collect()
    }

    fn count(&self) -> Result<usize> {
        Ok(self.engine.scan_prefix(PROVERB_PREFIX).count())
    }
}
