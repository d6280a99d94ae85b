//! Storage Layer - one contract, three paradigms
//!
//! Every backend implements [`StorageBackend`]:
//! - `SqliteStore` - relational; tags in a join table
//! - `DocumentStore` - JSON documents with a native `tags` array
//! - `KvStore` - ordered key-value engine with a hand-maintained tag index
//!
//! Writes happen only inside a bulk load scope. A scope is opened with
//! `begin_bulk_load`, which hands out a [`BulkLoad`] token; the token is
//! consumed by `commit_bulk_load` or `abort_bulk_load`.

pub mod schema;
pub mod sqlite;
pub mod document;
pub mod kv;

pub use sqlite::SqliteStore;
pub use document::DocumentStore;
pub use kv::KvStore;

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use crate::config::StoreConfig;
use crate::proverb::{NewProverb, Proverb, ProverbId};
use crate::{Error, Result};

/// Storage paradigm of a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Relational,
    Document,
    Kv,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Relational => "relational",
            BackendKind::Document => "document",
            BackendKind::Kv => "kv",
        }
    }

    pub fn all() -> &'static [BackendKind] {
        &[BackendKind::Relational, BackendKind::Document, BackendKind::Kv]
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "relational" | "sqlite" | "sql" => Ok(BackendKind::Relational),
            "document" | "doc" | "documents" => Ok(BackendKind::Document),
            "kv" | "embedded" | "embedded-kv" | "keyvalue" => Ok(BackendKind::Kv),
            _ => Err(Error::Config(format!("Unknown backend: {}", s))),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Proof that a bulk load scope is open. Not `Clone`: commit and abort
/// consume it, so a finished scope cannot be reused by accident.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a bulk load must be committed or aborted"]
pub struct BulkLoad {
    scope: u64,
}

impl BulkLoad {
    pub fn scope(&self) -> u64 {
        self.scope
    }
}

/// Capability set every backend provides identically.
///
/// Outside a scope, reads see exactly the committed data. Whether a backend's
/// own reads see staged inserts while a scope is open is unspecified. Result
/// order is backend-natural and carries no meaning.
pub trait StorageBackend {
    fn kind(&self) -> BackendKind;

    /// Open an atomic scope. Fails with `Error::State` if one is already open.
    fn begin_bulk_load(&mut self) -> Result<BulkLoad>;

    /// Stage one proverb in the open scope and return its new identity
    fn insert_proverb(&mut self, scope: &BulkLoad, proverb: &NewProverb) -> Result<ProverbId>;

    /// Make every staged insert durable and visible at once
    fn commit_bulk_load(&mut self, scope: BulkLoad) -> Result<()>;

    /// Drop every staged insert; the store is left as before `begin_bulk_load`
    fn abort_bulk_load(&mut self, scope: BulkLoad) -> Result<()>;

    fn list_all(&self) -> Result<Vec<Proverb>>;

    /// Case-insensitive, unanchored substring match on the text
    fn find_contains(&self, needle: &str) -> Result<Vec<Proverb>>;

    /// Exact, case-sensitive tag membership
    fn find_by_tag(&self, tag: &str) -> Result<Vec<Proverb>>;

    fn count(&self) -> Result<usize>;
}

impl<B: StorageBackend + ?Sized> StorageBackend for Box<B> {
    fn kind(&self) -> BackendKind {
        (**self).kind()
    }

    fn begin_bulk_load(&mut self) -> Result<BulkLoad> {
        (**self).begin_bulk_load()
    }

    fn insert_proverb(&mut self, scope: &BulkLoad, proverb: &NewProverb) -> Result<ProverbId> {
        (**self).insert_proverb(scope, proverb)
    }

    fn commit_bulk_load(&mut self, scope: BulkLoad) -> Result<()> {
        (**self).commit_bulk_load(scope)
    }

    fn abort_bulk_load(&mut self, scope: BulkLoad) -> Result<()> {
        (**self).abort_bulk_load(scope)
    }

    fn list_all(&self) -> Result<Vec<Proverb>> {
        (**self).list_all()
    }

    fn find_contains(&self, needle: &str) -> Result<Vec<Proverb>> {
        (**self).find_contains(needle)
    }

    fn find_by_tag(&self, tag: &str) -> Result<Vec<Proverb>> {
        (**self).find_by_tag(tag)
    }

    fn count(&self) -> Result<usize> {
        (**self).count()
    }
}

/// Open the backend described by `config`
pub fn open_backend(config: &StoreConfig) -> Result<Box<dyn StorageBackend>> {
    tracing::info!("Opening {} backend", config.kind());
    let backend: Box<dyn StorageBackend> = match config {
        StoreConfig::Relational { path } => Box::new(SqliteStore::open(path)?),
        StoreConfig::Document { dir, collection } => Box::new(DocumentStore::open(dir, collection)?),
        StoreConfig::Kv { dir } => Box::new(KvStore::open(dir)?),
    };
    Ok(backend)
}

/// Bookkeeping for the single open scope a backend may have
#[derive(Debug, Default)]
pub(crate) struct ScopeTracker {
    next: u64,
    active: Option<u64>,
}

impl ScopeTracker {
    pub(crate) fn begin(&mut self) -> Result<BulkLoad> {
        if let Some(open) = self.active {
            return Err(Error::State(format!(
                "bulk load {} is still open; commit or abort it first",
                open
            )));
        }
        self.next += 1;
        self.active = Some(self.next);
        tracing::debug!("Bulk load {} opened", self.next);
        Ok(BulkLoad { scope: self.next })
    }

    /// Check that `scope` is the open scope
    pub(crate) fn check(&self, scope: &BulkLoad) -> Result<()> {
        match self.active {
            Some(open) if open == scope.scope => Ok(()),
            Some(open) => Err(Error::State(format!(
                "bulk load {} is not the open scope ({})",
                scope.scope, open
            ))),
            None => Err(Error::State(format!("bulk load {} is not open", scope.scope))),
        }
    }

    /// Close `scope`, which must be the open one
    pub(crate) fn finish(&mut self, scope: &BulkLoad) -> Result<()> {
        self.check(scope)?;
        self.active = None;
        Ok(())
    }

    /// Forget the open scope after the backend has discarded it on its own
    pub(crate) fn reset(&mut self) {
        if let Some(open) = self.active.take() {
            tracing::warn!("Bulk load {} discarded", open);
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        self.active.is_some()
    }
}
