//! Document storage - one JSON document per proverb
//!
//! Document shape: `{"_id": "<uuid>", "text": "...", "tags": ["...", ...]}`.
//! Inserts are staged for the lifetime of a bulk load scope and handed to the
//! collection in a single atomic `insert_many` on commit.

pub mod collection;
pub mod filter;

pub use collection::{Collection, Document};
pub use filter::Filter;

use std::path::Path;
use serde_json::Value;
use uuid::Uuid;
use crate::proverb::{NewProverb, Proverb, ProverbId};
use crate::{Error, Result};
use super::{BackendKind, BulkLoad, ScopeTracker, StorageBackend};

const ID_FIELD: &str = "_id";
const TEXT_FIELD: &str = "text";
const TAGS_FIELD: &str = "tags";

/// Document-oriented proverb store
pub struct DocumentStore {
    collection: Collection,
    staged: Vec<Document>,
    scopes: ScopeTracker,
}

impl DocumentStore {
    pub fn open(dir: &Path, collection: &str) -> Result<Self> {
        let collection = Collection::open(dir, collection).map_err(|e| {
            Error::Connection(format!("cannot open collection {:?} in {}: {}", collection, dir.display(), e))
        })?;
        tracing::info!(
            "Opened document collection {} ({} documents)",
            collection.name(),
            collection.len()
        );
        Ok(Self { collection, staged: Vec::new(), scopes: ScopeTracker::default() })
    }

    fn find(&self, filter: &Filter) -> Result<Vec<Proverb>> {
        self.collection.find(filter).iter().map(from_document).collect()
    }
}

fn to_document(id: &ProverbId, proverb: &NewProverb) -> Document {
    let tags: Vec<Value> = proverb.tags().iter().map(|t| Value::from(t.as_str())).collect();
    let mut doc = Document::new();
    doc.insert(ID_FIELD.to_string(), Value::from(id.as_str()));
    doc.insert(TEXT_FIELD.to_string(), Value::from(proverb.text()));
    doc.insert(TAGS_FIELD.to_string(), Value::Array(tags));
    doc
}

fn from_document(doc: &Document) -> Result<Proverb> {
    let field = |name: &str| {
        doc.get(name)
            .ok_or_else(|| Error::Query(format!("document is missing {:?}", name)))
    };
    let id = field(ID_FIELD)?
        .as_str()
        .ok_or_else(|| Error::Query("document _id is not a string".to_string()))?;
    let text = field(TEXT_FIELD)?
        .as_str()
        .ok_or_else(|| Error::Query(format!("document {} has non-string text", id)))?;
    let tags = serde_json::from_value(field(TAGS_FIELD)?.clone())
        .map_err(|e| Error::Query(format!("document {} has malformed tags: {}", id, e)))?;

    Ok(Proverb { id: ProverbId::new(id), text: text.to_string(), tags })
}

impl StorageBackend for DocumentStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Document
    }

    fn begin_bulk_load(&mut self) -> Result<BulkLoad> {
        let scope = self.scopes.begin()?;
        self.staged.clear();
        Ok(scope)
    }

    fn insert_proverb(&mut self, scope: &BulkLoad, proverb: &NewProverb) -> Result<ProverbId> {
        self.scopes.check(scope)?;
        let id = ProverbId::new(Uuid::new_v4().simple().to_string());
        let doc = to_document(&id, proverb);
        Collection::validate(&doc).map_err(Error::Write)?;
        self.staged.push(doc);
        Ok(id)
    }

    fn commit_bulk_load(&mut self, scope: BulkLoad) -> Result<()> {
        self.scopes.check(&scope)?;
        let staged = std::mem::take(&mut self.staged);
        let count = staged.len();
        if let Err(e) = self.collection.insert_many(staged) {
            self.scopes.reset();
            return Err(Error::Connection(format!(
                "cannot write {}: {}",
                self.collection.path().display(),
                e
            )));
        }
        self.scopes.finish(&scope)?;
        tracing::info!("Committed bulk load {} ({} documents)", scope.scope(), count);
        Ok(())
    }

    fn abort_bulk_load(&mut self, scope: BulkLoad) -> Result<()> {
        self.scopes.finish(&scope)?;
        tracing::debug!("Discarded {} staged documents", self.staged.len());
        self.staged.clear();
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<Proverb>> {
        self.find(&Filter::All)
    }

    fn find_contains(&self, needle: &str) -> Result<Vec<Proverb>> {
        let filter = Filter::contains_ignore_case(TEXT_FIELD, needle)
            .map_err(|e| Error::Query(format!("cannot build pattern: {}", e)))?;
        self.find(&filter)
    }

    fn find_by_tag(&self, tag: &str) -> Result<Vec<Proverb>> {
        self.find(&Filter::array_contains(TAGS_FIELD, tag))
    }

    fn count(&self) -> Result<usize> {
        Ok(self.collection.len())
    }
}
