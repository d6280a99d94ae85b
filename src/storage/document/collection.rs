//! A named collection of JSON documents persisted as a single file.
//!
//! Exposes the two capabilities a document server offers over its wire
//! protocol: insert documents and find by predicate. `insert_many` is atomic:
//! the new file is written under a temporary name, synced, then renamed over
//! the old one, so a reader sees the whole batch or none of it.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Error as IoError, ErrorKind, Result as IoResult, Write};
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;
use super::filter::Filter;

pub type Document = Map<String, Value>;

/// On-disk format version
const FORMAT_VERSION: u32 = 1;

/// Largest accepted serialized document
pub const MAX_DOCUMENT_BYTES: usize = 16 * 1024 * 1024;

#[derive(Deserialize)]
struct CollectionFile {
    format: u32,
    documents: Vec<Document>,
}

#[derive(Serialize)]
struct CollectionFileRef<'a> {
    format: u32,
    documents: &'a [Document],
}

#[derive(Debug)]
pub struct Collection {
    name: String,
    path: PathBuf,
    documents: Vec<Document>,
}

impl Collection {
    /// Open `<dir>/<name>.json`, creating the directory if needed
    pub fn open(dir: &Path, name: &str) -> IoResult<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.json", name));

        let documents = if path.exists() {
            let file: CollectionFile = serde_json::from_slice(&fs::read(&path)?)
                .map_err(|e| IoError::new(ErrorKind::InvalidData, format!("{}: {}", path.display(), e)))?;
            if file.format != FORMAT_VERSION {
                return Err(IoError::new(
                    ErrorKind::InvalidData,
                    format!("unsupported collection format {} (expected {})", file.format, FORMAT_VERSION),
                ));
            }
            file.documents
        } else {
            Vec::new()
        };

        Ok(Self { name: name.to_string(), path, documents })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Check a document would be accepted by `insert_many`
    pub fn validate(doc: &Document) -> Result<(), String> {
        if !doc.get("_id").is_some_and(Value::is_string) {
            return Err("document has no string _id".to_string());
        }
        let size = serde_json::to_vec(doc).map_err(|e| e.to_string())?.len();
        if size > MAX_DOCUMENT_BYTES {
            return Err(format!("document is {} bytes (limit {})", size, MAX_DOCUMENT_BYTES));
        }
        Ok(())
    }

    /// Append `docs` atomically. On error the collection is unchanged.
    pub fn insert_many(&mut self, docs: Vec<Document>) -> IoResult<()> {
        if docs.is_empty() {
            return Ok(());
        }
        let mut next = self.documents.clone();
        next.extend(docs);
        self.write_file(&next)?;
        self.documents = next;
        Ok(())
    }

    /// Documents matching `filter`, in insertion order
    pub fn find(&self, filter: &Filter) -> Vec<Document> {
        self.documents.iter().filter(|d| filter.matches(d)).cloned().collect()
    }

    fn write_file(&self, documents: &[Document]) -> IoResult<()> {
        let temp_path = self.path.with_extension(format!("json.tmp.{}", Uuid::new_v4()));
        let result = (|| {
            let file = OpenOptions::new().write(true).create_new(true).open(&temp_path)?;
            let mut writer = BufWriter::new(file);
            let body = CollectionFileRef { format: FORMAT_VERSION, documents };
            serde_json::to_writer(&mut writer, &body).map_err(IoError::other)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
            fs::rename(&temp_path, &self.path)?;
            sync_dir(&self.path)
        })();

        if result.is_err() && temp_path.exists() {
            let _ = fs::remove_file(&temp_path);
        }
        result
    }
}

/// Make the rename itself durable
#[cfg(unix)]
fn sync_dir(path: &Path) -> IoResult<()> {
    if let Some(parent) = path.parent() {
        File::open(parent)?.sync_all()?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_path: &Path) -> IoResult<()> {
    Ok(())
}
