//! Query engine implementation
//!
//! Provides the read operations every backend answers the same way:
//! - Listing the whole store
//! - Case-insensitive substring search on the text
//! - Exact tag membership
//! - Tag counts and store statistics
//!
//! Results coming back from a backend are filtered again here, so a backend
//! that over-matches cannot change what callers see.

use std::collections::BTreeMap;
use serde::Serialize;
use crate::{Error, Result};
use crate::proverb::Proverb;
use crate::storage::{BackendKind, StorageBackend};

/// Summary of what a store holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub backend: BackendKind,
    pub proverbs: usize,
    pub distinct_tags: usize,
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} backend: {} proverbs, {} distinct tags",
            self.backend, self.proverbs, self.distinct_tags
        )
    }
}

/// Query engine over one open backend
pub struct QueryEngine<'a> {
    backend: &'a dyn StorageBackend,
}

impl<'a> QueryEngine<'a> {
    pub fn new(backend: &'a dyn StorageBackend) -> Self {
        Self { backend }
    }

    /// Every stored proverb
    pub fn all(&self) -> Result<Vec<Proverb>> {
        self.backend.list_all().map_err(wrap)
    }

    /// Proverbs whose text contains `needle`, ignoring case.
    ///
    /// An empty needle matches everything.
    pub fn contains(&self, needle: &str) -> Result<Vec<Proverb>> {
        if needle.is_empty() {
            return self.all();
        }
        let mut found = self.backend.find_contains(needle).map_err(wrap)?;
        found.retain(|p| p.matches_text(needle));
        tracing::debug!("contains {:?}: {} matches", needle, found.len());
        Ok(found)
    }

    /// Proverbs carrying exactly `tag`. An empty tag matches nothing.
    pub fn tagged(&self, tag: &str) -> Result<Vec<Proverb>> {
        if tag.is_empty() {
            return Ok(Vec::new());
        }
        let mut found = self.backend.find_by_tag(tag).map_err(wrap)?;
        found.retain(|p| p.has_tag(tag));
        tracing::debug!("tagged {:?}: {} matches", tag, found.len());
        Ok(found)
    }

    /// Each distinct tag with the number of proverbs carrying it, sorted by tag
    pub fn tag_counts(&self) -> Result<Vec<(String, usize)>> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for proverb in self.all()? {
            for tag in proverb.tags {
                *counts.entry(tag).or_default() += 1;
            }
        }
        Ok(counts.into_iter().collect())
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let proverbs = self.backend.count().map_err(wrap)?;
        let distinct_tags = self.tag_counts()?.len();
        Ok(StoreStats { backend: self.backend.kind(), proverbs, distinct_tags })
    }
}

/// Anything but a lost connection is reported as a query failure
fn wrap(err: Error) -> Error {
    match err {
        Error::Connection(_) | Error::Query(_) => err,
        other => Error::Query(other.to_string()),
    }
}
