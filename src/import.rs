//! Import pipeline - atomic bulk load of source records
//!
//! The whole input is one unit: every record becomes a stored proverb or the
//! store is left exactly as it was. The first bad row aborts the scope.

use std::path::Path;
use serde::Serialize;
use crate::proverb::ProverbId;
use crate::source::{self, SourceRecord};
use crate::storage::StorageBackend;
use crate::{Error, Result};

/// Outcome of a committed import
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub inserted: usize,
    pub ids: Vec<ProverbId>,
}

/// Load `path` and import every record in one bulk load scope
pub fn import_file(backend: &mut dyn StorageBackend, path: &Path) -> Result<ImportReport> {
    let records = source::load_file(path)?;
    import_records(backend, &records)
}

/// Import `records` atomically.
///
/// # Errors
/// - `Error::Import` naming the failing line if a row is malformed or the
///   backend rejects it; the scope is aborted first
/// - `Error::Connection` if the backend handle fails; the backend has already
///   discarded the scope
/// - `Error::State` if a scope is already open on `backend`
pub fn import_records(backend: &mut dyn StorageBackend, records: &[SourceRecord]) -> Result<ImportReport> {
    let scope = backend.begin_bulk_load()?;
    tracing::debug!("Importing {} records into {} backend", records.len(), backend.kind());

    let mut ids = Vec::with_capacity(records.len());
    for record in records {
        let outcome = record
            .to_new_proverb()
            .map_err(|e| Error::import(Some(record.line), e.to_string()))
            .and_then(|proverb| backend.insert_proverb(&scope, &proverb));

        match outcome {
            Ok(id) => {
                tracing::debug!("line {} -> {}", record.line, id);
                ids.push(id);
            }
            Err(err) if err.is_connection() => return Err(err),
            Err(err) => {
                tracing::warn!("Aborting import at line {}: {}", record.line, err);
                if let Err(abort_err) = backend.abort_bulk_load(scope) {
                    tracing::warn!("Abort failed: {}", abort_err);
                    if abort_err.is_connection() {
                        return Err(abort_err);
                    }
                }
                return Err(match err {
                    Error::Import { .. } => err,
                    other => Error::import(Some(record.line), other.to_string()),
                });
            }
        }
    }

    backend.commit_bulk_load(scope).map_err(|err| match err {
        Error::Connection(_) => err,
        other => Error::import(None, format!("commit failed: {}", other)),
    })?;

    tracing::info!("Imported {} proverbs", ids.len());
    Ok(ImportReport { inserted: ids.len(), ids })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;

    fn rows(pairs: &[(&str, &str)]) -> Vec<SourceRecord> {
        pairs
            .iter()
            .enumerate()
            .map(|(i, (tags, text))| SourceRecord::new(i + 2, *tags, *text))
            .collect()
    }

    #[test]
    fn test_import_commits_all_rows() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let report = import_records(
            &mut store,
            &rows(&[("cgo", "Cgo is not Go."), ("error", "Errors are values")]),
        )
        .unwrap();
        assert_eq!(report.inserted, 2);
        assert_eq!(report.ids.len(), 2);
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_malformed_row_aborts_everything() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let err = import_records(
            &mut store,
            &rows(&[("cgo", "Cgo is not Go."), ("a||b", "bad tags"), ("go", "never reached")]),
        )
        .unwrap_err();

        assert!(matches!(err, Error::Import { line: Some(3), .. }));
        assert_eq!(err.exit_code(), 3);
        assert_eq!(store.count().unwrap(), 0);

        // The scope was closed, so the store takes new imports
        import_records(&mut store, &rows(&[("go", "ok")])).unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_empty_input_commits_nothing() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let report = import_records(&mut store, &[]).unwrap();
        assert_eq!(report.inserted, 0);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_open_scope_is_state_error() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let scope = store.begin_bulk_load().unwrap();
        let err = import_records(&mut store, &rows(&[("", "x")])).unwrap_err();
        assert!(matches!(err, Error::State(_)));
        store.abort_bulk_load(scope).unwrap();
    }

    #[test]
    fn test_import_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proverbs.csv");
        std::fs::write(&path, "tags,proverb\ninterface|design,The bigger the interface the weaker the abstraction.\n").unwrap();

        let mut store = SqliteStore::open_in_memory().unwrap();
        let report = import_file(&mut store, &path).unwrap();
        assert_eq!(report.inserted, 1);
        assert_eq!(store.find_by_tag("design").unwrap().len(), 1);
    }
}
