//! SQLite storage implementation
//!
//! Tags live in the `proverb_tags` join table. Substring search compares
//! `fold_case(text)` against `fold_case(needle)`; `fold_case` is registered on
//! the connection because SQLite's own `lower()` folds ASCII only.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection, ErrorCode, ToSql, params};
use crate::{Error, Result};
use crate::config::ensure_parent_dir;
use crate::proverb::{NewProverb, Proverb, ProverbId, fold_case};
use super::{BackendKind, BulkLoad, ScopeTracker, StorageBackend, schema};

/// SQLite-backed proverb store
pub struct SqliteStore {
    conn: Connection,
    scopes: ScopeTracker,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        ensure_parent_dir(path).map_err(|e| {
            Error::Connection(format!("cannot create directory for {}: {}", path.display(), e))
        })?;
        let conn = Connection::open(path)
            .map_err(|e| Error::Connection(format!("cannot open {}: {}", path.display(), e)))?;
        let store = Self::with_connection(conn)?;
        tracing::info!("Opened SQLite store at {}", path.display());
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Connection(e.to_string()))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self { conn, scopes: ScopeTracker::default() };
        store.initialize_schema().map_err(|e| classify(e, Error::Connection))?;
        Ok(store)
    }

    /// Register SQL functions and create the schema
    fn initialize_schema(&self) -> rusqlite::Result<()> {
        self.conn.create_scalar_function(
            "fold_case",
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| {
                let text: String = ctx.get(0)?;
                Ok(fold_case(&text))
            },
        )?;
        self.conn.execute_batch("PRAGMA foreign_keys = ON")?;
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    // ========== Bulk Operations ==========

    /// Insert one proverb and its tags as a unit: a failure leaves neither
    /// behind in the open transaction.
    fn insert_row(&self, proverb: &NewProverb) -> rusqlite::Result<i64> {
        self.conn.execute_batch("SAVEPOINT insert_proverb")?;
        match self.insert_row_inner(proverb) {
            Ok(id) => {
                self.conn.execute_batch("RELEASE insert_proverb")?;
                Ok(id)
            }
            Err(e) => {
                if let Err(undo) = self
                    .conn
                    .execute_batch("ROLLBACK TO insert_proverb; RELEASE insert_proverb")
                {
                    tracing::warn!("Could not undo partial insert: {}", undo);
                }
                Err(e)
            }
        }
    }

    fn insert_row_inner(&self, proverb: &NewProverb) -> rusqlite::Result<i64> {
        self.conn.execute("INSERT INTO proverbs (text) VALUES (?1)", params![proverb.text()])?;
        let id = self.conn.last_insert_rowid();

        let mut stmt = self
            .conn
            .prepare_cached("INSERT INTO proverb_tags (proverb_id, tag) VALUES (?1, ?2)")?;
        for tag in proverb.tags() {
            stmt.execute(params![id, tag])?;
        }
        Ok(id)
    }

    /// Roll back the open transaction after a failure that ends the scope
    fn discard_scope(&mut self) {
        if let Err(e) = self.conn.execute_batch("ROLLBACK") {
            tracing::debug!("Rollback after failure: {}", e);
        }
        self.scopes.reset();
    }

    // ========== Queries ==========

    /// Load proverbs selected by `filter` (a WHERE clause over `proverbs`)
    /// together with their tags
    fn query_proverbs(&self, filter: &str, args: &[&dyn ToSql]) -> rusqlite::Result<Vec<Proverb>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT id, text FROM proverbs {} ORDER BY id", filter))?;
        let rows = stmt
            .query_map(args, |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT proverb_id, tag FROM proverb_tags WHERE proverb_id IN (SELECT id FROM proverbs {})",
            filter
        ))?;
        let mut tags: HashMap<i64, BTreeSet<String>> = HashMap::new();
        for pair in stmt.query_map(args, |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))? {
            let (id, tag) = pair?;
            tags.entry(id).or_default().insert(tag);
        }

        Ok(rows
            .into_iter()
            .map(|(id, text)| Proverb {
                id: ProverbId::new(id.to_string()),
                text,
                tags: tags.remove(&id).unwrap_or_default(),
            })
            .collect())
    }
}

impl StorageBackend for SqliteStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Relational
    }

    fn begin_bulk_load(&mut self) -> Result<BulkLoad> {
        let scope = self.scopes.begin()?;
        if let Err(e) = self.conn.execute_batch("BEGIN IMMEDIATE") {
            self.scopes.reset();
            return Err(classify(e, Error::Connection));
        }
        Ok(scope)
    }

    fn insert_proverb(&mut self, scope: &BulkLoad, proverb: &NewProverb) -> Result<ProverbId> {
        self.scopes.check(scope)?;
        match self.insert_row(proverb) {
            Ok(id) => Ok(ProverbId::new(id.to_string())),
            Err(e) => {
                let err = classify(e, Error::Write);
                if err.is_connection() {
                    self.discard_scope();
                }
                Err(err)
            }
        }
    }

    fn commit_bulk_load(&mut self, scope: BulkLoad) -> Result<()> {
        self.scopes.check(&scope)?;
        if let Err(e) = self.conn.execute_batch("COMMIT") {
            self.discard_scope();
            return Err(classify(e, Error::Write));
        }
        self.scopes.finish(&scope)?;
        tracing::info!("Committed bulk load {}", scope.scope());
        Ok(())
    }

    fn abort_bulk_load(&mut self, scope: BulkLoad) -> Result<()> {
        self.scopes.finish(&scope)?;
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(|e| classify(e, Error::Write))?;
        tracing::debug!("Rolled back bulk load {}", scope.scope());
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<Proverb>> {
        self.query_proverbs("", &[]).map_err(|e| classify(e, Error::Query))
    }

    fn find_contains(&self, needle: &str) -> Result<Vec<Proverb>> {
        self.query_proverbs("WHERE instr(fold_case(text), fold_case(?1)) > 0", &[&needle as &dyn ToSql])
            .map_err(|e| classify(e, Error::Query))
    }

    fn find_by_tag(&self, tag: &str) -> Result<Vec<Proverb>> {
        self.query_proverbs(
            "WHERE id IN (SELECT proverb_id FROM proverb_tags WHERE tag = ?1)",
            &[&tag as &dyn ToSql],
        )
        .map_err(|e| classify(e, Error::Query))
    }

    fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM proverbs", [], |row| row.get(0))
            .map_err(|e| classify(e, Error::Query))?;
        Ok(count as usize)
    }
}

/// Map a SQLite error to the taxonomy. Failures of the handle itself are
/// connection errors; everything else gets `fallback`.
fn classify(err: rusqlite::Error, fallback: fn(String) -> Error) -> Error {
    if let rusqlite::Error::SqliteFailure(e, _) = &err {
        match e.code {
            ErrorCode::CannotOpen
            | ErrorCode::SystemIoFailure
            | ErrorCode::DatabaseCorrupt
            | ErrorCode::NotADatabase
            | ErrorCode::DatabaseBusy
            | ErrorCode::DatabaseLocked
            | ErrorCode::FileLockingProtocolFailed
            | ErrorCode::PermissionDenied => return Error::Connection(err.to_string()),
            _ => {}
        }
    }
    fallback(err.to_string())
}
