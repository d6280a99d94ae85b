//! # Proverbs - tagged text records over three storage paradigms
//!
//! Loads a corpus of short tagged records from a delimited file and answers
//! list, substring and tag queries against a persistent store.
//!
//! Proverbs provides:
//! - A record model with enforced invariants (`Proverb`, `NewProverb`)
//! - A delimited source loader
//! - One `StorageBackend` contract with relational (SQLite), document and
//!   embedded key-value implementations
//! - An atomic import pipeline and a query engine shared by all backends

pub mod proverb;
pub mod source;
pub mod storage;
pub mod import;
pub mod query;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use proverb::{NewProverb, Proverb, ProverbId, TAG_DELIMITER};
pub use source::SourceRecord;
pub use storage::{BackendKind, BulkLoad, StorageBackend, open_backend};
pub use import::{ImportReport, import_file, import_records};
pub use query::{QueryEngine, StoreStats};
pub use config::{ProverbsConfig, StoreConfig};

/// Result type alias for Proverbs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by every backend and the pipeline on top of them
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Bulk load state error: {0}")]
    State(String),

    #[error("Import failed{}: {message}", line_suffix(.line))]
    Import { line: Option<usize>, message: String },

    #[error("Write rejected: {0}")]
    Write(String),

    #[error("Query failed: {0}")]
    Query(String),
}

fn line_suffix(line: &Option<usize>) -> String {
    match line {
        Some(l) => format!(" at line {l}"),
        None => String::new(),
    }
}

impl Error {
    pub fn import(line: Option<usize>, message: impl Into<String>) -> Self {
        Error::Import { line, message: message.into() }
    }

    /// Process exit code for this error kind
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Config(_) => 1,
            Error::Connection(_) | Error::State(_) | Error::Write(_) | Error::Query(_) => 2,
            Error::Import { .. } => 3,
        }
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection(_))
    }
}
