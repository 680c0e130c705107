use std::path::PathBuf;
use thiserror::Error;

/// Failures at the persistent-store boundary
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store rejected a row whose primary key already exists.
    #[error("duplicate primary key in {table}: {key}")]
    DuplicateKey { table: String, key: String },

    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("table {table} has no column {column}")]
    UnknownColumn { table: String, column: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("source file not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{dataset}: missing required column '{column}'")]
    MissingColumn { dataset: String, column: String },

    #[error(
        "column '{column}' cannot be coerced to {expected}; sample values: {}",
        samples.join(", ")
    )]
    MalformedColumn {
        column: String,
        expected: &'static str,
        samples: Vec<String>,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EtlError {
    /// A storage-layer primary-key collision against rows that already exist.
    ///
    /// Reported as informational at the job boundary: the usual cause is a
    /// re-run overlapping rows that were meant to be skipped anyway.
    pub fn is_benign_duplicate(&self) -> bool {
        matches!(self, EtlError::Store(StoreError::DuplicateKey { .. }))
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
