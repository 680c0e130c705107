//! Persistent-store boundary.
//!
//! The pipeline only needs two operations from the warehouse: a projection
//! read of a table, and an append of new rows. [`SqliteStore`] is the real
//! implementation; [`MemoryStore`] backs tests.

mod memory;
pub mod schema_gen;
mod sqlite;

pub use memory::MemoryStore;
pub(crate) use sqlite::quote_ident;
pub use sqlite::SqliteStore;

use crate::dataset::Dataset;
use crate::error::StoreError;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

pub trait Store {
    /// Read every row of `table` restricted to `columns`.
    ///
    /// Returns `Ok(None)` when the table does not exist yet.
    fn read_columns(&self, table: &str, columns: &[&str]) -> StoreResult<Option<Dataset>>;

    /// Append `rows` to `table` in chunks of `batch_size`.
    ///
    /// A primary-key collision fails the whole call with
    /// [`StoreError::DuplicateKey`] and nothing from the call is kept.
    fn append_rows(&mut self, table: &str, rows: &Dataset, batch_size: usize) -> StoreResult<usize>;
}
