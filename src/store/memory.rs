use std::collections::{HashMap, HashSet};

use super::{Store, StoreResult};
use crate::dataset::{display_key, Dataset};
use crate::error::StoreError;
use crate::schema::TableSchema;

struct MemoryTable {
    primary_key: &'static [&'static str],
    rows: Dataset,
    keys: HashSet<String>,
}

/// In-memory store with the same contract as the SQLite warehouse.
///
/// Tables can be marked unavailable to simulate an unreachable store.
#[derive(Default)]
pub struct MemoryStore {
    tables: HashMap<String, MemoryTable>,
    unavailable: HashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tables(schemas: &[&TableSchema]) -> Self {
        let mut store = Self::new();
        for schema in schemas {
            store.create_table(schema);
        }
        store
    }

    pub fn create_table(&mut self, schema: &TableSchema) {
        self.tables
            .entry(schema.name.to_string())
            .or_insert_with(|| MemoryTable {
                primary_key: schema.primary_key,
                rows: Dataset::new(&schema.column_names()),
                keys: HashSet::new(),
            });
    }

    /// Make every read and append on `table` fail.
    pub fn set_unavailable(&mut self, table: &str) {
        self.unavailable.insert(table.to_string());
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables.get(table).map(|t| t.rows.len()).unwrap_or(0)
    }

    pub fn rows(&self, table: &str) -> Option<&Dataset> {
        self.tables.get(table).map(|t| &t.rows)
    }

    fn check_available(&self, table: &str) -> StoreResult<()> {
        if self.unavailable.contains(table) {
            return Err(StoreError::Unavailable(format!("{} is unreachable", table)));
        }
        Ok(())
    }
}

impl Store for MemoryStore {
    fn read_columns(&self, table: &str, columns: &[&str]) -> StoreResult<Option<Dataset>> {
        self.check_available(table)?;
        let Some(stored) = self.tables.get(table) else {
            return Ok(None);
        };
        for col in columns {
            if !stored.rows.has_column(col) {
                return Err(StoreError::UnknownColumn {
                    table: table.to_string(),
                    column: col.to_string(),
                });
            }
        }
        Ok(Some(stored.rows.select(columns)))
    }

    fn append_rows(
        &mut self,
        table: &str,
        rows: &Dataset,
        _batch_size: usize,
    ) -> StoreResult<usize> {
        self.check_available(table)?;
        let stored = self
            .tables
            .get_mut(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;

        for col in rows.column_names() {
            if !stored.rows.has_column(col) {
                return Err(StoreError::UnknownColumn {
                    table: table.to_string(),
                    column: col.to_string(),
                });
            }
        }

        // Validate every key before touching the table so a collision keeps nothing
        let mut incoming = HashSet::new();
        for row in 0..rows.len() {
            let key = rows.key_string(row, stored.primary_key).unwrap_or_default();
            if stored.keys.contains(&key) || !incoming.insert(key.clone()) {
                return Err(StoreError::DuplicateKey {
                    table: table.to_string(),
                    key: display_key(&key),
                });
            }
        }

        stored.rows.concat(rows);
        stored.keys.extend(incoming);
        Ok(rows.len())
    }
}
