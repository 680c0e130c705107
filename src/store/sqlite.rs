use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use tracing::{debug, info};

use super::schema_gen::{generate_create_table, generate_indexes};
use super::{Store, StoreResult};
use crate::dataset::{display_key, Dataset, Value};
use crate::error::StoreError;
use crate::schema::{get_table, TableSchema};

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the warehouse file and verify the connection.
    pub fn open(db_path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(db_path)?;

        // Enforce foreign keys and keep bulk appends fast
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;",
        )?;

        Self::check_connection(conn)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Self::check_connection(conn)
    }

    fn check_connection(conn: Connection) -> StoreResult<Self> {
        let one: i64 = conn.query_row("SELECT 1", [], |row| row.get(0))?;
        if one != 1 {
            return Err(StoreError::Unavailable(
                "connection test returned an unexpected result".to_string(),
            ));
        }
        Ok(Self { conn })
    }

    /// Create any missing tables for the given schemas
    pub fn create_tables(&self, schemas: &[&TableSchema]) -> StoreResult<()> {
        debug!("Ensuring {} tables exist", schemas.len());

        for schema in schemas {
            self.conn.execute(&generate_create_table(schema), [])?;

            for index_sql in generate_indexes(schema) {
                self.conn.execute(&index_sql, [])?;
            }
        }

        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn table_exists(&self, table: &str) -> StoreResult<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn table_columns(&self, table: &str) -> StoreResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    pub fn row_count(&self, table: &str) -> StoreResult<u64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

impl Store for SqliteStore {
    fn read_columns(&self, table: &str, columns: &[&str]) -> StoreResult<Option<Dataset>> {
        if !self.table_exists(table)? {
            return Ok(None);
        }

        let available = self.table_columns(table)?;
        for col in columns {
            if !available.iter().any(|c| c == col) {
                return Err(StoreError::UnknownColumn {
                    table: table.to_string(),
                    column: col.to_string(),
                });
            }
        }

        let projection: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
        let sql = format!("SELECT {} FROM {}", projection.join(", "), quote_ident(table));
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;

        let mut dataset = Dataset::new(columns);
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                let value: rusqlite::types::Value = row.get(idx)?;
                values.push(Value::from(value));
            }
            dataset.push_row(values);
        }

        Ok(Some(dataset))
    }

    fn append_rows(
        &mut self,
        table: &str,
        rows: &Dataset,
        batch_size: usize,
    ) -> StoreResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        if !self.table_exists(table)? {
            return Err(StoreError::UnknownTable(table.to_string()));
        }

        let columns = rows.column_names();
        let placeholders: Vec<&str> = columns.iter().map(|_| "?").collect();
        let insert_sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(table),
            columns.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", "),
            placeholders.join(", ")
        );

        let batch_size = batch_size.max(1);
        let tx = self.conn.transaction()?;
        let mut count = 0;

        for start in (0..rows.len()).step_by(batch_size) {
            let end = (start + batch_size).min(rows.len());
            insert_batch(&tx, &insert_sql, rows, start..end)
                .map_err(|(row, err)| classify_insert_error(table, rows, row, err))?;
            count += end - start;
            debug!("{}: inserted {}/{} rows", table, count, rows.len());
        }

        tx.commit()?;
        info!("{}: appended {} rows", table, count);

        Ok(count)
    }
}

/// Insert a range of rows; on failure reports which row was rejected
fn insert_batch(
    tx: &rusqlite::Transaction,
    sql: &str,
    rows: &Dataset,
    range: std::ops::Range<usize>,
) -> Result<(), (usize, rusqlite::Error)> {
    let mut stmt = tx.prepare_cached(sql).map_err(|e| (range.start, e))?;

    for row in range {
        for (idx, column) in rows.columns().iter().enumerate() {
            column.values[row]
                .bind_to(idx + 1, &mut stmt)
                .map_err(|e| (row, e))?;
        }
        stmt.raw_execute().map_err(|e| (row, e))?;
    }

    Ok(())
}

fn classify_insert_error(
    table: &str,
    rows: &Dataset,
    row: usize,
    err: rusqlite::Error,
) -> StoreError {
    use rusqlite::ffi::{SQLITE_CONSTRAINT_PRIMARYKEY, SQLITE_CONSTRAINT_UNIQUE};

    if let rusqlite::Error::SqliteFailure(ref failure, _) = err {
        if failure.extended_code == SQLITE_CONSTRAINT_PRIMARYKEY
            || failure.extended_code == SQLITE_CONSTRAINT_UNIQUE
        {
            let key = get_table(table)
                .and_then(|schema| rows.key_string(row, schema.primary_key))
                .map(|k| display_key(&k))
                .unwrap_or_else(|| format!("row {}", row));
            return StoreError::DuplicateKey {
                table: table.to_string(),
                key,
            };
        }
    }
    StoreError::Sqlite(err)
}

pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::tables::{ALL_TABLES, DIM_TEAMS};

    fn store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_tables(ALL_TABLES).unwrap();
        store
    }

    fn teams(ids: &[&str]) -> Dataset {
        Dataset::from_rows(
            &["team_id"],
            ids.iter().map(|id| vec![Value::from(*id)]).collect(),
        )
    }

    #[test]
    fn test_missing_table_reads_as_none() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.read_columns("dim_teams", &["team_id"]).unwrap().is_none());
    }

    #[test]
    fn test_append_then_read_projection() {
        let mut store = store();
        let appended = store.append_rows("dim_teams", &teams(&["NE", "KC", "BUF"]), 2).unwrap();
        assert_eq!(appended, 3);

        let ds = store.read_columns("dim_teams", &["team_id"]).unwrap().unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.column_names(), vec!["team_id"]);
    }

    #[test]
    fn test_unknown_column_is_error() {
        let store = store();
        let err = store.read_columns("dim_teams", &["nickname"]).unwrap_err();
        assert!(matches!(err, StoreError::UnknownColumn { .. }));
    }

    #[test]
    fn test_primary_key_collision_is_duplicate_and_rolls_back() {
        let mut store = store();
        store.append_rows(DIM_TEAMS.name, &teams(&["NE"]), 10).unwrap();

        let err = store
            .append_rows(DIM_TEAMS.name, &teams(&["KC", "NE"]), 10)
            .unwrap_err();
        match err {
            StoreError::DuplicateKey { table, key } => {
                assert_eq!(table, "dim_teams");
                assert_eq!(key, "NE");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(store.row_count(DIM_TEAMS.name).unwrap(), 1);
    }
}
