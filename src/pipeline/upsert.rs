use std::collections::HashSet;

use serde::Serialize;
use tracing::{info, warn};

use crate::dataset::Dataset;
use crate::store::Store;

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpsertReport {
    pub existing_keys: usize,
    pub already_present: usize,
    pub new_rows: usize,
    /// Rows the store rejected as already present after this filter passed them
    pub store_collisions: usize,
}

/// Keep only rows whose primary key is not yet in `table`.
///
/// A table that does not exist or cannot be read counts as empty, so every
/// row is treated as new and the store itself rejects any real collision.
pub fn filter_new_rows<S: Store + ?Sized>(
    dataset: &mut Dataset,
    table: &str,
    primary_key: &[&str],
    store: &S,
) -> UpsertReport {
    let existing = existing_keys(store, table, primary_key);

    let keep: Vec<bool> = (0..dataset.len())
        .map(|row| match dataset.key_string(row, primary_key) {
            Some(key) => !existing.contains(&key),
            None => true,
        })
        .collect();
    let already_present = keep.iter().filter(|k| !**k).count();
    if already_present > 0 {
        dataset.retain_rows(&keep);
    }

    let report = UpsertReport {
        existing_keys: existing.len(),
        already_present,
        new_rows: dataset.len(),
        store_collisions: 0,
    };
    info!(
        "{}: {} new rows, {} already loaded",
        table, report.new_rows, report.already_present
    );
    report
}

fn existing_keys<S: Store + ?Sized>(
    store: &S,
    table: &str,
    primary_key: &[&str],
) -> HashSet<String> {
    match store.read_columns(table, primary_key) {
        Ok(Some(rows)) => (0..rows.len())
            .filter_map(|row| rows.key_string(row, primary_key))
            .collect(),
        Ok(None) => {
            info!("{} does not exist yet; every row is new", table);
            HashSet::new()
        }
        Err(e) => {
            warn!("Could not read existing keys of {} ({}); treating it as empty", table, e);
            HashSet::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Value;
    use crate::schema::tables::TEAM_YEARLY_STATS;
    use crate::store::MemoryStore;

    const TABLE: &str = "team_yearly_stats";

    fn rows(keys: &[(&str, i64)]) -> Dataset {
        Dataset::from_rows(
            &["team_id", "season", "season_type"],
            keys.iter()
                .map(|(team, season)| {
                    vec![Value::from(*team), Value::Integer(*season), Value::from("Reg")]
                })
                .collect(),
        )
    }

    #[test]
    fn test_existing_keys_are_filtered() {
        let mut store = MemoryStore::with_tables(&[&TEAM_YEARLY_STATS]);
        store
            .append_rows("team_yearly_stats", &rows(&[("NE", 2023)]), 10)
            .unwrap();

        let mut incoming = rows(&[("NE", 2023), ("NE", 2024)]);
        incoming.column_mut("season").unwrap()[0] = Value::Real(2023.0);
        let report = filter_new_rows(&mut incoming, TABLE, TEAM_YEARLY_STATS.primary_key, &store);

        assert_eq!(report.already_present, 1);
        assert_eq!(report.new_rows, 1);
        assert_eq!(incoming.get(0, "season"), &Value::Integer(2024));
    }

    #[test]
    fn test_unreadable_table_counts_as_empty() {
        let mut store = MemoryStore::with_tables(&[&TEAM_YEARLY_STATS]);
        store.set_unavailable("team_yearly_stats");
        let mut incoming = rows(&[("NE", 2023)]);
        let report = filter_new_rows(&mut incoming, TABLE, TEAM_YEARLY_STATS.primary_key, &store);
        assert_eq!(report.new_rows, 1);

        let missing = MemoryStore::new();
        let report =
            filter_new_rows(&mut incoming, TABLE, TEAM_YEARLY_STATS.primary_key, &missing);
        assert_eq!(report.existing_keys, 0);
        assert_eq!(report.new_rows, 1);
    }
}
