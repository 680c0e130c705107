use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use tracing::{info, warn};

use crate::dataset::{display_key, Dataset};
use crate::error::{EtlError, Result};
use crate::schema::ForeignKey;
use crate::store::Store;

/// Duplicate rows logged per table
const DUPLICATE_SAMPLE: usize = 20;
/// Unmatched foreign key values logged per column
const MISSING_SAMPLE: usize = 10;

#[derive(Debug, Clone, Default, Serialize)]
pub struct IntegrityReport {
    pub null_key_rows: usize,
    pub duplicate_rows: usize,
    /// First few duplicate keys with the rows that were discarded
    pub duplicate_sample: Vec<DuplicateRow>,
    pub foreign_key_rows: usize,
    /// Rows rejected per foreign key column; a row can count under several
    pub foreign_key_drops: BTreeMap<String, usize>,
    /// Foreign key checks that could not run
    pub skipped_checks: Vec<String>,
}

impl IntegrityReport {
    pub fn dropped(&self) -> usize {
        self.null_key_rows + self.duplicate_rows + self.foreign_key_rows
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DuplicateRow {
    pub key: String,
    pub kept_row: usize,
    pub dropped_row: usize,
}

/// Enforce primary key and foreign key integrity before loading.
///
/// Rows missing a key component are dropped, then repeated keys keep their
/// first occurrence, then rows whose foreign keys are absent from the parent
/// table are dropped. A parent table that cannot be read skips its check.
pub fn enforce<S: Store + ?Sized>(
    dataset: &mut Dataset,
    table: &str,
    primary_key: &[&str],
    foreign_keys: &[ForeignKey],
    store: &S,
) -> Result<IntegrityReport> {
    for key in primary_key {
        if !dataset.has_column(key) {
            return Err(EtlError::MissingColumn {
                dataset: table.to_string(),
                column: key.to_string(),
            });
        }
    }

    let mut report = IntegrityReport {
        null_key_rows: drop_null_keys(dataset, primary_key),
        ..Default::default()
    };
    if report.null_key_rows > 0 {
        warn!(
            "{}: dropped {} rows with a missing primary key component",
            table, report.null_key_rows
        );
    }

    let duplicates = dedupe(dataset, primary_key);
    report.duplicate_rows = duplicates.len();
    if !duplicates.is_empty() {
        warn!(
            "{}: dropped {} rows repeating a primary key ({})",
            table,
            duplicates.len(),
            primary_key.join(", ")
        );
        for dup in duplicates.iter().take(DUPLICATE_SAMPLE) {
            warn!(
                "{}:   key ({}) kept source row {}, dropped row {}",
                table, dup.key, dup.kept_row, dup.dropped_row
            );
        }
    }
    report.duplicate_sample = duplicates.into_iter().take(DUPLICATE_SAMPLE).collect();

    filter_foreign_keys(dataset, table, foreign_keys, store, &mut report);

    Ok(report)
}

/// Drop rows with a missing key component; returns how many were dropped
pub fn drop_null_keys(dataset: &mut Dataset, key: &[&str]) -> usize {
    let keep: Vec<bool> = (0..dataset.len())
        .map(|row| dataset.key_string(row, key).is_some())
        .collect();
    let dropped = keep.iter().filter(|k| !**k).count();
    if dropped > 0 {
        dataset.retain_rows(&keep);
    }
    dropped
}

/// Keep the first row for each key; returns the rows that were discarded
pub fn dedupe(dataset: &mut Dataset, key: &[&str]) -> Vec<DuplicateRow> {
    let mut first_seen: HashMap<String, usize> = HashMap::new();
    let mut duplicates = Vec::new();
    let mut keep = Vec::with_capacity(dataset.len());

    for row in 0..dataset.len() {
        let Some(k) = dataset.key_string(row, key) else {
            keep.push(true);
            continue;
        };
        match first_seen.get(&k) {
            Some(&kept_row) => {
                duplicates.push(DuplicateRow {
                    key: display_key(&k),
                    kept_row,
                    dropped_row: row,
                });
                keep.push(false);
            }
            None => {
                first_seen.insert(k, row);
                keep.push(true);
            }
        }
    }

    if !duplicates.is_empty() {
        dataset.retain_rows(&keep);
    }
    duplicates
}

fn filter_foreign_keys<S: Store + ?Sized>(
    dataset: &mut Dataset,
    table: &str,
    foreign_keys: &[ForeignKey],
    store: &S,
    report: &mut IntegrityReport,
) {
    let mut checks: Vec<(&ForeignKey, HashSet<String>)> = Vec::new();

    for fk in foreign_keys {
        if !dataset.has_column(fk.column) {
            warn!("{}: no {} column; skipping its foreign key check", table, fk.column);
            report.skipped_checks.push(fk.column.to_string());
            continue;
        }
        match store.read_columns(fk.references_table, &[fk.references_column]) {
            Ok(Some(parent)) => {
                let keys: HashSet<String> = (0..parent.len())
                    .filter_map(|row| parent.get(row, fk.references_column).canonical())
                    .collect();
                checks.push((fk, keys));
            }
            Ok(None) => {
                warn!(
                    "{}: {} does not exist yet; skipping {} check",
                    table, fk.references_table, fk.column
                );
                report.skipped_checks.push(fk.column.to_string());
            }
            Err(e) => {
                warn!(
                    "{}: could not read {}.{} ({}); skipping {} check",
                    table, fk.references_table, fk.references_column, e, fk.column
                );
                report.skipped_checks.push(fk.column.to_string());
            }
        }
    }

    if checks.is_empty() {
        return;
    }

    let mut keep = vec![true; dataset.len()];
    let mut missing: BTreeMap<&str, Vec<String>> = BTreeMap::new();

    for (row, keep_row) in keep.iter_mut().enumerate() {
        for (fk, parents) in &checks {
            let value = dataset.get(row, fk.column).canonical();
            let found = value.as_ref().is_some_and(|v| parents.contains(v));
            if found {
                continue;
            }
            *keep_row = false;
            *report
                .foreign_key_drops
                .entry(fk.column.to_string())
                .or_default() += 1;
            let sample = missing.entry(fk.column).or_default();
            let shown = value.unwrap_or_else(|| "<missing>".to_string());
            if sample.len() < MISSING_SAMPLE && !sample.contains(&shown) {
                sample.push(shown);
            }
        }
    }

    report.foreign_key_rows = keep.iter().filter(|k| !**k).count();
    if report.foreign_key_rows == 0 {
        return;
    }

    for (column, values) in &missing {
        warn!(
            "{}: {} rows reference unknown {} (e.g. {})",
            table,
            report.foreign_key_drops.get(*column).copied().unwrap_or(0),
            column,
            values.join(", ")
        );
    }
    info!(
        "{}: dropped {} rows failing foreign key checks",
        table, report.foreign_key_rows
    );
    dataset.retain_rows(&keep);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Value;
    use crate::schema::tables::{DIM_PLAYERS, DIM_TEAMS, PLAYER_WEEKLY_STATS, TEAM_YEARLY_STATS};
    use crate::store::MemoryStore;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn teams_store(ids: &[&str]) -> MemoryStore {
        let mut store = MemoryStore::with_tables(&[&DIM_TEAMS, &DIM_PLAYERS]);
        let teams = Dataset::from_rows(
            &["team_id"],
            ids.iter().map(|id| vec![Value::from(*id)]).collect(),
        );
        store.append_rows("dim_teams", &teams, 100).unwrap();
        store
    }

    fn yearly(rows: Vec<Vec<Value>>) -> Dataset {
        Dataset::from_rows(&["team_id", "season", "season_type", "win"], rows)
    }

    #[test]
    fn test_null_keys_and_duplicates() {
        let store = teams_store(&["NE", "KC"]);
        let mut ds = yearly(vec![
            vec!["NE".into(), 2023.into(), "Reg".into(), 4.into()],
            vec!["NE".into(), Value::Null, "Reg".into(), 5.into()],
            vec!["NE".into(), Value::Real(2023.0), "Reg".into(), 6.into()],
            vec!["KC".into(), 2023.into(), "Reg".into(), 11.into()],
        ]);

        let report = enforce(
            &mut ds,
            TEAM_YEARLY_STATS.name,
            TEAM_YEARLY_STATS.primary_key,
            TEAM_YEARLY_STATS.foreign_keys,
            &store,
        )
        .unwrap();

        assert_eq!(report.null_key_rows, 1);
        assert_eq!(report.duplicate_rows, 1);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.get(0, "win"), &Value::Integer(4));
        assert_eq!(ds.get(1, "team_id"), &Value::from("KC"));
    }

    #[test]
    fn test_unknown_parent_rows_are_dropped() {
        let store = teams_store(&["NE"]);
        let mut ds = yearly(vec![
            vec!["NE".into(), 2023.into(), "Reg".into(), 4.into()],
            vec!["ZZ".into(), 2023.into(), "Reg".into(), 1.into()],
        ]);
        let report = enforce(
            &mut ds,
            "team_yearly_stats",
            &["team_id", "season", "season_type"],
            TEAM_YEARLY_STATS.foreign_keys,
            &store,
        )
        .unwrap();
        assert_eq!(report.foreign_key_rows, 1);
        assert_eq!(report.foreign_key_drops.get("team_id"), Some(&1));
        assert_eq!(ds.len(), 1);
    }

    #[test]
    fn test_row_failing_two_checks_dropped_once() {
        let mut store = teams_store(&["NE"]);
        let players = Dataset::from_rows(&["player_id"], vec![vec!["p1".into()]]);
        store.append_rows("dim_players", &players, 100).unwrap();

        let mut ds = Dataset::from_rows(
            &["player_id", "team_id", "season", "season_type", "week"],
            vec![
                vec!["p1".into(), "NE".into(), 2023.into(), "Reg".into(), 1.into()],
                vec!["p9".into(), "ZZ".into(), 2023.into(), "Reg".into(), 1.into()],
            ],
        );
        let report = enforce(
            &mut ds,
            PLAYER_WEEKLY_STATS.name,
            PLAYER_WEEKLY_STATS.primary_key,
            PLAYER_WEEKLY_STATS.foreign_keys,
            &store,
        )
        .unwrap();
        assert_eq!(report.foreign_key_rows, 1);
        assert_eq!(report.foreign_key_drops.get("player_id"), Some(&1));
        assert_eq!(report.foreign_key_drops.get("team_id"), Some(&1));
        assert_eq!(ds.len(), 1);
    }

    #[test]
    fn test_unreadable_parent_skips_check() {
        let mut store = teams_store(&["NE"]);
        store.set_unavailable("dim_teams");
        let mut ds = yearly(vec![vec!["ZZ".into(), 2023.into(), "Reg".into(), 1.into()]]);
        let report = enforce(
            &mut ds,
            "team_yearly_stats",
            TEAM_YEARLY_STATS.primary_key,
            TEAM_YEARLY_STATS.foreign_keys,
            &store,
        )
        .unwrap();
        assert_eq!(report.skipped_checks, vec!["team_id".to_string()]);
        assert_eq!(ds.len(), 1);

        let empty = MemoryStore::new();
        let report = enforce(
            &mut ds,
            "team_yearly_stats",
            TEAM_YEARLY_STATS.primary_key,
            TEAM_YEARLY_STATS.foreign_keys,
            &empty,
        )
        .unwrap();
        assert_eq!(report.skipped_checks.len(), 1);
        assert_eq!(ds.len(), 1);
    }

    #[test]
    fn test_missing_primary_key_column_is_error() {
        let store = MemoryStore::new();
        let mut ds = Dataset::from_rows(&["team_id"], vec![vec!["NE".into()]]);
        let err = enforce(&mut ds, "team_yearly_stats", TEAM_YEARLY_STATS.primary_key, &[], &store)
            .unwrap_err();
        assert!(matches!(err, EtlError::MissingColumn { .. }));
    }

    #[test]
    fn test_dedupe_yields_unique_keys() {
        let mut rng = StdRng::seed_from_u64(42);
        let rows: Vec<Vec<Value>> = (0..500)
            .map(|i| {
                let team = ["NE", "KC", "BUF", "MIA"][rng.gen_range(0..4)];
                let week: i64 = rng.gen_range(1..6);
                vec![Value::from(team), Value::Integer(week), Value::Integer(i)]
            })
            .collect();
        let mut ds = Dataset::from_rows(&["team_id", "week", "seq"], rows);

        let dropped = dedupe(&mut ds, &["team_id", "week"]);
        assert_eq!(ds.len() + dropped.len(), 500);

        let mut seen = HashSet::new();
        for row in 0..ds.len() {
            assert!(seen.insert(ds.key_string(row, &["team_id", "week"]).unwrap()));
        }
        // first occurrence wins: surviving rows keep ascending source order
        let seqs: Vec<i64> = ds
            .column("seq")
            .unwrap()
            .iter()
            .map(|v| match v {
                Value::Integer(i) => *i,
                _ => unreachable!(),
            })
            .collect();
        assert!(seqs.windows(2).all(|w| w[0] < w[1]));
        assert!(dropped.iter().all(|d| d.kept_row < d.dropped_row));
    }
}
