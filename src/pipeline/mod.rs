//! The load pipeline: read, partition, reconcile, normalize, enforce keys,
//! filter already-loaded rows and append.
//!
//! Every fact table runs the same stages; the differences live in the table
//! schema (merge keys, column sources, types) and the [`jobs::FactJob`] entry.

pub mod dimensions;
pub mod integrity;
pub mod jobs;
pub mod normalize;
pub mod partition;
pub mod reconcile;
pub mod upsert;

pub use jobs::{Job, JobReport};

use std::path::Path;

use tracing::{error, info};

use crate::schema::TableSchema;
use crate::store::Store;

/// Outcome of running several jobs
#[derive(Debug, Default)]
pub struct LoadSummary {
    pub reports: Vec<JobReport>,
    /// Tables whose job failed, with the reason
    pub failures: Vec<(&'static str, String)>,
}

impl LoadSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn appended(&self) -> usize {
        self.reports.iter().map(|r| r.appended).sum()
    }
}

/// Run the job for each table in order.
///
/// A failing job is logged and the remaining jobs still run. A primary-key
/// collision in the store is reported as already loaded, not as a failure.
pub fn run_jobs<S: Store + ?Sized>(
    store: &mut S,
    tables: &[&'static TableSchema],
    data_dir: &Path,
    batch_size: usize,
) -> LoadSummary {
    let mut summary = LoadSummary::default();

    for table in tables {
        let Some(job) = Job::for_table(table.name) else {
            error!("No load job is defined for {}", table.name);
            summary
                .failures
                .push((table.name, "no load job defined".to_string()));
            continue;
        };

        match job.run(store, data_dir, batch_size) {
            Ok(report) => summary.reports.push(report),
            Err(e) if e.is_benign_duplicate() => {
                info!("{} already contains these entries; skipping ({})", table.name, e);
            }
            Err(e) => {
                error!("{} job failed: {}", table.name, e);
                summary.failures.push((table.name, e.to_string()));
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::error::StoreError;
    use crate::schema::tables::{DIM_PLAYERS, DIM_TEAMS};
    use crate::store::{MemoryStore, StoreResult};
    use tempfile::TempDir;

    /// Rejects every append with a key no incoming row carries
    struct RejectingStore(MemoryStore);

    impl Store for RejectingStore {
        fn read_columns(&self, table: &str, columns: &[&str]) -> StoreResult<Option<Dataset>> {
            self.0.read_columns(table, columns)
        }

        fn append_rows(&mut self, table: &str, _: &Dataset, _: usize) -> StoreResult<usize> {
            Err(StoreError::DuplicateKey {
                table: table.to_string(),
                key: "row 0".to_string(),
            })
        }
    }

    fn extracts() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(dimensions::PLAYER_OFFENSE_FILE),
            "player_id,player_name,position,team\nP1,Mac Jones,QB,NE\n",
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_store_duplicate_is_not_a_failure() {
        let dir = extracts();
        let mut store = RejectingStore(MemoryStore::with_tables(&[&DIM_TEAMS]));

        let summary = run_jobs(&mut store, &[&DIM_TEAMS], dir.path(), 100);
        assert!(summary.is_success());
        assert!(summary.reports.is_empty());
        assert_eq!(summary.appended(), 0);
    }

    #[test]
    fn test_failure_is_recorded_and_later_jobs_run() {
        let dir = extracts();
        let mut store = MemoryStore::with_tables(&[&DIM_TEAMS, &DIM_PLAYERS]);

        // dim_players also needs the defense extract, which is missing
        let summary = run_jobs(&mut store, &[&DIM_PLAYERS, &DIM_TEAMS], dir.path(), 100);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].0, "dim_players");
        assert_eq!(summary.reports.len(), 1);
        assert_eq!(store.row_count("dim_teams"), 1);
    }
}
