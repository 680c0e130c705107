use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use super::dimensions;
use super::integrity::{enforce, IntegrityReport};
use super::normalize::{normalize, TypeRules};
use super::partition::{partition, ColumnClasses, Side};
use super::reconcile::reconcile;
use super::upsert::{filter_new_rows, UpsertReport};
use crate::dataset::{display_key, Dataset};
use crate::error::{Result, StoreError};
use crate::schema::tables::{
    DIM_PLAYERS, DIM_TEAMS, PLAYER_WEEKLY_STATS, PLAYER_YEARLY_STATS, TEAM_WEEKLY_STATS,
    TEAM_YEARLY_STATS,
};
use crate::schema::TableSchema;
use crate::source::load_pair;
use crate::store::Store;

/// One fact table and the pair of extracts it is built from
#[derive(Debug)]
pub struct FactJob {
    pub schema: &'static TableSchema,
    pub offense_file: &'static str,
    pub defense_file: &'static str,
    /// Integer-declared stats stored as floats (half sacks)
    pub float_overrides: &'static [&'static str],
}

pub static TEAM_WEEKLY_JOB: FactJob = FactJob {
    schema: &TEAM_WEEKLY_STATS,
    offense_file: "my_team_weekly_stats_offense.csv",
    defense_file: "my_team_weekly_stats_defense.csv",
    float_overrides: &["sack", "win_pct"],
};

pub static TEAM_YEARLY_JOB: FactJob = FactJob {
    schema: &TEAM_YEARLY_STATS,
    offense_file: "my_team_yearly_stats_offense.csv",
    defense_file: "my_team_yearly_stats_defense.csv",
    float_overrides: &["sack", "win_pct"],
};

pub static PLAYER_WEEKLY_JOB: FactJob = FactJob {
    schema: &PLAYER_WEEKLY_STATS,
    offense_file: "my_player_weekly_stats_offense.csv",
    defense_file: "my_player_weekly_stats_defense.csv",
    float_overrides: &["sack"],
};

pub static PLAYER_YEARLY_JOB: FactJob = FactJob {
    schema: &PLAYER_YEARLY_STATS,
    offense_file: "my_player_yearly_stats_offense.csv",
    defense_file: "my_player_yearly_stats_defense.csv",
    float_overrides: &["sack"],
};

#[derive(Debug, Clone, Copy)]
pub enum Job {
    DimTeams,
    DimPlayers,
    Fact(&'static FactJob),
}

impl Job {
    pub fn for_table(name: &str) -> Option<Job> {
        match name {
            "dim_teams" => Some(Job::DimTeams),
            "dim_players" => Some(Job::DimPlayers),
            "team_weekly_stats" => Some(Job::Fact(&TEAM_WEEKLY_JOB)),
            "team_yearly_stats" => Some(Job::Fact(&TEAM_YEARLY_JOB)),
            "player_weekly_stats" => Some(Job::Fact(&PLAYER_WEEKLY_JOB)),
            "player_yearly_stats" => Some(Job::Fact(&PLAYER_YEARLY_JOB)),
            _ => None,
        }
    }

    pub fn schema(&self) -> &'static TableSchema {
        match self {
            Job::DimTeams => &DIM_TEAMS,
            Job::DimPlayers => &DIM_PLAYERS,
            Job::Fact(job) => job.schema,
        }
    }

    pub fn run<S: Store + ?Sized>(
        &self,
        store: &mut S,
        data_dir: &Path,
        batch_size: usize,
    ) -> Result<JobReport> {
        match self {
            Job::DimTeams => dimensions::run_dim_teams(store, data_dir, batch_size),
            Job::DimPlayers => dimensions::run_dim_players(store, data_dir, batch_size),
            Job::Fact(job) => run_fact_job(store, data_dir, batch_size, job),
        }
    }
}

/// What one job did to its table
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobReport {
    pub table: &'static str,
    pub source_rows: usize,
    pub merged_rows: usize,
    pub integrity: IntegrityReport,
    pub upsert: UpsertReport,
    pub appended: usize,
}

/// Read, reconcile, clean and append one fact table
pub fn run_fact_job<S: Store + ?Sized>(
    store: &mut S,
    data_dir: &Path,
    batch_size: usize,
    job: &FactJob,
) -> Result<JobReport> {
    let schema = job.schema;
    info!("Running {} job", schema.name);

    let sources = load_pair(data_dir, job.offense_file, job.defense_file)?;
    let classes = ColumnClasses::from_schema(schema);

    let offense = partition(&sources.offense, &classes, Side::Offense)?;
    let defense = partition(&sources.defense, &classes, Side::Defense)?;
    let merged = reconcile(&offense, &defense, &classes.merge_keys, &classes.shared)?;
    info!(
        "{}: reconciled {} offense and {} defense rows into {}",
        schema.name,
        offense.len(),
        defense.len(),
        merged.len()
    );

    let rules = TypeRules::from_schema(schema).with_float_overrides(job.float_overrides);
    let merged = normalize(merged, &rules)?;

    let report = JobReport {
        table: schema.name,
        source_rows: sources.offense.len() + sources.defense.len(),
        merged_rows: merged.len(),
        ..Default::default()
    };
    load_table(store, schema, merged, batch_size, report)
}

/// Key enforcement, incremental filtering and append, shared by every job
pub(crate) fn load_table<S: Store + ?Sized>(
    store: &mut S,
    schema: &'static TableSchema,
    mut rows: Dataset,
    batch_size: usize,
    mut report: JobReport,
) -> Result<JobReport> {
    report.integrity = enforce(
        &mut rows,
        schema.name,
        schema.primary_key,
        schema.foreign_keys,
        &*store,
    )?;
    report.upsert = filter_new_rows(&mut rows, schema.name, schema.primary_key, &*store);

    let mut rows = rows.select(&schema.column_names());
    loop {
        if rows.is_empty() {
            info!("{}: nothing new to load", schema.name);
            return Ok(report);
        }
        match store.append_rows(schema.name, &rows, batch_size) {
            Ok(appended) => {
                report.appended = appended;
                break;
            }
            Err(StoreError::DuplicateKey { table, key }) => {
                let keep = rows_without_key(&rows, schema.primary_key, &key);
                let colliding = keep.iter().filter(|k| !**k).count();
                if colliding == 0 {
                    return Err(StoreError::DuplicateKey { table, key }.into());
                }
                warn!(
                    "{}: key ({}) is already stored; appending the remaining rows without it",
                    schema.name, key
                );
                report.upsert.store_collisions += colliding;
                rows.retain_rows(&keep);
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!(
        "{}: loaded {} rows ({} dropped by key checks, {} already present)",
        schema.name,
        report.appended,
        report.integrity.dropped(),
        report.upsert.already_present
    );
    Ok(report)
}

/// Row mask dropping every row whose primary key displays as `key`
fn rows_without_key(rows: &Dataset, primary_key: &[&str], key: &str) -> Vec<bool> {
    (0..rows.len())
        .map(|row| match rows.key_string(row, primary_key) {
            Some(k) => display_key(&k) != key,
            None => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::tables::ALL_TABLES;

    #[test]
    fn test_every_table_has_a_job() {
        for table in ALL_TABLES {
            let job = Job::for_table(table.name).expect("no job for table");
            assert_eq!(job.schema().name, table.name);
        }
        assert!(Job::for_table("dim_coaches").is_none());
    }

    #[test]
    fn test_fact_jobs_read_distinct_files() {
        let jobs = [&TEAM_WEEKLY_JOB, &TEAM_YEARLY_JOB, &PLAYER_WEEKLY_JOB, &PLAYER_YEARLY_JOB];
        let mut files = std::collections::HashSet::new();
        for job in jobs {
            assert!(files.insert(job.offense_file));
            assert!(files.insert(job.defense_file));
        }
    }
}
