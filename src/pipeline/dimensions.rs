//! Dimension tables built from the player-weekly extracts.

use std::path::Path;

use tracing::info;

use super::integrity::{dedupe, drop_null_keys};
use super::jobs::{load_table, JobReport};
use super::normalize::{normalize, TypeRules};
use crate::dataset::{Dataset, Value};
use crate::error::{EtlError, Result};
use crate::schema::tables::{DIM_PLAYERS, DIM_TEAMS};
use crate::source::{load_pair, read_extract};
use crate::store::Store;

pub const PLAYER_OFFENSE_FILE: &str = "my_player_weekly_stats_offense.csv";
pub const PLAYER_DEFENSE_FILE: &str = "my_player_weekly_stats_defense.csv";

const PLAYER_BIO_COLUMNS: &[&str] = &[
    "player_id",
    "player_name",
    "position",
    "birth_year",
    "draft_year",
    "draft_round",
    "draft_pick",
    "draft_ovr",
    "height",
    "weight",
    "college",
];

const OFFENSE_POSITIONS: &[&str] = &[
    "QB", "RB", "WR", "TE", "FB", "C", "G", "T", "OT", "OG", "OC", "LT", "LG", "RT", "RG", "XX",
];
const DEFENSE_POSITIONS: &[&str] = &[
    "DE", "DT", "NT", "LB", "CB", "S", "FS", "SS", "DB", "DL", "EDGE", "MLB", "OLB", "ILB",
];
const SPECIAL_TEAMS_POSITIONS: &[&str] = &["P", "PN", "LS"];
const KICKER_POSITIONS: &[&str] = &["K", "PK"];

/// Side of the ball for a roster position.
///
/// Unknown positions come back as their upper-cased code; a missing position
/// has no flag.
pub fn offense_defense_flag(position: &Value) -> Option<String> {
    let code = position.canonical()?.to_uppercase();
    let flag = if OFFENSE_POSITIONS.contains(&code.as_str()) {
        "OFF"
    } else if DEFENSE_POSITIONS.contains(&code.as_str()) {
        "DEF"
    } else if SPECIAL_TEAMS_POSITIONS.contains(&code.as_str()) {
        "ST"
    } else if KICKER_POSITIONS.contains(&code.as_str()) {
        "K"
    } else {
        return Some(code);
    };
    Some(flag.to_string())
}

/// Unique team ids in first-seen order
pub fn build_dim_teams(source: &Dataset) -> Result<Dataset> {
    if !source.has_column("team_id") {
        return Err(EtlError::MissingColumn {
            dataset: PLAYER_OFFENSE_FILE.to_string(),
            column: "team_id".to_string(),
        });
    }

    let mut teams = source.select(&["team_id"]);
    drop_null_keys(&mut teams, DIM_TEAMS.primary_key);
    dedupe(&mut teams, DIM_TEAMS.primary_key);
    Ok(teams)
}

/// One row per player, offense extract first, first occurrence wins
pub fn build_dim_players(offense: &Dataset, defense: &Dataset) -> Result<Dataset> {
    for (name, source) in [(PLAYER_OFFENSE_FILE, offense), (PLAYER_DEFENSE_FILE, defense)] {
        if !source.has_column("player_id") {
            return Err(EtlError::MissingColumn {
                dataset: name.to_string(),
                column: "player_id".to_string(),
            });
        }
    }

    let mut players = offense.select(PLAYER_BIO_COLUMNS);
    players.concat(&defense.select(PLAYER_BIO_COLUMNS));
    drop_null_keys(&mut players, DIM_PLAYERS.primary_key);
    dedupe(&mut players, DIM_PLAYERS.primary_key);

    let keep: Vec<bool> = (0..players.len())
        .map(|row| {
            players.get(row, "player_name").is_present()
                && players.get(row, "position").is_present()
        })
        .collect();
    let incomplete = keep.iter().filter(|k| !**k).count();
    if incomplete > 0 {
        info!("dim_players: dropped {} players without a name or position", incomplete);
        players.retain_rows(&keep);
    }

    let flags: Vec<Value> = (0..players.len())
        .map(|row| match offense_defense_flag(players.get(row, "position")) {
            Some(flag) => Value::Text(flag),
            None => Value::Null,
        })
        .collect();
    players.add_column("offense_defense_flag", flags);

    normalize(players, &TypeRules::from_schema(&DIM_PLAYERS))
}

pub fn run_dim_teams<S: Store + ?Sized>(
    store: &mut S,
    data_dir: &Path,
    batch_size: usize,
) -> Result<JobReport> {
    info!("Running dim_teams job");
    let source = read_extract(&data_dir.join(PLAYER_OFFENSE_FILE))?;
    let teams = build_dim_teams(&source)?;

    let report = JobReport {
        table: DIM_TEAMS.name,
        source_rows: source.len(),
        merged_rows: teams.len(),
        ..Default::default()
    };
    load_table(store, &DIM_TEAMS, teams, batch_size, report)
}

pub fn run_dim_players<S: Store + ?Sized>(
    store: &mut S,
    data_dir: &Path,
    batch_size: usize,
) -> Result<JobReport> {
    info!("Running dim_players job");
    let sources = load_pair(data_dir, PLAYER_OFFENSE_FILE, PLAYER_DEFENSE_FILE)?;
    let players = build_dim_players(&sources.offense, &sources.defense)?;

    let report = JobReport {
        table: DIM_PLAYERS.name,
        source_rows: sources.offense.len() + sources.defense.len(),
        merged_rows: players.len(),
        ..Default::default()
    };
    load_table(store, &DIM_PLAYERS, players, batch_size, report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offense_defense_flag() {
        assert_eq!(offense_defense_flag(&"qb".into()), Some("OFF".to_string()));
        assert_eq!(offense_defense_flag(&"EDGE".into()), Some("DEF".to_string()));
        assert_eq!(offense_defense_flag(&"ls".into()), Some("ST".to_string()));
        assert_eq!(offense_defense_flag(&"PK".into()), Some("K".to_string()));
        assert_eq!(offense_defense_flag(&"kr".into()), Some("KR".to_string()));
        assert_eq!(offense_defense_flag(&Value::Null), None);
    }

    #[test]
    fn test_dim_teams_unique_in_order() {
        let source = Dataset::from_rows(
            &["player_id", "team_id"],
            vec![
                vec!["p1".into(), "NE".into()],
                vec!["p2".into(), Value::Null],
                vec!["p3".into(), "KC".into()],
                vec!["p4".into(), "NE".into()],
            ],
        );
        let teams = build_dim_teams(&source).unwrap();
        assert_eq!(teams.column_names(), vec!["team_id"]);
        assert_eq!(teams.column("team_id").unwrap(), &[Value::from("NE"), Value::from("KC")]);
    }

    #[test]
    fn test_dim_players_first_occurrence_and_defaults() {
        let offense = Dataset::from_rows(
            &["player_id", "player_name", "position", "draft_year", "height", "week"],
            vec![
                vec![
                    "p1".into(),
                    "Mac Jones".into(),
                    "QB".into(),
                    2021.into(),
                    Value::Real(75.0),
                    1.into(),
                ],
                vec![
                    "p1".into(),
                    "Mac Jones".into(),
                    "QB".into(),
                    2021.into(),
                    Value::Real(75.0),
                    2.into(),
                ],
                vec!["p2".into(), Value::Null, "WR".into(), Value::Null, Value::Null, 1.into()],
            ],
        );
        let defense = Dataset::from_rows(
            &["player_id", "player_name", "position", "draft_year"],
            vec![
                vec!["p1".into(), "Someone Else".into(), "LB".into(), 1999.into()],
                vec!["p3".into(), "Matt Judon".into(), "olb".into(), "n/a".into()],
            ],
        );

        let players = build_dim_players(&offense, &defense).unwrap();
        assert_eq!(players.len(), 2);
        assert!(!players.has_column("week"));

        assert_eq!(players.get(0, "player_name"), &Value::from("Mac Jones"));
        assert_eq!(players.get(0, "offense_defense_flag"), &Value::from("OFF"));
        assert_eq!(players.get(0, "draft_year"), &Value::Integer(2021));

        assert_eq!(players.get(1, "player_id"), &Value::from("p3"));
        assert_eq!(players.get(1, "offense_defense_flag"), &Value::from("DEF"));
        assert_eq!(players.get(1, "draft_year"), &Value::Integer(0));
        assert_eq!(players.get(1, "height"), &Value::Real(0.0));
        assert_eq!(players.get(1, "birth_year"), &Value::Integer(0));
    }
}
