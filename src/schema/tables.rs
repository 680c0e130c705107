//! Table schema definitions for the football stats warehouse

use super::types::*;

const INT: ColumnType = ColumnType::Integer;
const REAL: ColumnType = ColumnType::Real;
const TEXT: ColumnType = ColumnType::Text;

// =============================================================================
// Dimension Tables (no FK dependencies)
// =============================================================================

pub static DIM_TEAMS: TableSchema = TableSchema {
    name: "dim_teams",
    columns: &[
        Column::key("team_id", TEXT),
        Column::attribute("team_name", TEXT),
        Column::attribute("city", TEXT),
        Column::attribute("state", TEXT),
        Column::attribute("conference", TEXT),
        Column::attribute("division", TEXT),
    ],
    primary_key: &["team_id"],
    foreign_keys: &[],
};

pub static DIM_PLAYERS: TableSchema = TableSchema {
    name: "dim_players",
    columns: &[
        Column::key("player_id", TEXT),
        Column::attribute("player_name", TEXT),
        Column::attribute("position", TEXT),
        Column::attribute("birth_year", INT),
        Column::attribute("draft_year", INT),
        Column::attribute("draft_round", INT),
        Column::attribute("draft_pick", INT),
        Column::attribute("draft_ovr", INT),
        Column::attribute("height", REAL),
        Column::attribute("weight", REAL),
        Column::attribute("college", TEXT),
        Column::attribute("offense_defense_flag", TEXT).api("side"),
    ],
    primary_key: &["player_id"],
    foreign_keys: &[],
};

// =============================================================================
// Team Fact Tables (depend on dim_teams)
// =============================================================================

pub static TEAM_WEEKLY_STATS: TableSchema = TableSchema {
    name: "team_weekly_stats",
    columns: &[
        Column::key("game_id", TEXT),
        Column::key("team_id", TEXT),
        Column::key("season", INT),
        Column::key("week", INT),
        Column::key("season_type", TEXT),
        // offense
        Column::offense("shotgun", INT),
        Column::offense("no_huddle", INT),
        Column::offense("qb_dropback", INT),
        Column::offense("qb_scramble", INT),
        Column::offense("total_off_yards", REAL),
        Column::offense("pass_attempts", INT),
        Column::offense("complete_pass", INT),
        Column::offense("incomplete_pass", INT),
        Column::offense("passing_yards", REAL),
        Column::offense("air_yards", REAL),
        Column::offense("receiving_yards", REAL),
        Column::offense("yards_after_catch", REAL),
        Column::offense("rush_attempts", INT),
        Column::offense("rushing_yards", REAL),
        Column::offense("tackled_for_loss", INT),
        Column::offense("first_down_pass", INT),
        Column::offense("first_down_rush", INT),
        Column::offense("third_down_converted", INT),
        Column::offense("third_down_failed", INT),
        Column::offense("fourth_down_converted", INT),
        Column::offense("fourth_down_failed", INT),
        Column::offense("rush_touchdown", INT),
        Column::offense("pass_touchdown", INT),
        Column::offense("receiving_touchdown", INT),
        Column::offense("total_off_points", INT),
        Column::offense("extra_point", INT),
        Column::offense("field_goal", INT),
        Column::offense("kickoff", INT),
        Column::offense("no_play", INT),
        Column::offense("pass_snaps", INT),
        Column::offense("punt", INT),
        Column::offense("qb_kneel", INT),
        Column::offense("qb_spike", INT),
        Column::offense("rush_snaps", INT),
        Column::offense("offense_snaps", INT),
        Column::offense("st_snaps", INT),
        Column::offense("rush_pct", REAL),
        Column::offense("pass_pct", REAL),
        Column::offense("passing_air_yards", REAL),
        Column::offense("receiving_air_yards", REAL),
        Column::offense("receptions", INT),
        Column::offense("targets", INT),
        Column::offense("yps", REAL),
        Column::offense("adot", REAL),
        Column::offense("air_yards_share", REAL),
        Column::offense("target_share", REAL),
        Column::offense("comp_pct", REAL),
        Column::offense("int_pct", REAL),
        Column::offense("pass_td_pct", REAL),
        Column::offense("ypa", REAL),
        Column::offense("rec_td_pct", REAL),
        Column::offense("yptarget", REAL),
        Column::offense("ayptarget", REAL),
        Column::offense("ypr", REAL),
        Column::offense("rush_td_pct", REAL),
        Column::offense("ypc", REAL),
        Column::offense("touches", INT),
        Column::offense("total_tds", INT),
        Column::offense("td_pct", REAL),
        Column::offense("total_yards", REAL),
        Column::offense("yptouch", REAL),
        // defense
        Column::defense("solo_tackle", INT),
        Column::defense("assist_tackle", INT),
        Column::defense("tackle_with_assist", INT),
        Column::defense("sack", REAL),
        Column::defense("qb_hit", INT),
        Column::defense("total_def_points", INT),
        Column::defense("defense_snaps", INT),
        // shared
        Column::summed("safety", INT),
        Column::summed("interception", INT),
        Column::summed("fumble", INT),
        Column::summed("fumble_lost", INT),
        Column::summed("fumble_forced", INT),
        Column::summed("fumble_not_forced", INT),
        Column::summed("fumble_out_of_bounds", INT),
        Column::summed("def_touchdown", INT),
        Column::summed("defensive_two_point_attempt", INT),
        Column::summed("defensive_two_point_conv", INT),
        Column::summed("defensive_extra_point_attempt", INT),
        Column::summed("defensive_extra_point_conv", INT),
        Column::summed("home_win", INT),
        Column::summed("home_loss", INT),
        Column::summed("home_tie", INT),
        Column::summed("away_win", INT),
        Column::summed("away_loss", INT),
        Column::summed("away_tie", INT),
        Column::summed("win", INT),
        Column::summed("loss", INT),
        Column::summed("tie", INT),
        Column::coalesced("record", TEXT),
        Column::coalesced("win_pct", REAL),
    ],
    primary_key: &["game_id", "team_id"],
    foreign_keys: &[ForeignKey::new("team_id", "dim_teams")],
};

pub static TEAM_YEARLY_STATS: TableSchema = TableSchema {
    name: "team_yearly_stats",
    columns: &[
        Column::key("team_id", TEXT),
        Column::key("season", INT),
        Column::key("season_type", TEXT),
        // offense
        Column::offense("shotgun", INT),
        Column::offense("no_huddle", INT),
        Column::offense("qb_dropback", INT),
        Column::offense("qb_scramble", INT),
        Column::offense("total_off_yards", REAL),
        Column::offense("pass_attempts", INT),
        Column::offense("complete_pass", INT),
        Column::offense("incomplete_pass", INT),
        Column::offense("passing_yards", REAL),
        Column::offense("air_yards", REAL),
        Column::offense("receiving_yards", REAL),
        Column::offense("yards_after_catch", REAL),
        Column::offense("rush_attempts", INT),
        Column::offense("rushing_yards", REAL),
        Column::offense("tackled_for_loss", INT),
        Column::offense("first_down_pass", INT),
        Column::offense("first_down_rush", INT),
        Column::offense("third_down_converted", INT),
        Column::offense("third_down_failed", INT),
        Column::offense("fourth_down_converted", INT),
        Column::offense("fourth_down_failed", INT),
        Column::offense("rush_touchdown", INT),
        Column::offense("pass_touchdown", INT),
        Column::offense("receiving_touchdown", INT),
        Column::offense("total_off_points", INT),
        Column::offense("offense_snaps", INT),
        Column::offense("rush_snaps", INT),
        Column::offense("pass_snaps", INT),
        Column::offense("passing_air_yards", REAL),
        Column::offense("receiving_air_yards", REAL),
        Column::offense("receptions", INT),
        Column::offense("targets", INT),
        Column::offense("yps", REAL),
        Column::offense("adot", REAL),
        Column::offense("air_yards_share", REAL),
        Column::offense("target_share", REAL),
        Column::offense("comp_pct", REAL),
        Column::offense("int_pct", REAL),
        Column::offense("pass_td_pct", REAL),
        Column::offense("ypa", REAL),
        Column::offense("rec_td_pct", REAL),
        Column::offense("yptarget", REAL),
        Column::offense("ayptarget", REAL),
        Column::offense("ypr", REAL),
        Column::offense("rush_td_pct", REAL),
        Column::offense("ypc", REAL),
        Column::offense("touches", INT),
        Column::offense("total_tds", INT),
        Column::offense("td_pct", REAL),
        Column::offense("total_yards", REAL),
        Column::offense("yptouch", REAL),
        Column::offense("rush_pct", REAL),
        Column::offense("pass_pct", REAL),
        // defense
        Column::defense("solo_tackle", INT),
        Column::defense("assist_tackle", INT),
        Column::defense("tackle_with_assist", INT),
        Column::defense("sack", REAL),
        Column::defense("qb_hit", INT),
        Column::defense("def_touchdown", INT),
        Column::defense("defensive_two_point_attempt", INT),
        Column::defense("defensive_two_point_conv", INT),
        Column::defense("defensive_extra_point_attempt", INT),
        Column::defense("defensive_extra_point_conv", INT),
        Column::defense("total_def_points", INT),
        Column::defense("defense_snaps", INT),
        // shared
        Column::summed("win", INT),
        Column::summed("loss", INT),
        Column::summed("tie", INT),
        Column::coalesced("win_pct", REAL),
    ],
    primary_key: &["team_id", "season", "season_type"],
    foreign_keys: &[ForeignKey::new("team_id", "dim_teams")],
};

// =============================================================================
// Player Fact Tables (depend on dim_players and dim_teams)
// =============================================================================

pub static PLAYER_WEEKLY_STATS: TableSchema = TableSchema {
    name: "player_weekly_stats",
    columns: &[
        Column::key("player_id", TEXT),
        Column::key("team_id", TEXT),
        Column::key("season", INT),
        Column::key("week", INT),
        Column::period("season_type"),
        // offense
        Column::offense("shotgun", INT),
        Column::offense("no_huddle", INT),
        Column::offense("qb_dropback", INT),
        Column::offense("qb_scramble", INT),
        Column::offense("pass_attempts", INT),
        Column::offense("complete_pass", INT),
        Column::offense("incomplete_pass", INT),
        Column::offense("passing_yards", REAL),
        Column::offense("receiving_yards", REAL),
        Column::offense("yards_after_catch", REAL),
        Column::offense("rush_attempts", INT),
        Column::offense("rushing_yards", REAL),
        Column::offense("tackled_for_loss", INT),
        Column::offense("first_down_pass", INT),
        Column::offense("first_down_rush", INT),
        Column::offense("third_down_converted", INT),
        Column::offense("third_down_failed", INT),
        Column::offense("fourth_down_converted", INT),
        Column::offense("fourth_down_failed", INT),
        Column::offense("rush_touchdown", INT),
        Column::offense("pass_touchdown", INT),
        Column::offense("receptions", INT),
        Column::offense("targets", INT),
        Column::offense("passing_air_yards", REAL),
        Column::offense("receiving_air_yards", REAL),
        Column::offense("receiving_touchdown", INT),
        Column::offense("fantasy_points_ppr", REAL),
        Column::offense("fantasy_points_standard", REAL),
        Column::offense("passer_rating", REAL),
        Column::offense("adot", REAL),
        Column::offense("air_yards_share", REAL),
        Column::offense("target_share", REAL),
        Column::offense("comp_pct", REAL),
        Column::offense("int_pct", REAL),
        Column::offense("pass_td_pct", REAL),
        Column::offense("ypa", REAL),
        Column::offense("rec_td_pct", REAL),
        Column::offense("yptarget", REAL),
        Column::offense("ayptarget", REAL),
        Column::offense("ypr", REAL),
        Column::offense("rush_td_pct", REAL),
        Column::offense("ypc", REAL),
        Column::offense("touches", INT),
        Column::offense("total_tds", INT),
        Column::offense("td_pct", REAL),
        Column::offense("total_yards", REAL),
        Column::offense("yptouch", REAL),
        Column::offense("offense_snaps", INT),
        Column::offense("offense_pct", REAL),
        Column::offense("team_offense_snaps", INT),
        // defense
        Column::defense("solo_tackle", INT),
        Column::defense("assist_tackle", INT),
        Column::defense("tackle_with_assist", INT),
        Column::defense("sack", REAL),
        Column::defense("qb_hit", INT),
        Column::defense("defense_snaps", INT),
        Column::defense("defense_pct", REAL),
        Column::defense("team_defense_snaps", INT),
        // shared
        Column::summed("safety", INT),
        Column::summed("interception", INT),
        Column::summed("fumble", INT),
        Column::summed("fumble_lost", INT),
        Column::summed("fumble_forced", INT),
        Column::summed("fumble_not_forced", INT),
        Column::summed("fumble_out_of_bounds", INT),
        Column::summed("def_touchdown", INT),
        Column::summed("defensive_two_point_attempt", INT),
        Column::summed("defensive_two_point_conv", INT),
        Column::summed("defensive_extra_point_attempt", INT),
        Column::summed("defensive_extra_point_conv", INT),
    ],
    primary_key: &["player_id", "season", "season_type", "week"],
    foreign_keys: &[
        ForeignKey::new("player_id", "dim_players"),
        ForeignKey::new("team_id", "dim_teams"),
    ],
};

pub static PLAYER_YEARLY_STATS: TableSchema = TableSchema {
    name: "player_yearly_stats",
    columns: &[
        Column::key("player_id", TEXT),
        Column::key("season", INT),
        Column::key("season_type", TEXT),
        Column::key("team_id", TEXT),
        // offense
        Column::offense("shotgun", INT),
        Column::offense("no_huddle", INT),
        Column::offense("qb_dropback", INT),
        Column::offense("qb_scramble", INT),
        Column::offense("pass_attempts", INT),
        Column::offense("complete_pass", INT),
        Column::offense("incomplete_pass", INT),
        Column::offense("passing_yards", REAL),
        Column::offense("receiving_yards", REAL),
        Column::offense("yards_after_catch", REAL),
        Column::offense("rush_attempts", INT),
        Column::offense("rushing_yards", REAL),
        Column::offense("tackled_for_loss", INT),
        Column::offense("first_down_pass", INT),
        Column::offense("first_down_rush", INT),
        Column::offense("third_down_converted", INT),
        Column::offense("third_down_failed", INT),
        Column::offense("fourth_down_converted", INT),
        Column::offense("fourth_down_failed", INT),
        Column::offense("rush_touchdown", INT),
        Column::offense("pass_touchdown", INT),
        Column::offense("receiving_touchdown", INT),
        Column::offense("receptions", INT),
        Column::offense("targets", INT),
        Column::offense("passing_air_yards", REAL),
        Column::offense("receiving_air_yards", REAL),
        Column::offense("fantasy_points_ppr", REAL),
        Column::offense("fantasy_points_standard", REAL),
        Column::offense("total_tds", INT),
        Column::offense("touches", INT),
        Column::offense("total_yards", REAL),
        Column::offense("offense_snaps", INT),
        Column::offense("team_offense_snaps", INT),
        Column::offense("offense_pct", REAL),
        // defense
        Column::defense("solo_tackle", INT),
        Column::defense("assist_tackle", INT),
        Column::defense("tackle_with_assist", INT),
        Column::defense("sack", REAL),
        Column::defense("qb_hit", INT),
        Column::defense("defense_snaps", INT),
        Column::defense("team_defense_snaps", INT),
        Column::defense("defense_pct", REAL),
        // shared counts
        Column::summed("safety", INT),
        Column::summed("interception", INT),
        Column::summed("fumble", INT),
        Column::summed("fumble_lost", INT),
        Column::summed("fumble_forced", INT),
        Column::summed("fumble_not_forced", INT),
        Column::summed("fumble_out_of_bounds", INT),
        Column::summed("def_touchdown", INT),
        Column::summed("defensive_two_point_attempt", INT),
        Column::summed("defensive_two_point_conv", INT),
        Column::summed("defensive_extra_point_attempt", INT),
        Column::summed("defensive_extra_point_conv", INT),
        // shared bio
        Column::coalesced("age", INT),
        Column::coalesced("player_name", TEXT),
        Column::coalesced("position", TEXT),
        Column::coalesced("birth_year", INT),
        Column::coalesced("draft_year", INT),
        Column::coalesced("draft_round", INT),
        Column::coalesced("draft_pick", INT),
        Column::coalesced("draft_ovr", INT),
        Column::coalesced("height", INT),
        Column::coalesced("weight", INT),
        Column::coalesced("college", TEXT),
    ],
    primary_key: &["player_id", "season", "season_type"],
    foreign_keys: &[
        ForeignKey::new("player_id", "dim_players"),
        ForeignKey::new("team_id", "dim_teams"),
    ],
};

/// All tables in dependency order (parents before children)
pub static ALL_TABLES: &[&TableSchema] = &[
    &DIM_TEAMS,
    &DIM_PLAYERS,
    &TEAM_WEEKLY_STATS,
    &TEAM_YEARLY_STATS,
    &PLAYER_WEEKLY_STATS,
    &PLAYER_YEARLY_STATS,
];

/// Get a table schema by name
pub fn get_table(name: &str) -> Option<&'static TableSchema> {
    ALL_TABLES.iter().find(|t| t.name == name).copied()
}

/// Get all table names
pub fn table_names() -> Vec<&'static str> {
    ALL_TABLES.iter().map(|t| t.name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_column_names_unique_per_table() {
        for table in ALL_TABLES {
            let mut seen = HashSet::new();
            for col in table.columns {
                assert!(seen.insert(col.name), "{} declares {} twice", table.name, col.name);
            }
        }
    }

    #[test]
    fn test_keys_reference_declared_columns() {
        for table in ALL_TABLES {
            for pk in table.primary_key {
                assert!(table.column(pk).is_some(), "{}: unknown pk {}", table.name, pk);
            }
            for fk in table.foreign_keys {
                assert!(table.column(fk.column).is_some());
                let parent = get_table(fk.references_table).expect("unknown parent table");
                assert!(parent.is_primary_key(fk.references_column));
            }
        }
    }

    #[test]
    fn test_player_weekly_resolves_season_type() {
        assert!(!PLAYER_WEEKLY_STATS.merge_keys().contains(&"season_type"));
        assert!(PLAYER_WEEKLY_STATS
            .shared_columns()
            .contains(&("season_type", SharedPolicy::PeriodType)));
    }
}
