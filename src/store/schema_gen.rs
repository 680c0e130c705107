use crate::schema::TableSchema;

/// Generate CREATE TABLE SQL for a table schema.
///
/// Existing tables are left alone so the warehouse accumulates across runs.
pub fn generate_create_table(schema: &TableSchema) -> String {
    let mut sql = format!("CREATE TABLE IF NOT EXISTS {} (\n", schema.name);
    let mut columns = Vec::new();

    for col in schema.columns {
        let null_constraint = if schema.is_primary_key(col.name) {
            " NOT NULL"
        } else {
            ""
        };
        columns.push(format!(
            "    {} {}{}",
            col.name,
            col.col_type.sql_type(),
            null_constraint
        ));
    }

    columns.push(format!(
        "    PRIMARY KEY ({})",
        schema.primary_key.join(", ")
    ));

    // Add foreign key constraints
    for fk in schema.foreign_keys {
        columns.push(format!(
            "    FOREIGN KEY ({}) REFERENCES {}({})",
            fk.column, fk.references_table, fk.references_column
        ));
    }

    sql.push_str(&columns.join(",\n"));
    sql.push_str("\n)");

    sql
}

/// Generate CREATE INDEX statements for foreign key columns
pub fn generate_indexes(schema: &TableSchema) -> Vec<String> {
    schema
        .foreign_keys
        .iter()
        .map(|fk| {
            format!(
                "CREATE INDEX IF NOT EXISTS idx_{}_{} ON {}({})",
                schema.name, fk.column, schema.name, fk.column
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::tables::{DIM_TEAMS, PLAYER_WEEKLY_STATS};

    #[test]
    fn test_generate_create_table() {
        let sql = generate_create_table(&PLAYER_WEEKLY_STATS);
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS player_weekly_stats"));
        assert!(sql.contains("player_id TEXT NOT NULL"));
        assert!(sql.contains("sack REAL,"));
        assert!(sql.contains("PRIMARY KEY (player_id, season, season_type, week)"));
        assert!(sql.contains("FOREIGN KEY (team_id) REFERENCES dim_teams(team_id)"));
    }

    #[test]
    fn test_generate_indexes() {
        let indexes = generate_indexes(&PLAYER_WEEKLY_STATS);
        assert_eq!(indexes.len(), 2);
        assert!(indexes.iter().any(|i| i.contains("idx_player_weekly_stats_player_id")));
        assert!(generate_indexes(&DIM_TEAMS).is_empty());
    }
}
