use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "gridiron-warehouse")]
#[command(version, about = "Load offense/defense football stat extracts into a SQLite warehouse")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the load jobs (all tables when no filter is given)
    Load {
        /// Only load these tables and the dimensions they reference (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        include: Option<Vec<String>>,

        /// Skip these tables (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        exclude: Option<Vec<String>>,
    },

    /// List all warehouse table names
    ListTables,

    /// Print rows of a table as JSON; with a key, only that row
    Show {
        table: String,

        /// Primary key values in key-column order
        key: Vec<String>,
    },

    /// Insert one row from a JSON object with camelCase fields
    Insert { table: String, json: String },

    /// Update fields of one row identified by its primary key
    Update {
        table: String,
        json: String,

        /// Primary key values in key-column order
        #[arg(required = true)]
        key: Vec<String>,
    },

    /// Delete one row identified by its primary key
    Delete {
        table: String,

        /// Primary key values in key-column order
        #[arg(required = true)]
        key: Vec<String>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_load_include() {
        let cli = Cli::try_parse_from([
            "gridiron-warehouse",
            "load",
            "--include",
            "dim_teams,team_weekly_stats",
        ])
        .unwrap();
        match cli.command {
            Commands::Load { include, exclude } => {
                assert_eq!(
                    include,
                    Some(vec!["dim_teams".to_string(), "team_weekly_stats".to_string()])
                );
                assert!(exclude.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_update_requires_key() {
        assert!(Cli::try_parse_from(["gridiron-warehouse", "update", "dim_teams", "{}"]).is_err());
        let cli = Cli::try_parse_from([
            "gridiron-warehouse",
            "update",
            "dim_teams",
            "{\"city\":\"Foxborough\"}",
            "NE",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Update { ref key, .. } if key == &["NE".to_string()]
        ));
    }
}
