use anyhow::{bail, Context, Result};
use gridiron_warehouse::{
    cli::{Cli, Commands},
    config::Config,
    crud,
    filter::resolve_tables,
    pipeline::run_jobs,
    schema::{table_names, ALL_TABLES},
    store::SqliteStore,
};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse_args();

    match cli.command {
        Commands::Load { include, exclude } => {
            let start = Instant::now();
            let config = Config::from_env()?;
            let tables = resolve_tables(include, exclude)?;
            let mut store = open_store(&config)?;

            let summary = run_jobs(&mut store, &tables, &config.data_dir, config.batch_size);

            info!(
                "Appended {} rows across {} tables in {:.1}s",
                summary.appended(),
                summary.reports.len(),
                start.elapsed().as_secs_f64()
            );
            if !summary.is_success() {
                let failed: Vec<&str> = summary.failures.iter().map(|(t, _)| *t).collect();
                bail!("{} job(s) failed: {}", failed.len(), failed.join(", "));
            }
        }

        Commands::ListTables => {
            println!("Available tables:\n");
            for name in table_names() {
                println!("  {}", name);
            }
        }

        Commands::Show { table, key } => {
            let store = open_store(&Config::from_env()?)?;
            let output = if key.is_empty() {
                serde_json::to_string_pretty(&crud::fetch_all(store.connection(), &table)?)?
            } else {
                match crud::fetch_by_key(store.connection(), &table, &key)? {
                    Some(row) => serde_json::to_string_pretty(&row)?,
                    None => bail!("{}: no row with key ({})", table, key.join(", ")),
                }
            };
            println!("{}", output);
        }

        Commands::Insert { table, json } => {
            let store = open_store(&Config::from_env()?)?;
            let input: serde_json::Value = serde_json::from_str(&json).context("parsing row JSON")?;
            let row = crud::insert_row(store.connection(), &table, &input)?;
            println!("{}", serde_json::to_string_pretty(&row)?);
        }

        Commands::Update { table, json, key } => {
            let store = open_store(&Config::from_env()?)?;
            let input: serde_json::Value = serde_json::from_str(&json).context("parsing row JSON")?;
            let row = crud::update_row(store.connection(), &table, &input, &key)?;
            println!("{}", serde_json::to_string_pretty(&row)?);
        }

        Commands::Delete { table, key } => {
            let store = open_store(&Config::from_env()?)?;
            let row = crud::delete_row(store.connection(), &table, &key)?;
            println!("{}", serde_json::to_string_pretty(&row)?);
        }
    }

    Ok(())
}

fn open_store(config: &Config) -> Result<SqliteStore> {
    crud::validate_field_maps()?;
    let store = SqliteStore::open(&config.database)
        .with_context(|| format!("opening warehouse {}", config.database.display()))?;
    store.create_tables(ALL_TABLES)?;
    info!("Connected to warehouse {}", config.database.display());
    Ok(store)
}
