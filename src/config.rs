use std::path::PathBuf;

use crate::error::{EtlError, Result};

pub const DATABASE_VAR: &str = "GRIDIRON_DATABASE";
pub const DATA_DIR_VAR: &str = "GRIDIRON_DATA_DIR";
pub const BATCH_SIZE_VAR: &str = "GRIDIRON_BATCH_SIZE";

/// Rows per INSERT chunk when no batch size is configured
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Settings resolved once at process start
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// SQLite warehouse file
    pub database: PathBuf,
    /// Directory holding the offense/defense CSV extracts
    pub data_dir: PathBuf,
    pub batch_size: usize,
}

impl Config {
    /// Resolve configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| EtlError::Config(format!("{} is not set", name)))
        };

        let database = PathBuf::from(required(DATABASE_VAR)?);
        let data_dir = PathBuf::from(required(DATA_DIR_VAR)?);

        let batch_size = match lookup(BATCH_SIZE_VAR) {
            None => DEFAULT_BATCH_SIZE,
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(EtlError::Config(format!(
                        "{} must be a positive integer, got {:?}",
                        BATCH_SIZE_VAR, raw
                    )))
                }
            },
        };

        Ok(Self {
            database,
            data_dir,
            batch_size,
        })
    }
}
