use crate::schema::{resolve_excludes, resolve_includes, TableSchema, ALL_TABLES};
use anyhow::{anyhow, bail, Result};
use tracing::info;

/// Resolves which tables to load based on include/exclude filters
pub fn resolve_tables(
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
) -> Result<Vec<&'static TableSchema>> {
    let tables = match (include, exclude) {
        (Some(_), Some(_)) => {
            bail!("Cannot use both --include and --exclude at the same time");
        }
        (Some(include_list), None) => {
            let refs: Vec<&str> = include_list.iter().map(|s| s.as_str()).collect();
            info!("Resolving dependencies for: {:?}", refs);
            resolve_includes(&refs).map_err(|e| anyhow!(e))?
        }
        (None, Some(exclude_list)) => {
            let refs: Vec<&str> = exclude_list.iter().map(|s| s.as_str()).collect();
            info!("Excluding tables: {:?}", refs);
            resolve_excludes(&refs).map_err(|e| anyhow!(e))?
        }
        (None, None) => ALL_TABLES.to_vec(),
    };

    let names: Vec<&str> = tables.iter().map(|t| t.name).collect();
    info!("Loading {} tables: {}", tables.len(), names.join(", "));

    Ok(tables)
}
