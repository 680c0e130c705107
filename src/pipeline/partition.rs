use tracing::debug;

use crate::dataset::Dataset;
use crate::error::{EtlError, Result};
use crate::schema::{SharedPolicy, TableSchema};

/// Which extract a dataset came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Offense,
    Defense,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Offense => write!(f, "offense"),
            Side::Defense => write!(f, "defense"),
        }
    }
}

/// Disjoint column groups for one fact table
#[derive(Debug, Clone)]
pub struct ColumnClasses {
    pub merge_keys: Vec<&'static str>,
    pub offense_only: Vec<&'static str>,
    pub defense_only: Vec<&'static str>,
    pub shared: Vec<(&'static str, SharedPolicy)>,
}

impl ColumnClasses {
    pub fn from_schema(schema: &TableSchema) -> Self {
        Self {
            merge_keys: schema.merge_keys(),
            offense_only: schema.offense_columns(),
            defense_only: schema.defense_columns(),
            shared: schema.shared_columns(),
        }
    }

    /// Columns read from one side: merge keys, that side's own stats, shared stats
    pub fn wanted(&self, side: Side) -> Vec<&'static str> {
        let own = match side {
            Side::Offense => &self.offense_only,
            Side::Defense => &self.defense_only,
        };
        self.merge_keys
            .iter()
            .chain(own.iter())
            .chain(self.shared.iter().map(|(name, _)| name))
            .copied()
            .collect()
    }

    /// Names that appear in more than one group
    pub fn overlaps(&self) -> Vec<&'static str> {
        let mut seen = std::collections::HashSet::new();
        let mut overlaps = Vec::new();
        let all = self
            .merge_keys
            .iter()
            .chain(&self.offense_only)
            .chain(&self.defense_only)
            .chain(self.shared.iter().map(|(name, _)| name));
        for name in all {
            if !seen.insert(*name) {
                overlaps.push(*name);
            }
        }
        overlaps
    }
}

/// Project one extract onto the columns its side contributes.
///
/// Merge keys are mandatory; any other expected column that is absent is
/// treated as not available for this run.
pub fn partition(dataset: &Dataset, classes: &ColumnClasses, side: Side) -> Result<Dataset> {
    for key in &classes.merge_keys {
        if !dataset.has_column(key) {
            return Err(EtlError::MissingColumn {
                dataset: format!("{} extract", side),
                column: key.to_string(),
            });
        }
    }

    let wanted = classes.wanted(side);
    let missing: Vec<&str> = wanted
        .iter()
        .filter(|name| !dataset.has_column(name))
        .copied()
        .collect();
    if !missing.is_empty() {
        debug!(
            "{} extract lacks {} expected columns: {}",
            side,
            missing.len(),
            missing.join(", ")
        );
    }

    Ok(dataset.select(&wanted))
}
