//! Tabular source reader: loads CSV extracts into [`Dataset`]s.

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::dataset::{Dataset, Value};
use crate::error::{EtlError, Result};

/// Raw extracts name the team column `team`; the warehouse calls it `team_id`.
const COLUMN_RENAMES: &[(&str, &str)] = &[("team", "team_id")];

/// Offense and defense extracts for one entity type and granularity
#[derive(Debug, Clone)]
pub struct SourcePair {
    pub offense: Dataset,
    pub defense: Dataset,
}

/// Read both extracts from `dir`. A missing file fails the pair.
pub fn load_pair(dir: &Path, offense_file: &str, defense_file: &str) -> Result<SourcePair> {
    let offense = read_extract(&dir.join(offense_file))?;
    let defense = read_extract(&dir.join(defense_file))?;
    Ok(SourcePair { offense, defense })
}

/// Read one extract and apply the standard column renames.
pub fn read_extract(path: &Path) -> Result<Dataset> {
    let mut dataset = read_csv(path)?;
    for (from, to) in COLUMN_RENAMES {
        if !dataset.has_column(to) && dataset.rename(from, to) {
            debug!("{}: renamed column '{}' to '{}'", path.display(), from, to);
        }
    }
    info!(
        "Loaded {} ({} rows, {} columns)",
        path.display(),
        dataset.len(),
        dataset.column_names().len()
    );
    Ok(dataset)
}

/// Parse a headed CSV file into a dataset, inferring a type per cell.
pub fn read_csv(path: &Path) -> Result<Dataset> {
    if !path.exists() {
        return Err(EtlError::SourceNotFound {
            path: path.to_path_buf(),
        });
    }

    let file = File::open(path).map_err(|e| csv_error(path, e.into()))?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| csv_error(path, e))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut dataset = Dataset::new(&headers);
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(path, e))?;
        dataset.push_row(record.iter().map(Value::infer).collect());
    }

    Ok(dataset)
}

fn csv_error(path: &Path, source: csv::Error) -> EtlError {
    EtlError::Csv {
        path: PathBuf::from(path),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, contents: &str) {
        let mut file = File::create(dir.path().join(name)).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn test_read_extract_infers_types_and_renames_team() {
        let dir = TempDir::new().unwrap();
        write_file(
            &dir,
            "off.csv",
            "game_id,team,season,sack\n2023_01_NE_PHI,NE,2023,1.5\n2023_01_NE_PHI,PHI,,\n",
        );

        let ds = read_extract(&dir.path().join("off.csv")).unwrap();
        assert!(ds.has_column("team_id"));
        assert!(!ds.has_column("team"));
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.get(0, "season"), &Value::Integer(2023));
        assert_eq!(ds.get(0, "sack"), &Value::Real(1.5));
        assert_eq!(ds.get(1, "season"), &Value::Null);
    }

    #[test]
    fn test_missing_file_is_source_not_found() {
        let dir = TempDir::new().unwrap();
        let err = load_pair(dir.path(), "nope_offense.csv", "nope_defense.csv").unwrap_err();
        match err {
            EtlError::SourceNotFound { path } => assert!(path.ends_with("nope_offense.csv")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
