use std::collections::HashSet;

/// Column data type in the warehouse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
        }
    }
}

/// How a column present in both the offense and defense extract is merged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharedPolicy {
    /// Additive count: `(left or 0) + (right or 0)`
    Sum,
    /// Descriptive value: left if present, else right
    CoalesceLeft,
    /// Season/period label normalized to `Reg` / `Post`
    PeriodType,
}

/// Which extract a column is taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSource {
    /// Merge key, read from both extracts and joined on
    Key,
    Offense,
    Defense,
    /// May appear in both extracts; resolved by the policy
    Shared(SharedPolicy),
    /// Descriptive attribute not read from a stat extract
    Attribute,
}

/// Column definition
#[derive(Debug, Clone)]
pub struct Column {
    pub name: &'static str,
    pub col_type: ColumnType,
    pub source: ColumnSource,
    /// Override API field name (default: camelCase of name)
    pub api_field: Option<&'static str>,
}

impl Column {
    pub const fn new(name: &'static str, col_type: ColumnType, source: ColumnSource) -> Self {
        Self {
            name,
            col_type,
            source,
            api_field: None,
        }
    }

    /// Merge-key column
    pub const fn key(name: &'static str, col_type: ColumnType) -> Self {
        Self::new(name, col_type, ColumnSource::Key)
    }

    /// Stat only found in the offense extract
    pub const fn offense(name: &'static str, col_type: ColumnType) -> Self {
        Self::new(name, col_type, ColumnSource::Offense)
    }

    /// Stat only found in the defense extract
    pub const fn defense(name: &'static str, col_type: ColumnType) -> Self {
        Self::new(name, col_type, ColumnSource::Defense)
    }

    /// Shared count, summed across extracts
    pub const fn summed(name: &'static str, col_type: ColumnType) -> Self {
        Self::new(name, col_type, ColumnSource::Shared(SharedPolicy::Sum))
    }

    /// Shared descriptive value, offense extract preferred
    pub const fn coalesced(name: &'static str, col_type: ColumnType) -> Self {
        Self::new(name, col_type, ColumnSource::Shared(SharedPolicy::CoalesceLeft))
    }

    /// Season type label resolved across extracts
    pub const fn period(name: &'static str) -> Self {
        Self::new(name, ColumnType::Text, ColumnSource::Shared(SharedPolicy::PeriodType))
    }

    pub const fn attribute(name: &'static str, col_type: ColumnType) -> Self {
        Self::new(name, col_type, ColumnSource::Attribute)
    }

    /// Set the API field name (for when it differs from camelCase of column name)
    pub const fn api(self, field: &'static str) -> Self {
        Self {
            api_field: Some(field),
            ..self
        }
    }
}

/// Foreign key reference
#[derive(Debug, Clone)]
pub struct ForeignKey {
    pub column: &'static str,
    pub references_table: &'static str,
    pub references_column: &'static str,
}

impl ForeignKey {
    /// Reference to a dimension table keyed by the same column name
    pub const fn new(column: &'static str, references_table: &'static str) -> Self {
        Self {
            column,
            references_table,
            references_column: column,
        }
    }
}

/// Table schema definition
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [Column],
    pub primary_key: &'static [&'static str],
    pub foreign_keys: &'static [ForeignKey],
}

impl TableSchema {
    /// Get all tables this table depends on (FK parents)
    pub fn dependencies(&self) -> HashSet<&'static str> {
        self.foreign_keys
            .iter()
            .map(|fk| fk.references_table)
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    pub fn is_primary_key(&self, name: &str) -> bool {
        self.primary_key.contains(&name)
    }

    /// Columns the offense and defense extracts are joined on
    pub fn merge_keys(&self) -> Vec<&'static str> {
        self.columns_from(|s| s == ColumnSource::Key)
    }

    pub fn offense_columns(&self) -> Vec<&'static str> {
        self.columns_from(|s| s == ColumnSource::Offense)
    }

    pub fn defense_columns(&self) -> Vec<&'static str> {
        self.columns_from(|s| s == ColumnSource::Defense)
    }

    pub fn shared_columns(&self) -> Vec<(&'static str, SharedPolicy)> {
        self.columns
            .iter()
            .filter_map(|c| match c.source {
                ColumnSource::Shared(policy) => Some((c.name, policy)),
                _ => None,
            })
            .collect()
    }

    pub fn columns_of_type(&self, col_type: ColumnType) -> Vec<&'static str> {
        self.columns
            .iter()
            .filter(|c| c.col_type == col_type)
            .map(|c| c.name)
            .collect()
    }

    fn columns_from(&self, pred: impl Fn(ColumnSource) -> bool) -> Vec<&'static str> {
        self.columns
            .iter()
            .filter(|c| pred(c.source))
            .map(|c| c.name)
            .collect()
    }
}
