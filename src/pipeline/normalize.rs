use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::dataset::{Dataset, Value};
use crate::error::{EtlError, Result};
use crate::schema::{ColumnType, TableSchema};

const MAX_SAMPLES: usize = 5;

/// Target storage type per column
#[derive(Debug, Clone, Default)]
pub struct TypeRules {
    integer: BTreeSet<String>,
    float: BTreeSet<String>,
    /// Declared text columns: numbers are stored in their canonical text form
    text: BTreeSet<String>,
    /// Key columns by declared type: canonicalized, nothing filled or rejected
    keys: BTreeMap<String, ColumnType>,
}

impl TypeRules {
    pub fn new(integer: &[&str], float: &[&str]) -> Self {
        Self {
            integer: integer.iter().map(|s| s.to_string()).collect(),
            float: float.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Storage types of a table's columns.
    ///
    /// Primary-key, merge-key and foreign-key columns are only canonicalized
    /// to their declared type so they compare equal to what the store returns.
    pub fn from_schema(schema: &TableSchema) -> Self {
        let merge_keys = schema.merge_keys();
        let mut rules = Self::default();
        for col in schema.columns {
            let is_key = schema.is_primary_key(col.name)
                || merge_keys.contains(&col.name)
                || schema.foreign_keys.iter().any(|fk| fk.column == col.name);
            if is_key {
                rules.keys.insert(col.name.to_string(), col.col_type);
                continue;
            }
            let set = match col.col_type {
                ColumnType::Integer => &mut rules.integer,
                ColumnType::Real => &mut rules.float,
                ColumnType::Text => &mut rules.text,
            };
            set.insert(col.name.to_string());
        }
        rules
    }

    /// Store these integer-declared columns as floats instead
    pub fn with_float_overrides(mut self, overrides: &[&str]) -> Self {
        for name in overrides {
            self.integer.remove(*name);
            self.float.insert(name.to_string());
        }
        self
    }

    pub fn is_integer(&self, name: &str) -> bool {
        self.integer.contains(name)
    }

    pub fn is_float(&self, name: &str) -> bool {
        self.float.contains(name)
    }

    pub fn is_text(&self, name: &str) -> bool {
        self.text.contains(name)
    }

    pub fn key_type(&self, name: &str) -> Option<ColumnType> {
        self.keys.get(name).copied()
    }
}

/// Coerce every non-key column to its storage type.
///
/// Integer columns fill missing and non-numeric values with 0 but refuse
/// values with a fractional part. Float columns fill missing values with 0.0.
/// Declared numeric columns absent from the data are added as zeros. Other
/// numbers in declared text columns become their canonical text. Undeclared
/// columns holding only numbers are stored as floats; text is left alone.
pub fn normalize(mut dataset: Dataset, rules: &TypeRules) -> Result<Dataset> {
    let rows = dataset.len();

    for name in &rules.integer {
        if !dataset.has_column(name) {
            debug!("Adding missing integer column {} as zeros", name);
            dataset.add_column(name, vec![Value::Integer(0); rows]);
        }
    }
    for name in &rules.float {
        if !dataset.has_column(name) {
            debug!("Adding missing float column {} as zeros", name);
            dataset.add_column(name, vec![Value::Real(0.0); rows]);
        }
    }

    let names: Vec<String> = dataset.column_names().iter().map(|s| s.to_string()).collect();
    let mut inferred = Vec::new();

    for name in &names {
        let Some(values) = dataset.column_mut(name) else {
            continue;
        };

        if let Some(col_type) = rules.key_type(name) {
            canonicalize_key(values, col_type);
        } else if rules.text.contains(name) {
            canonicalize_text(values);
        } else if rules.integer.contains(name) {
            coerce_integers(name, values)?;
        } else if rules.float.contains(name) {
            coerce_floats(name, values)?;
        } else if is_numeric_column(values) {
            coerce_floats(name, values)?;
            inferred.push(name.as_str());
        }
    }

    if !inferred.is_empty() {
        info!(
            "Stored {} undeclared numeric columns as floats: {}",
            inferred.len(),
            inferred.join(", ")
        );
    }

    Ok(dataset)
}

fn coerce_integers(name: &str, values: &mut [Value]) -> Result<()> {
    let mut samples = Vec::new();

    for value in values.iter_mut() {
        let coerced = match &*value {
            Value::Integer(i) => Some(*i),
            Value::Null => Some(0),
            Value::Real(f) if f.is_nan() => Some(0),
            Value::Real(f) => whole(*f),
            Value::Text(s) => match s.trim().parse::<i64>() {
                Ok(i) => Some(i),
                Err(_) => match value.as_f64() {
                    Some(f) => whole(f),
                    None => Some(0),
                },
            },
        };

        match coerced {
            Some(i) => *value = Value::Integer(i),
            None if samples.len() < MAX_SAMPLES => samples.push(value.to_string()),
            None => {}
        }
    }

    if samples.is_empty() {
        Ok(())
    } else {
        Err(EtlError::MalformedColumn {
            column: name.to_string(),
            expected: "integer",
            samples,
        })
    }
}

fn whole(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.2e18 {
        Some(f as i64)
    } else {
        None
    }
}

fn coerce_floats(name: &str, values: &mut [Value]) -> Result<()> {
    let mut samples = Vec::new();

    for value in values.iter_mut() {
        let coerced = match &*value {
            Value::Real(f) if f.is_nan() => Some(0.0),
            Value::Real(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            Value::Null => Some(0.0),
            Value::Text(_) => Some(value.as_f64().unwrap_or(0.0)),
        };

        match coerced {
            Some(f) if f.is_finite() => *value = Value::Real(f),
            _ if samples.len() < MAX_SAMPLES => samples.push(value.to_string()),
            _ => {}
        }
    }

    if samples.is_empty() {
        Ok(())
    } else {
        Err(EtlError::MalformedColumn {
            column: name.to_string(),
            expected: "float",
            samples,
        })
    }
}

fn canonicalize_key(values: &mut [Value], col_type: ColumnType) {
    match col_type {
        ColumnType::Text => canonicalize_text(values),
        ColumnType::Integer | ColumnType::Real => {
            for value in values.iter_mut() {
                let whole_number = match &*value {
                    Value::Real(f) => whole(*f),
                    Value::Text(s) => s.trim().parse::<i64>().ok(),
                    _ => None,
                };
                if let Some(i) = whole_number {
                    *value = Value::Integer(i);
                }
            }
        }
    }
}

/// `1` and `1.0` both become `"1"`; missing values stay missing.
fn canonicalize_text(values: &mut [Value]) {
    for value in values.iter_mut() {
        if matches!(value, Value::Integer(_) | Value::Real(_)) {
            *value = match value.canonical() {
                Some(text) => Value::Text(text),
                None => Value::Null,
            };
        }
    }
}

fn is_numeric_column(values: &[Value]) -> bool {
    let mut any = false;
    for value in values {
        if !value.is_present() {
            continue;
        }
        if !value.is_numeric() {
            return false;
        }
        any = true;
    }
    any
}
