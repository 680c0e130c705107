//! Column-oriented in-memory tables.
//!
//! A [`Dataset`] is an ordered list of named columns whose values are aligned
//! by row position. Every stage of the pipeline takes and returns one.

mod value;

pub use value::Value;

use std::collections::HashSet;

/// Separator between key components in a composite key string.
///
/// ASCII unit separator never appears in CSV stat data, so `("a-b", "c")` and
/// `("a", "b-c")` cannot collide.
pub const KEY_SEPARATOR: char = '\u{1f}';

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
    rows: usize,
}

impl Dataset {
    /// Create an empty dataset with the given column names.
    pub fn new<S: AsRef<str>>(names: &[S]) -> Self {
        Self {
            columns: names
                .iter()
                .map(|n| Column {
                    name: n.as_ref().to_string(),
                    values: Vec::new(),
                })
                .collect(),
            rows: 0,
        }
    }

    /// Build a dataset from row-major data. Short rows are padded with nulls.
    pub fn from_rows<S: AsRef<str>>(names: &[S], rows: Vec<Vec<Value>>) -> Self {
        let mut dataset = Self::new(names);
        for row in rows {
            dataset.push_row(row);
        }
        dataset
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Vec<Value>> {
        self.columns
            .iter_mut()
            .find(|c| c.name == name)
            .map(|c| &mut c.values)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Value at (row, column name); absent columns read as null.
    pub fn get(&self, row: usize, name: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.column(name)
            .and_then(|values| values.get(row))
            .unwrap_or(&NULL)
    }

    pub fn row(&self, row: usize) -> Vec<Value> {
        self.columns.iter().map(|c| c.values[row].clone()).collect()
    }

    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        for (column, value) in self.columns.iter_mut().zip(row) {
            column.values.push(value);
        }
        self.rows += 1;
    }

    /// Append a column. Missing trailing values are filled with nulls.
    pub fn add_column(&mut self, name: &str, mut values: Vec<Value>) {
        values.resize(self.rows, Value::Null);
        if let Some(existing) = self.column_mut(name) {
            *existing = values;
        } else {
            self.columns.push(Column {
                name: name.to_string(),
                values,
            });
        }
    }

    pub fn drop_column(&mut self, name: &str) -> Option<Vec<Value>> {
        let idx = self.column_index(name)?;
        Some(self.columns.remove(idx).values)
    }

    /// Rename a column; returns false when `from` is absent.
    pub fn rename(&mut self, from: &str, to: &str) -> bool {
        match self.columns.iter_mut().find(|c| c.name == from) {
            Some(column) => {
                column.name = to.to_string();
                true
            }
            None => false,
        }
    }

    /// Project onto the named columns, keeping the requested order and
    /// silently skipping names that are not present.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Dataset {
        let mut seen = HashSet::new();
        let columns: Vec<Column> = names
            .iter()
            .map(|n| n.as_ref())
            .filter(|n| seen.insert(*n))
            .filter_map(|n| self.columns.iter().find(|c| c.name == n).cloned())
            .collect();
        Dataset {
            columns,
            rows: self.rows,
        }
    }

    /// Keep only rows whose mask entry is true.
    pub fn retain_rows(&mut self, keep: &[bool]) {
        debug_assert_eq!(keep.len(), self.rows);
        for column in &mut self.columns {
            let mut flags = keep.iter();
            column.values.retain(|_| *flags.next().unwrap_or(&false));
        }
        self.rows = keep.iter().filter(|k| **k).count();
    }

    /// Rows appended from `other`, matched by column name.
    ///
    /// Columns only in `other` are added; columns missing from `other` get nulls.
    pub fn concat(&mut self, other: &Dataset) {
        for column in &other.columns {
            if !self.has_column(&column.name) {
                self.add_column(&column.name, Vec::new());
            }
        }
        let existing_rows = self.rows;
        for column in &mut self.columns {
            match other.column(&column.name) {
                Some(values) => column.values.extend_from_slice(values),
                None => column
                    .values
                    .extend(std::iter::repeat(Value::Null).take(other.rows)),
            }
        }
        self.rows = existing_rows + other.rows;
    }

    /// Canonical composite key for one row, or `None` if any component is missing.
    pub fn key_string<S: AsRef<str>>(&self, row: usize, key_columns: &[S]) -> Option<String> {
        let mut parts = Vec::with_capacity(key_columns.len());
        for name in key_columns {
            parts.push(self.get(row, name.as_ref()).canonical()?);
        }
        Some(join_key(&parts))
    }
}

pub fn join_key<S: AsRef<str>>(parts: &[S]) -> String {
    let mut key = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            key.push(KEY_SEPARATOR);
        }
        key.push_str(part.as_ref());
    }
    key
}

/// Human-readable form of a composite key for log output.
pub fn display_key(key: &str) -> String {
    key.split(KEY_SEPARATOR).collect::<Vec<_>>().join(", ")
}
