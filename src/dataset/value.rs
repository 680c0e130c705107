use serde::Serialize;

/// A single cell of a tabular dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    /// Infer a typed value from a raw CSV field.
    ///
    /// Empty fields are missing, whole numbers become integers, other numbers
    /// become reals and everything else stays text.
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::Integer(i);
        }
        if looks_numeric(trimmed) {
            if let Ok(f) = trimmed.parse::<f64>() {
                return Value::Real(f);
            }
        }
        Value::Text(raw.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value. Text is parsed leniently; NaN reads as missing.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Null => None,
            Value::Integer(i) => Some(*i as f64),
            Value::Real(f) if f.is_nan() => None,
            Value::Real(f) => Some(*f),
            Value::Text(s) => {
                let trimmed = s.trim();
                if looks_numeric(trimmed) {
                    trimmed.parse::<f64>().ok().filter(|f| !f.is_nan())
                } else {
                    None
                }
            }
        }
    }

    /// True for integers, reals and text that parses as a number.
    pub fn is_numeric(&self) -> bool {
        self.as_f64().is_some()
    }

    /// True when the value carries content: not null, not NaN, not blank text.
    pub fn is_present(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Real(f) => !f.is_nan(),
            Value::Text(s) => !s.trim().is_empty(),
            Value::Integer(_) => true,
        }
    }

    /// Canonical string form used for key comparison.
    ///
    /// Whole reals render like integers so `2023`, `2023.0` and `"2023"` all
    /// compare equal. Missing values have no canonical form.
    pub fn canonical(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Integer(i) => Some(i.to_string()),
            Value::Real(f) if f.is_nan() => None,
            Value::Real(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 => {
                Some(format!("{}", *f as i64))
            }
            Value::Real(f) => Some(f.to_string()),
            Value::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
        }
    }

    pub fn bind_to(&self, idx: usize, stmt: &mut rusqlite::Statement) -> rusqlite::Result<()> {
        match self {
            Value::Null => stmt.raw_bind_parameter(idx, rusqlite::types::Null)?,
            Value::Integer(i) => stmt.raw_bind_parameter(idx, i)?,
            Value::Real(f) => stmt.raw_bind_parameter(idx, f)?,
            Value::Text(s) => stmt.raw_bind_parameter(idx, s.as_str())?,
        }
        Ok(())
    }
}

impl rusqlite::types::ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        use rusqlite::types::ToSqlOutput;
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Value::Integer(i) => ToSqlOutput::from(*i),
            Value::Real(f) => ToSqlOutput::from(*f),
            Value::Text(s) => ToSqlOutput::from(s.as_str()),
        })
    }
}

impl From<rusqlite::types::Value> for Value {
    fn from(value: rusqlite::types::Value) -> Self {
        match value {
            rusqlite::types::Value::Null => Value::Null,
            rusqlite::types::Value::Integer(i) => Value::Integer(i),
            rusqlite::types::Value::Real(f) => Value::Real(f),
            rusqlite::types::Value::Text(s) => Value::Text(s),
            rusqlite::types::Value::Blob(b) => {
                Value::Text(String::from_utf8_lossy(&b).into_owned())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Real(f)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(s) => write!(f, "{:?}", s),
        }
    }
}

/// Rejects words that `f64::from_str` accepts but a stat file never means
/// as numbers ("inf", "nan", "infinity").
fn looks_numeric(s: &str) -> bool {
    let body = s.trim_start_matches(['+', '-']);
    body.starts_with(|c: char| c.is_ascii_digit() || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer() {
        assert_eq!(Value::infer(""), Value::Null);
        assert_eq!(Value::infer("  "), Value::Null);
        assert_eq!(Value::infer("30"), Value::Integer(30));
        assert_eq!(Value::infer("0.5"), Value::Real(0.5));
        assert_eq!(Value::infer("NE"), Value::Text("NE".to_string()));
        assert_eq!(Value::infer("nan"), Value::Text("nan".to_string()));
    }

    #[test]
    fn test_canonical_ignores_numeric_representation() {
        assert_eq!(Value::Integer(2023).canonical(), Value::Real(2023.0).canonical());
        assert_eq!(Value::Integer(2023).canonical(), Value::from("2023").canonical());
        assert_eq!(Value::Real(f64::NAN).canonical(), None);
        assert_eq!(Value::from("  ").canonical(), None);
        assert_eq!(Value::Real(1.5).canonical(), Some("1.5".to_string()));
    }

    #[test]
    fn test_as_f64() {
        assert_eq!(Value::from(" 12 ").as_f64(), Some(12.0));
        assert_eq!(Value::from("abc").as_f64(), None);
        assert_eq!(Value::Real(f64::NAN).as_f64(), None);
    }
}
