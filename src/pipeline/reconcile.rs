use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::dataset::{join_key, Dataset, Value};
use crate::error::{EtlError, Result};
use crate::schema::SharedPolicy;

pub const REGULAR_SEASON: &str = "Reg";
pub const POSTSEASON: &str = "Post";
pub const UNKNOWN_PERIOD: &str = "Unknown";

/// Stand-in for a missing key component so missing keys join with each other
const NULL_KEY_TOKEN: &str = "\u{0}";

/// Full outer join of the offense (left) and defense (right) partitions.
///
/// Every key present on either side appears in the output. Columns found on
/// both sides are resolved by their shared policy; a collision with no
/// configured policy keeps the left value when present.
pub fn reconcile(
    left: &Dataset,
    right: &Dataset,
    merge_keys: &[&str],
    policies: &[(&str, SharedPolicy)],
) -> Result<Dataset> {
    for (label, side) in [("offense partition", left), ("defense partition", right)] {
        for key in merge_keys {
            if !side.has_column(key) {
                return Err(EtlError::MissingColumn {
                    dataset: label.to_string(),
                    column: key.to_string(),
                });
            }
        }
    }

    let keys: HashSet<&str> = merge_keys.iter().copied().collect();
    let left_cols: Vec<&str> = left
        .column_names()
        .into_iter()
        .filter(|c| !keys.contains(c))
        .collect();
    let policy_of = |name: &str| policies.iter().find(|(col, _)| *col == name).map(|(_, p)| *p);
    // Period labels are normalized even when only one extract carries them
    let single_side = |name: &str| policy_of(name).filter(|p| *p == SharedPolicy::PeriodType);

    let right_only: Vec<(&str, Option<SharedPolicy>)> = right
        .column_names()
        .into_iter()
        .filter(|c| !keys.contains(c) && !left.has_column(c))
        .map(|name| (name, single_side(name)))
        .collect();

    let resolved: Vec<(&str, Option<SharedPolicy>)> = left_cols
        .iter()
        .map(|name| {
            if !right.has_column(name) {
                return (*name, single_side(name));
            }
            let policy = policy_of(name).unwrap_or_else(|| {
                debug!("No merge policy for shared column {}; keeping offense value", name);
                SharedPolicy::CoalesceLeft
            });
            (*name, Some(policy))
        })
        .collect();

    let mut output_names: Vec<&str> = merge_keys.to_vec();
    output_names.extend(&left_cols);
    output_names.extend(right_only.iter().map(|(name, _)| *name));
    let mut merged = Dataset::new(&output_names);

    let mut right_index: HashMap<String, Vec<usize>> = HashMap::new();
    for row in 0..right.len() {
        right_index.entry(join_token(right, row, merge_keys)).or_default().push(row);
    }

    let build = |l: Option<usize>, r: Option<usize>| -> Vec<Value> {
        let pick = |ds: &Dataset, row: Option<usize>, col: &str| -> Value {
            row.map(|i| ds.get(i, col).clone()).unwrap_or(Value::Null)
        };

        let mut values = Vec::with_capacity(output_names.len());
        for key in merge_keys {
            let value = match l {
                Some(_) => pick(left, l, key),
                None => pick(right, r, key),
            };
            values.push(value);
        }
        for (name, policy) in resolved.iter().chain(&right_only) {
            let a = pick(left, l, name);
            let b = pick(right, r, name);
            let value = match policy {
                Some(policy) => resolve_shared(*policy, &a, &b),
                None if left.has_column(name) => a,
                None => b,
            };
            values.push(value);
        }
        values
    };

    let mut matched = vec![false; right.len()];
    for l in 0..left.len() {
        match right_index.get(&join_token(left, l, merge_keys)) {
            Some(rows) => {
                for &r in rows {
                    matched[r] = true;
                    merged.push_row(build(Some(l), Some(r)));
                }
            }
            None => merged.push_row(build(Some(l), None)),
        }
    }
    for (r, was_matched) in matched.iter().enumerate() {
        if !was_matched {
            merged.push_row(build(None, Some(r)));
        }
    }

    debug!(
        "Reconciled {} offense rows and {} defense rows into {}",
        left.len(),
        right.len(),
        merged.len()
    );

    Ok(merged)
}

fn join_token(ds: &Dataset, row: usize, merge_keys: &[&str]) -> String {
    let parts: Vec<String> = merge_keys
        .iter()
        .map(|k| {
            ds.get(row, k)
                .canonical()
                .unwrap_or_else(|| NULL_KEY_TOKEN.to_string())
        })
        .collect();
    join_key(&parts)
}

pub fn resolve_shared(policy: SharedPolicy, left: &Value, right: &Value) -> Value {
    match policy {
        SharedPolicy::Sum => sum_values(left, right),
        SharedPolicy::CoalesceLeft => coalesce_left(left, right),
        SharedPolicy::PeriodType => resolve_period_type(left, right),
    }
}

#[derive(Clone, Copy)]
enum Number {
    Int(i64),
    Real(f64),
}

fn number(value: &Value) -> Number {
    match value {
        Value::Integer(i) => Number::Int(*i),
        Value::Real(f) if f.is_nan() => Number::Int(0),
        Value::Real(f) => Number::Real(*f),
        Value::Text(s) => {
            let trimmed = s.trim();
            match trimmed.parse::<i64>() {
                Ok(i) => Number::Int(i),
                Err(_) => value.as_f64().map(Number::Real).unwrap_or(Number::Int(0)),
            }
        }
        Value::Null => Number::Int(0),
    }
}

/// Additive merge with missing values counted as zero.
///
/// Present text that is not a number is carried through unchanged so type
/// normalization can reject the column.
pub fn sum_values(left: &Value, right: &Value) -> Value {
    for side in [left, right] {
        if side.is_present() && !side.is_numeric() {
            return side.clone();
        }
    }

    match (number(left), number(right)) {
        (Number::Int(a), Number::Int(b)) => match a.checked_add(b) {
            Some(sum) => Value::Integer(sum),
            None => Value::Real(a as f64 + b as f64),
        },
        (a, b) => Value::Real(as_real(a) + as_real(b)),
    }
}

fn as_real(n: Number) -> f64 {
    match n {
        Number::Int(i) => i as f64,
        Number::Real(f) => f,
    }
}

/// Left value when present, otherwise right.
pub fn coalesce_left(left: &Value, right: &Value) -> Value {
    if left.is_present() {
        left.clone()
    } else if right.is_present() {
        right.clone()
    } else {
        Value::Null
    }
}

/// Season type label agreed between the two extracts.
///
/// Either side naming the regular season wins, then either side naming the
/// postseason. Anything else keeps the first non-empty label, capitalized.
pub fn resolve_period_type(left: &Value, right: &Value) -> Value {
    let a = period_label(left);
    let b = period_label(right);

    if is_regular(&a) || is_regular(&b) {
        return Value::from(REGULAR_SEASON);
    }
    if is_postseason(&a) || is_postseason(&b) {
        return Value::from(POSTSEASON);
    }

    let first = if !a.is_empty() { a } else { b };
    if first.is_empty() {
        return Value::from(UNKNOWN_PERIOD);
    }
    Value::Text(capitalize(&first))
}

fn period_label(value: &Value) -> String {
    if !value.is_present() {
        return String::new();
    }
    match value {
        Value::Text(s) => s.trim().to_lowercase(),
        other => other.canonical().unwrap_or_default().to_lowercase(),
    }
}

fn is_regular(label: &str) -> bool {
    label == "reg" || label.starts_with("regular")
}

fn is_postseason(label: &str) -> bool {
    label.starts_with("post")
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_counts_missing_as_zero() {
        assert_eq!(sum_values(&Value::Integer(1), &Value::Null), Value::Integer(1));
        assert_eq!(sum_values(&Value::Null, &Value::Null), Value::Integer(0));
        assert_eq!(sum_values(&Value::Integer(2), &Value::Integer(3)), Value::Integer(5));
        assert_eq!(sum_values(&Value::Real(0.5), &Value::Integer(1)), Value::Real(1.5));
        assert_eq!(sum_values(&Value::Real(f64::NAN), &Value::Integer(4)), Value::Integer(4));
    }

    #[test]
    fn test_sum_keeps_malformed_text() {
        assert_eq!(
            sum_values(&Value::Integer(1), &Value::from("abc")),
            Value::from("abc")
        );
    }

    #[test]
    fn test_coalesce_left() {
        assert_eq!(coalesce_left(&Value::from("4-1"), &Value::from("3-2")), Value::from("4-1"));
        assert_eq!(coalesce_left(&Value::Null, &Value::from("3-2")), Value::from("3-2"));
        assert_eq!(coalesce_left(&Value::Null, &Value::Null), Value::Null);
    }

    #[test]
    fn test_period_type_resolution() {
        let reg = Value::from(REGULAR_SEASON);
        let post = Value::from(POSTSEASON);
        assert_eq!(resolve_period_type(&Value::from("REG"), &Value::from("post")), reg);
        assert_eq!(resolve_period_type(&Value::from("POST"), &Value::Null), post);
        assert_eq!(resolve_period_type(&Value::Null, &Value::from("Regular Season")), reg);
        assert_eq!(resolve_period_type(&Value::from("postseason"), &Value::from("")), post);
        assert_eq!(
            resolve_period_type(&Value::from(" PRE "), &Value::Null),
            Value::from("Pre")
        );
        assert_eq!(
            resolve_period_type(&Value::Null, &Value::Null),
            Value::from(UNKNOWN_PERIOD)
        );
    }

    #[test]
    fn test_outer_join_keeps_both_sides() {
        let left = Dataset::from_rows(
            &["team_id", "season", "pass_attempts", "safety", "record"],
            vec![
                vec!["NE".into(), 2023.into(), 30.into(), 1.into(), "4-1".into()],
                vec!["KC".into(), 2023.into(), 25.into(), Value::Null, "5-0".into()],
            ],
        );
        let right = Dataset::from_rows(
            &["team_id", "season", "sack", "safety", "record"],
            vec![
                vec!["NE".into(), Value::Real(2023.0), Value::Real(2.5), 1.into(), "3-2".into()],
                vec!["BUF".into(), 2023.into(), Value::Real(1.0), 2.into(), "2-3".into()],
            ],
        );
        let policies = [("safety", SharedPolicy::Sum), ("record", SharedPolicy::CoalesceLeft)];

        let merged = reconcile(&left, &right, &["team_id", "season"], &policies).unwrap();
        assert_eq!(
            merged.column_names(),
            vec!["team_id", "season", "pass_attempts", "safety", "record", "sack"]
        );
        assert_eq!(merged.len(), 3);

        // matched row
        assert_eq!(merged.get(0, "team_id"), &Value::from("NE"));
        assert_eq!(merged.get(0, "safety"), &Value::Integer(2));
        assert_eq!(merged.get(0, "record"), &Value::from("4-1"));
        assert_eq!(merged.get(0, "sack"), &Value::Real(2.5));

        // offense only
        assert_eq!(merged.get(1, "team_id"), &Value::from("KC"));
        assert_eq!(merged.get(1, "safety"), &Value::Integer(0));
        assert_eq!(merged.get(1, "sack"), &Value::Null);

        // defense only
        assert_eq!(merged.get(2, "team_id"), &Value::from("BUF"));
        assert_eq!(merged.get(2, "pass_attempts"), &Value::Null);
        assert_eq!(merged.get(2, "record"), &Value::from("2-3"));
    }

    #[test]
    fn test_duplicate_keys_multiply() {
        let left = Dataset::from_rows(
            &["k", "a"],
            vec![vec!["x".into(), 1.into()], vec!["x".into(), 2.into()]],
        );
        let right = Dataset::from_rows(
            &["k", "b"],
            vec![vec!["x".into(), 10.into()], vec!["x".into(), 20.into()]],
        );
        let merged = reconcile(&left, &right, &["k"], &[]).unwrap();
        assert_eq!(merged.len(), 4);
    }

    #[test]
    fn test_missing_merge_key_is_error() {
        let left = Dataset::from_rows(&["k"], vec![vec!["x".into()]]);
        let right = Dataset::from_rows(&["other"], vec![vec!["x".into()]]);
        assert!(matches!(
            reconcile(&left, &right, &["k"], &[]),
            Err(EtlError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_period_type_from_one_extract() {
        let left = Dataset::from_rows(
            &["player_id", "week", "season_type", "pass_attempts"],
            vec![
                vec!["P1".into(), 1.into(), "REG".into(), 30.into()],
                vec!["P2".into(), 1.into(), Value::Null, 12.into()],
            ],
        );
        let right = Dataset::from_rows(
            &["player_id", "week", "solo_tackle"],
            vec![vec!["P3".into(), 1.into(), 4.into()]],
        );
        let policies = [("season_type", SharedPolicy::PeriodType)];

        let merged = reconcile(&left, &right, &["player_id", "week"], &policies).unwrap();
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.get(0, "season_type"), &Value::from(REGULAR_SEASON));
        assert_eq!(merged.get(1, "season_type"), &Value::from(UNKNOWN_PERIOD));
        assert_eq!(merged.get(2, "season_type"), &Value::from(UNKNOWN_PERIOD));

        let merged = reconcile(&right, &left, &["player_id", "week"], &policies).unwrap();
        assert_eq!(merged.get(0, "season_type"), &Value::from(UNKNOWN_PERIOD));
        assert_eq!(merged.get(1, "season_type"), &Value::from(REGULAR_SEASON));
    }
}
