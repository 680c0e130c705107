use super::tables::{get_table, ALL_TABLES};
use super::types::TableSchema;
use std::collections::{HashSet, VecDeque};

/// Requested tables plus every dimension they reference, in load order
pub fn resolve_includes(requested: &[&str]) -> Result<Vec<&'static TableSchema>, String> {
    let mut included: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = requested.iter().copied().collect();

    while let Some(name) = queue.pop_front() {
        if included.contains(name) {
            continue;
        }
        let table = get_table(name).ok_or_else(|| format!("Unknown table: {}", name))?;
        included.insert(table.name);
        queue.extend(table.dependencies());
    }

    Ok(in_load_order(&included))
}

/// Every table except `excluded`, in load order.
///
/// Children of an excluded dimension are kept: their foreign keys are
/// checked against whatever the dimension already holds.
pub fn resolve_excludes(excluded: &[&str]) -> Result<Vec<&'static TableSchema>, String> {
    for name in excluded {
        if get_table(name).is_none() {
            return Err(format!("Unknown table: {}", name));
        }
    }

    let included: HashSet<&str> = ALL_TABLES
        .iter()
        .map(|t| t.name)
        .filter(|name| !excluded.contains(name))
        .collect();

    Ok(in_load_order(&included))
}

/// `ALL_TABLES` is declared parents first, so filtering it keeps that order
fn in_load_order(included: &HashSet<&str>) -> Vec<&'static TableSchema> {
    ALL_TABLES
        .iter()
        .copied()
        .filter(|table| included.contains(table.name))
        .collect()
}
