//! Row-level create/read/update/delete over the warehouse, keyed by table
//! primary keys and speaking JSON objects with camelCase field names.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use rusqlite::{params_from_iter, Connection};
use serde_json::{Map, Value as Json};
use thiserror::Error;

use crate::dataset::Value;
use crate::error::StoreError;
use crate::schema::{get_table, Column, ColumnType, TableSchema, ALL_TABLES};
use crate::store::quote_ident;

#[derive(Error, Debug)]
pub enum CrudError {
    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("invalid field map: {0}")]
    FieldMap(String),

    #[error("{table}: unknown field '{field}'")]
    UnknownField { table: String, field: String },

    #[error("{table}: field '{field}' expects {expected}, got {got}")]
    WrongType {
        table: String,
        field: String,
        expected: &'static str,
        got: String,
    },

    #[error("{table}: primary key field '{field}' cannot be updated")]
    KeyUpdate { table: String, field: String },

    #[error("{table}: missing primary key field '{field}'")]
    MissingKey { table: String, field: String },

    #[error("{table}: expected {expected} key values, got {got}")]
    KeyArity {
        table: String,
        expected: usize,
        got: usize,
    },

    #[error("{table}: no row with key ({key})")]
    NotFound { table: String, key: String },

    #[error("expected a JSON object")]
    NotAnObject,

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<rusqlite::Error> for CrudError {
    fn from(e: rusqlite::Error) -> Self {
        CrudError::Store(StoreError::Sqlite(e))
    }
}

pub type CrudResult<T> = std::result::Result<T, CrudError>;

/// API field names of one table's columns
#[derive(Debug)]
pub struct FieldMap {
    pub table: &'static TableSchema,
    fields: Vec<(String, &'static Column)>,
}

impl FieldMap {
    fn build(table: &'static TableSchema) -> Result<Self, String> {
        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(table.columns.len());
        for col in table.columns {
            let api = col
                .api_field
                .map(str::to_string)
                .unwrap_or_else(|| to_camel_case(col.name));
            if !seen.insert(api.clone()) {
                return Err(format!("{}: field '{}' maps to more than one column", table.name, api));
            }
            fields.push((api, col));
        }
        Ok(Self { table, fields })
    }

    pub fn column(&self, field: &str) -> Option<&'static Column> {
        self.fields.iter().find(|(api, _)| api == field).map(|(_, col)| *col)
    }

    pub fn field(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(_, col)| col.name == column)
            .map(|(api, _)| api.as_str())
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(api, _)| api.as_str())
    }
}

static FIELD_MAPS: Lazy<Result<HashMap<&'static str, FieldMap>, String>> = Lazy::new(|| {
    ALL_TABLES
        .iter()
        .map(|table| FieldMap::build(*table).map(|map| (table.name, map)))
        .collect()
});

/// Build and check every table's field map
pub fn validate_field_maps() -> CrudResult<()> {
    FIELD_MAPS
        .as_ref()
        .map(|_| ())
        .map_err(|e| CrudError::FieldMap(e.clone()))
}

pub fn field_map(table: &str) -> CrudResult<&'static FieldMap> {
    let maps = FIELD_MAPS
        .as_ref()
        .map_err(|e| CrudError::FieldMap(e.clone()))?;
    maps.get(table)
        .ok_or_else(|| CrudError::UnknownTable(table.to_string()))
}

/// Convert snake_case to camelCase
fn to_camel_case(s: &str) -> String {
    let mut result = String::new();
    let mut capitalize_next = false;

    for c in s.chars() {
        if c == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            result.push(c.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }

    result
}

/// Every row of a table, ordered by primary key
pub fn fetch_all(conn: &Connection, table: &str) -> CrudResult<Vec<Map<String, Json>>> {
    let map = field_map(table)?;
    let schema = map.table;
    let sql = format!(
        "{} ORDER BY {}",
        select_sql(schema),
        quoted(schema.primary_key)
    );
    query_rows(conn, map, &sql, &[])
}

/// One row by its full primary key, given as text in key-column order
pub fn fetch_by_key(
    conn: &Connection,
    table: &str,
    key: &[String],
) -> CrudResult<Option<Map<String, Json>>> {
    let map = field_map(table)?;
    let key_values = parse_key(map.table, key)?;
    let sql = format!("{} WHERE {}", select_sql(map.table), key_predicate(map.table));
    Ok(query_rows(conn, map, &sql, &key_values)?.into_iter().next())
}

/// Insert one row from a JSON object; returns the stored row
pub fn insert_row(conn: &Connection, table: &str, input: &Json) -> CrudResult<Map<String, Json>> {
    let map = field_map(table)?;
    let schema = map.table;
    let values = parse_fields(map, input)?;

    let mut key = Vec::with_capacity(schema.primary_key.len());
    for pk in schema.primary_key {
        let value = values
            .iter()
            .find(|(col, _)| col.name == *pk)
            .map(|(_, v)| v)
            .filter(|v| v.is_present())
            .ok_or_else(|| CrudError::MissingKey {
                table: schema.name.to_string(),
                field: map.field(pk).unwrap_or(*pk).to_string(),
            })?;
        key.push(value.canonical().unwrap_or_default());
    }

    if fetch_by_key(conn, table, &key)?.is_some() {
        return Err(StoreError::DuplicateKey {
            table: schema.name.to_string(),
            key: key.join(", "),
        }
        .into());
    }

    let columns: Vec<&str> = values.iter().map(|(col, _)| col.name).collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(schema.name),
        quoted(&columns),
        placeholders
    );
    conn.execute(&sql, params_from_iter(values.iter().map(|(_, v)| v)))?;

    require_row(conn, table, &key)
}

/// Update the given fields of one row; key fields cannot change
pub fn update_row(
    conn: &Connection,
    table: &str,
    input: &Json,
    key: &[String],
) -> CrudResult<Map<String, Json>> {
    let map = field_map(table)?;
    let schema = map.table;
    let values = parse_fields(map, input)?;

    if let Some((col, _)) = values.iter().find(|(col, _)| schema.is_primary_key(col.name)) {
        return Err(CrudError::KeyUpdate {
            table: schema.name.to_string(),
            field: map.field(col.name).unwrap_or(col.name).to_string(),
        });
    }
    let key_values = parse_key(schema, key)?;
    if values.is_empty() {
        return require_row(conn, table, key);
    }

    let assignments: Vec<String> = values
        .iter()
        .map(|(col, _)| format!("{} = ?", quote_ident(col.name)))
        .collect();
    let sql = format!(
        "UPDATE {} SET {} WHERE {}",
        quote_ident(schema.name),
        assignments.join(", "),
        key_predicate(schema)
    );
    let params = values.iter().map(|(_, v)| v).chain(key_values.iter());
    let changed = conn.execute(&sql, params_from_iter(params))?;
    if changed == 0 {
        return Err(not_found(schema, key));
    }

    require_row(conn, table, key)
}

/// Delete one row by key; returns the row as it was
pub fn delete_row(conn: &Connection, table: &str, key: &[String]) -> CrudResult<Map<String, Json>> {
    let row = require_row(conn, table, key)?;
    let schema = field_map(table)?.table;
    let key_values = parse_key(schema, key)?;
    let sql = format!(
        "DELETE FROM {} WHERE {}",
        quote_ident(schema.name),
        key_predicate(schema)
    );
    conn.execute(&sql, params_from_iter(key_values.iter()))?;
    Ok(row)
}

fn require_row(conn: &Connection, table: &str, key: &[String]) -> CrudResult<Map<String, Json>> {
    match fetch_by_key(conn, table, key)? {
        Some(row) => Ok(row),
        None => {
            let schema =
                get_table(table).ok_or_else(|| CrudError::UnknownTable(table.to_string()))?;
            Err(not_found(schema, key))
        }
    }
}

fn not_found(schema: &TableSchema, key: &[String]) -> CrudError {
    CrudError::NotFound {
        table: schema.name.to_string(),
        key: key.join(", "),
    }
}

fn select_sql(schema: &TableSchema) -> String {
    format!(
        "SELECT {} FROM {}",
        quoted(&schema.column_names()),
        quote_ident(schema.name)
    )
}

fn key_predicate(schema: &TableSchema) -> String {
    schema
        .primary_key
        .iter()
        .map(|pk| format!("{} = ?", quote_ident(pk)))
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn quoted(names: &[&str]) -> String {
    names.iter().map(|n| quote_ident(n)).collect::<Vec<_>>().join(", ")
}

fn query_rows(
    conn: &Connection,
    map: &FieldMap,
    sql: &str,
    params: &[Value],
) -> CrudResult<Vec<Map<String, Json>>> {
    let columns = map.table.column_names();
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(params.iter()))?;

    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut object = Map::new();
        for (idx, name) in columns.iter().enumerate() {
            let raw: rusqlite::types::Value = row.get(idx)?;
            let field = map.field(name).unwrap_or(*name).to_string();
            object.insert(field, to_json(Value::from(raw)));
        }
        out.push(object);
    }
    Ok(out)
}

fn to_json(value: Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Integer(i) => Json::from(i),
        Value::Real(f) => serde_json::Number::from_f64(f)
            .map(Json::Number)
            .unwrap_or(Json::Null),
        Value::Text(s) => Json::String(s),
    }
}

/// Key values typed by their columns
fn parse_key(schema: &TableSchema, key: &[String]) -> CrudResult<Vec<Value>> {
    if key.len() != schema.primary_key.len() {
        return Err(CrudError::KeyArity {
            table: schema.name.to_string(),
            expected: schema.primary_key.len(),
            got: key.len(),
        });
    }

    schema
        .primary_key
        .iter()
        .zip(key)
        .map(|(pk, raw)| {
            let col_type = schema
                .column(pk)
                .map(|c| c.col_type)
                .unwrap_or(ColumnType::Text);
            match col_type {
                ColumnType::Integer => raw.trim().parse::<i64>().map(Value::Integer).map_err(|_| {
                    CrudError::WrongType {
                        table: schema.name.to_string(),
                        field: pk.to_string(),
                        expected: "integer",
                        got: raw.clone(),
                    }
                }),
                ColumnType::Real => raw.trim().parse::<f64>().map(Value::Real).map_err(|_| {
                    CrudError::WrongType {
                        table: schema.name.to_string(),
                        field: pk.to_string(),
                        expected: "number",
                        got: raw.clone(),
                    }
                }),
                ColumnType::Text => Ok(Value::Text(raw.clone())),
            }
        })
        .collect()
}

/// Columns and typed values named by a JSON object, in input order
fn parse_fields(map: &FieldMap, input: &Json) -> CrudResult<Vec<(&'static Column, Value)>> {
    let object = input.as_object().ok_or(CrudError::NotAnObject)?;
    let table = map.table.name;

    object
        .iter()
        .map(|(field, json)| {
            let col = map.column(field).ok_or_else(|| CrudError::UnknownField {
                table: table.to_string(),
                field: field.clone(),
            })?;
            let wrong_type = |expected: &'static str| CrudError::WrongType {
                table: table.to_string(),
                field: field.clone(),
                expected,
                got: json.to_string(),
            };

            let value = match (col.col_type, json) {
                (_, Json::Null) => Value::Null,
                (ColumnType::Integer, Json::Number(n)) => {
                    Value::Integer(n.as_i64().ok_or_else(|| wrong_type("integer"))?)
                }
                (ColumnType::Integer, _) => return Err(wrong_type("integer")),
                (ColumnType::Real, Json::Number(n)) => {
                    Value::Real(n.as_f64().ok_or_else(|| wrong_type("number"))?)
                }
                (ColumnType::Real, _) => return Err(wrong_type("number")),
                (ColumnType::Text, Json::String(s)) => Value::Text(s.clone()),
                (ColumnType::Text, _) => return Err(wrong_type("string")),
            };
            Ok((col, value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use serde_json::json;

    fn store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_tables(ALL_TABLES).unwrap();
        store
    }

    fn key(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_to_camel_case() {
        assert_eq!(to_camel_case("team_id"), "teamId");
        assert_eq!(to_camel_case("fantasy_points_ppr"), "fantasyPointsPpr");
        assert_eq!(to_camel_case("season"), "season");
    }

    #[test]
    fn test_field_maps_validate() {
        validate_field_maps().unwrap();
        let map = field_map("dim_players").unwrap();
        assert_eq!(map.field("offense_defense_flag"), Some("side"));
        assert_eq!(map.column("playerName").map(|c| c.name), Some("player_name"));
        assert!(map.fields().any(|f| f == "draftOvr"));
        assert!(matches!(field_map("nope"), Err(CrudError::UnknownTable(_))));
    }

    #[test]
    fn test_insert_fetch_update_delete() {
        let store = store();
        let conn = store.connection();

        let row = insert_row(conn, "dim_teams", &json!({"teamId": "NE", "teamName": "Patriots"}))
            .unwrap();
        assert_eq!(row["teamName"], json!("Patriots"));
        assert_eq!(row["city"], Json::Null);

        let updated =
            update_row(conn, "dim_teams", &json!({"city": "Foxborough"}), &key(&["NE"])).unwrap();
        assert_eq!(updated["city"], json!("Foxborough"));

        assert_eq!(fetch_all(conn, "dim_teams").unwrap().len(), 1);

        let deleted = delete_row(conn, "dim_teams", &key(&["NE"])).unwrap();
        assert_eq!(deleted["teamId"], json!("NE"));
        assert!(fetch_by_key(conn, "dim_teams", &key(&["NE"])).unwrap().is_none());
    }

    #[test]
    fn test_rejections() {
        let store = store();
        let conn = store.connection();
        insert_row(conn, "dim_teams", &json!({"teamId": "NE"})).unwrap();

        let dup = insert_row(conn, "dim_teams", &json!({"teamId": "NE"})).unwrap_err();
        assert!(matches!(dup, CrudError::Store(StoreError::DuplicateKey { .. })));

        let unknown =
            insert_row(conn, "dim_teams", &json!({"teamId": "KC", "mascot": "x"})).unwrap_err();
        assert!(matches!(unknown, CrudError::UnknownField { .. }));

        let wrong = insert_row(
            conn,
            "dim_players",
            &json!({"playerId": "p1", "birthYear": "1990"}),
        )
        .unwrap_err();
        assert!(matches!(wrong, CrudError::WrongType { .. }));

        let key_change =
            update_row(conn, "dim_teams", &json!({"teamId": "KC"}), &key(&["NE"])).unwrap_err();
        assert!(matches!(key_change, CrudError::KeyUpdate { .. }));

        let missing =
            update_row(conn, "dim_teams", &json!({"city": "x"}), &key(&["ZZ"])).unwrap_err();
        assert!(matches!(missing, CrudError::NotFound { .. }));

        let arity = fetch_by_key(conn, "team_yearly_stats", &key(&["NE"])).unwrap_err();
        assert!(matches!(arity, CrudError::KeyArity { expected: 3, got: 1, .. }));
    }

    #[test]
    fn test_fact_row_key_types() {
        let store = store();
        let conn = store.connection();
        conn.execute_batch("PRAGMA foreign_keys = OFF;").unwrap();
        insert_row(
            conn,
            "team_yearly_stats",
            &json!({"teamId": "NE", "season": 2023, "seasonType": "Reg", "winPct": 0.25}),
        )
        .unwrap();

        let row = fetch_by_key(conn, "team_yearly_stats", &key(&["NE", "2023", "Reg"]))
            .unwrap()
            .unwrap();
        assert_eq!(row["winPct"], json!(0.25));

        let bad = fetch_by_key(conn, "team_yearly_stats", &key(&["NE", "twenty", "Reg"]))
            .unwrap_err();
        assert!(matches!(bad, CrudError::WrongType { .. }));
    }
}
