//! Driver output to raw rows.
//!
//! Root rows carry identifier columns as blobs. Related rows are built by
//! SQLite as JSON, where identifiers travel as hex text. Both are folded back
//! into the same raw wire bytes here so the pipeline sees one input shape
//! whichever path produced the row.

use serde_json::{Map, Value as Json};
use sqlx::sqlite::SqliteRow;
use sqlx::Row as _;

use crate::errors::{AppError, AppResult};
use crate::schema::{ColumnDef, ColumnKind, RelationDef, RelationKind, Schema, TableDef};
use crate::value::{Row, Value};

/// Reads every column of `table` plus the relation columns named in
/// `relations` from a driver row, keyed by field name.
pub fn raw_row_from_sqlite(
    schema: &Schema,
    table: &TableDef,
    relations: &[&RelationDef],
    row: &SqliteRow,
) -> AppResult<Row> {
    let mut out = Row::new();

    for column in table.columns() {
        let value = match column.kind {
            ColumnKind::Identifier => {
                let v: Option<Vec<u8>> = row
                    .try_get(column.key)
                    .map_err(|e| AppError::internal(format!("missing {}: {}", column.key, e)))?;
                v.map(Value::Bytes).unwrap_or(Value::Null)
            }
            ColumnKind::Integer => {
                let v: Option<i64> = row
                    .try_get(column.key)
                    .map_err(|e| AppError::internal(format!("missing {}: {}", column.key, e)))?;
                v.into()
            }
            ColumnKind::Text => {
                let v: Option<String> = row
                    .try_get(column.key)
                    .map_err(|e| AppError::internal(format!("missing {}: {}", column.key, e)))?;
                v.into()
            }
        };
        out.insert(column.key, value);
    }

    for relation in relations {
        let doc: Option<String> = row
            .try_get(relation.name)
            .map_err(|e| AppError::internal(format!("missing {}: {}", relation.name, e)))?;
        let json = match doc {
            Some(doc) => serde_json::from_str(&doc)?,
            None => Json::Null,
        };
        out.insert(relation.name, raw_relation_from_json(schema, relation, &json)?);
    }

    Ok(out)
}

pub fn raw_relation_from_json(schema: &Schema, relation: &RelationDef, json: &Json) -> AppResult<Value> {
    let target = schema.table(relation.target)?;

    match (relation.kind, json) {
        (RelationKind::Many, Json::Null) => Ok(Value::Many(Vec::new())),
        (RelationKind::Many, Json::Array(items)) => {
            let rows = items
                .iter()
                .map(|item| match item {
                    Json::Object(map) => raw_row_from_json(schema, target, map),
                    other => Err(AppError::internal(format!("relation {} item is not an object: {}", relation.name, other))),
                })
                .collect::<AppResult<Vec<_>>>()?;
            Ok(Value::Many(rows))
        }
        (RelationKind::One, Json::Null) => Ok(Value::One(None)),
        (RelationKind::One, Json::Object(map)) => Ok(Value::One(Some(Box::new(raw_row_from_json(schema, target, map)?)))),
        (_, other) => Err(AppError::internal(format!("relation {} has unexpected shape: {}", relation.name, other))),
    }
}

/// Reads a related row from its JSON document. Keys the document carries for
/// relations of `table` are parsed recursively.
pub fn raw_row_from_json(schema: &Schema, table: &TableDef, map: &Map<String, Json>) -> AppResult<Row> {
    let mut out = Row::new();

    for column in table.columns() {
        let json = map.get(column.key).unwrap_or(&Json::Null);
        out.insert(column.key, column_from_json(table, column, json)?);
    }

    for relation in table.relations() {
        if let Some(json) = map.get(relation.name) {
            out.insert(relation.name, raw_relation_from_json(schema, relation, json)?);
        }
    }

    Ok(out)
}

fn column_from_json(table: &TableDef, column: &ColumnDef, json: &Json) -> AppResult<Value> {
    let unexpected = || {
        AppError::internal(format!(
            "{}.{} has unexpected value in related row: {}",
            table.name, column.key, json
        ))
    };

    match (column.kind, json) {
        (_, Json::Null) => Ok(Value::Null),
        (ColumnKind::Identifier, Json::String(digits)) => {
            let wire = hex::decode(digits).map_err(|_| unexpected())?;
            Ok(Value::Bytes(wire))
        }
        (ColumnKind::Integer, Json::Number(n)) => n.as_i64().map(Value::Integer).ok_or_else(unexpected),
        (ColumnKind::Text, Json::String(s)) => Ok(Value::Text(s.clone())),
        _ => Err(unexpected()),
    }
}
