//! The one post-processing pass every retrieval mode runs before handing rows
//! to a caller.
//!
//! Identifier columns enter as raw wire bytes and leave as canonical strings,
//! at every nesting depth. No retrieval mode decodes identifiers on its own.

use crate::codec;
use crate::errors::{AppError, AppResult};
use crate::schema::{ColumnDef, RelationDef, RelationKind, Schema, TableDef};
use crate::value::{Row, Value};

pub fn decode_rows(schema: &Schema, table: &TableDef, rows: Vec<Row>) -> AppResult<Vec<Row>> {
    rows.into_iter().map(|row| decode_row(schema, table, row)).collect()
}

pub fn decode_row(schema: &Schema, table: &TableDef, row: Row) -> AppResult<Row> {
    row.into_iter()
        .map(|(key, value)| {
            let value = if let Some(column) = table.column(&key) {
                decode_column(table, column, value)?
            } else if let Some(relation) = table.relation(&key) {
                decode_relation(schema, relation, value)?
            } else {
                value
            };
            Ok::<_, AppError>((key, value))
        })
        .collect()
}

fn decode_column(table: &TableDef, column: &ColumnDef, value: Value) -> AppResult<Value> {
    if !column.is_identifier() {
        return Ok(value);
    }

    match value {
        Value::Bytes(wire) => {
            tracing::trace!(table = table.name, column = column.key, hex = %hex::encode(&wire), "decoding identifier");
            Ok(Value::Text(codec::decode(&wire)?))
        }
        Value::Null => Ok(Value::Null),
        other => Err(AppError::internal(format!(
            "{}.{} expected wire bytes before decoding, found {}",
            table.name,
            column.key,
            other.type_name()
        ))),
    }
}

fn decode_relation(schema: &Schema, relation: &RelationDef, value: Value) -> AppResult<Value> {
    let target = schema.table(relation.target)?;

    match (relation.kind, value) {
        (RelationKind::Many, Value::Many(rows)) => Ok(Value::Many(decode_rows(schema, target, rows)?)),
        (RelationKind::Many, Value::Null) => Ok(Value::Many(Vec::new())),
        (RelationKind::One, Value::One(Some(row))) => Ok(Value::One(Some(Box::new(decode_row(schema, target, *row)?)))),
        (RelationKind::One, Value::One(None) | Value::Null) => Ok(Value::One(None)),
        (_, other) => Err(AppError::internal(format!(
            "relation {} holds {} instead of related rows",
            relation.name,
            other.type_name()
        ))),
    }
}
