use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::Sqlite;

use crate::codec;
use crate::errors::{AppError, AppResult};
use crate::schema::{ColumnDef, ColumnKind};
use crate::value::Value;

/// A bind parameter in storage form.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Blob(Option<Vec<u8>>),
    Int(Option<i64>),
    Text(Option<String>),
}

/// Converts an application value into its storage form for `column`.
///
/// Identifier columns take a canonical string, which is encoded to wire bytes.
/// Already-encoded 16-byte values pass through.
pub fn param_for(column: &ColumnDef, value: &Value) -> AppResult<Param> {
    let mismatch = || {
        AppError::bad_request(format!(
            "column {} expects {:?}, got {}",
            column.key,
            column.kind,
            value.type_name()
        ))
    };

    match (column.kind, value) {
        (ColumnKind::Identifier, Value::Null) => Ok(Param::Blob(None)),
        (ColumnKind::Identifier, Value::Text(canonical)) => Ok(Param::Blob(Some(codec::encode(canonical)?.to_vec()))),
        (ColumnKind::Identifier, Value::Bytes(wire)) => {
            if wire.len() != codec::WIRE_LEN {
                return Err(codec::CodecError::MalformedWireValue { len: wire.len() }.into());
            }
            Ok(Param::Blob(Some(wire.clone())))
        }
        (ColumnKind::Integer, Value::Null) => Ok(Param::Int(None)),
        (ColumnKind::Integer, Value::Integer(i)) => Ok(Param::Int(Some(*i))),
        (ColumnKind::Text, Value::Null) => Ok(Param::Text(None)),
        (ColumnKind::Text, Value::Text(s)) => Ok(Param::Text(Some(s.clone()))),
        _ => Err(mismatch()),
    }
}

pub fn bind_params<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: Vec<Param>,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            Param::Blob(v) => query.bind(v),
            Param::Int(v) => query.bind(v),
            Param::Text(v) => query.bind(v),
        };
    }
    query
}
