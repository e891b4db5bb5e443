//! Retrieval and insertion over described tables.
//!
//! Both retrieval modes, [`select`] and the relational fetches in
//! [`relational`], finish through [`crate::pipeline`].

use sqlx::SqlitePool;

use crate::codec;
use crate::db::params::{bind_params, param_for, Param};
use crate::db::row_parsers::raw_row_from_sqlite;
use crate::db::uuid_sql::{column_ref, quote_ident};
use crate::errors::{AppError, AppResult};
use crate::pipeline;
use crate::schema::{ColumnKind, Schema, TableDef};
use crate::value::{Row, Value};

pub mod relational;

pub use relational::{find_first, find_many, RelationalQuery, With};

/// Equality predicate over a described column, keyed by field name.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { column: column.into(), value: value.into() }
    }
}

/// Renders `alias.col = ? AND ...` and the matching parameters.
pub(crate) fn where_clause(table: &TableDef, alias: &str, filters: &[Filter]) -> AppResult<(Vec<String>, Vec<Param>)> {
    let mut terms = Vec::with_capacity(filters.len());
    let mut params = Vec::with_capacity(filters.len());
    for filter in filters {
        let column = table.require_column(&filter.column)?;
        terms.push(format!("{} = ?", column_ref(alias, column.name)));
        params.push(param_for(column, &filter.value)?);
    }
    Ok((terms, params))
}

pub(crate) fn select_list(table: &TableDef, alias: &str) -> Vec<String> {
    table
        .columns()
        .iter()
        .map(|c| format!("{} AS {}", column_ref(alias, c.name), quote_ident(c.key)))
        .collect()
}

/// Flat filter-and-fetch over one table.
pub async fn select(pool: &SqlitePool, schema: &Schema, table: &str, filters: &[Filter]) -> AppResult<Vec<Row>> {
    let table = schema.table(table)?;
    let (terms, params) = where_clause(table, "t0", filters)?;

    let mut sql = format!("SELECT {} FROM {} AS t0", select_list(table, "t0").join(", "), quote_ident(table.name));
    if !terms.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&terms.join(" AND "));
    }

    tracing::debug!(table = table.name, sql = %sql, "flat select");
    let rows = bind_params(sqlx::query(&sql), params).fetch_all(pool).await?;

    let raw = rows
        .iter()
        .map(|row| raw_row_from_sqlite(schema, table, &[], row))
        .collect::<AppResult<Vec<_>>>()?;
    tracing::debug!(table = table.name, rows = raw.len(), "flat select fetched");

    pipeline::decode_rows(schema, table, raw)
}

/// Inserts rows in one transaction and returns them in application form.
///
/// Omitted identifier columns marked `default_random` receive a fresh
/// identifier. Identifier values come back normalized to lowercase canonical
/// form.
pub async fn insert(pool: &SqlitePool, schema: &Schema, table: &str, rows: Vec<Row>) -> AppResult<Vec<Row>> {
    let table = schema.table(table)?;

    let columns = table.columns();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table.name),
        columns.iter().map(|c| quote_ident(c.name)).collect::<Vec<_>>().join(", "),
        vec!["?"; columns.len()].join(", ")
    );

    let mut prepared = Vec::with_capacity(rows.len());
    for row in rows {
        prepared.push(prepare_insert(table, row)?);
    }

    let mut tx = pool.begin().await?;
    for (_, params) in &prepared {
        bind_params(sqlx::query(&sql), params.clone()).execute(&mut *tx).await?;
    }
    tx.commit().await?;

    tracing::debug!(table = table.name, rows = prepared.len(), "inserted rows");
    Ok(prepared.into_iter().map(|(row, _)| row).collect())
}

fn prepare_insert(table: &TableDef, mut row: Row) -> AppResult<(Row, Vec<Param>)> {
    if let Some(unknown) = row.keys().find(|k| table.column(k).is_none()) {
        return Err(AppError::bad_request(format!("unknown column {}.{}", table.name, unknown)));
    }

    let mut out = Row::new();
    let mut params = Vec::with_capacity(table.columns().len());
    for column in table.columns() {
        let value = match row.remove(column.key) {
            Some(v) if !v.is_null() => v,
            _ if column.default_random => Value::Text(codec::generate()),
            _ if column.not_null => {
                return Err(AppError::bad_request(format!("{}.{} is required", table.name, column.key)))
            }
            _ => Value::Null,
        };

        params.push(param_for(column, &value)?);
        let value = match (column.kind, value) {
            (ColumnKind::Identifier, Value::Text(s)) => Value::Text(codec::normalize(&s)?),
            (ColumnKind::Identifier, Value::Bytes(wire)) => Value::Text(codec::decode(&wire)?),
            (_, v) => v,
        };
        out.insert(column.key, value);
    }

    Ok((out, params))
}
