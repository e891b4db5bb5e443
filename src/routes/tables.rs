use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value as JsonValue;

use crate::app::AppState;
use crate::errors::{AppError, AppResult};
use crate::query::relational::merge_withs;
use crate::query::{self, Filter, RelationalQuery, With};
use crate::schema::{ColumnDef, ColumnKind, TableDef};
use crate::value::{Row, Value};

type Params = Vec<(String, String)>;

pub async fn select_rows(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(params): Query<Params>,
) -> AppResult<Json<Vec<Row>>> {
    let def = state.schema.table(&table)?;
    let (filters, with) = parse_params(def, params)?;
    if !with.is_empty() {
        return Err(AppError::bad_request("flat select does not embed relations; use /first or /many"));
    }

    let rows = query::select(&state.pool, &state.schema, &table, &filters).await?;
    Ok(Json(rows))
}

pub async fn find_first(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(params): Query<Params>,
) -> AppResult<Json<Row>> {
    let relational = relational_query(&state, &table, params)?;
    let row = query::find_first(&state.pool, &state.schema, &relational)
        .await?
        .ok_or_else(|| AppError::not_found(format!("no {} row matches", table)))?;
    Ok(Json(row))
}

pub async fn find_many(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(params): Query<Params>,
) -> AppResult<Json<Vec<Row>>> {
    let relational = relational_query(&state, &table, params)?;
    let rows = query::find_many(&state.pool, &state.schema, &relational).await?;
    Ok(Json(rows))
}

pub async fn insert_rows(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Json(body): Json<JsonValue>,
) -> AppResult<(StatusCode, Json<Vec<Row>>)> {
    let def = state.schema.table(&table)?;
    let objects = match body {
        JsonValue::Array(items) => items,
        object @ JsonValue::Object(_) => vec![object],
        _ => return Err(AppError::bad_request("expected a JSON object or an array of objects")),
    };

    let rows = objects
        .iter()
        .map(|object| row_from_json(def, object))
        .collect::<AppResult<Vec<_>>>()?;
    let inserted = query::insert(&state.pool, &state.schema, &table, rows).await?;

    Ok((StatusCode::CREATED, Json(inserted)))
}

fn relational_query(state: &AppState, table: &str, params: Params) -> AppResult<RelationalQuery> {
    let def = state.schema.table(table)?;
    let (filters, with) = parse_params(def, params)?;

    let mut relational = RelationalQuery::new(table);
    relational.filters = filters;
    relational.with = with;
    Ok(relational)
}

/// Splits the query string into equality filters and `with` embeddings.
/// `with` takes comma-separated dotted paths and may repeat.
fn parse_params(table: &TableDef, params: Params) -> AppResult<(Vec<Filter>, Vec<With>)> {
    let mut filters = Vec::new();
    let mut with = Vec::new();

    for (key, raw) in params {
        if key == "with" {
            for path in raw.split(',').filter(|p| !p.trim().is_empty()) {
                let w = With::from_path(path).ok_or_else(|| AppError::bad_request(format!("invalid relation path {}", path)))?;
                with.push(w);
            }
            continue;
        }

        let column = table.require_column(&key)?;
        filters.push(Filter::eq(key.as_str(), value_from_param(column, &raw)?));
    }

    Ok((filters, merge_withs(with)))
}

fn value_from_param(column: &ColumnDef, raw: &str) -> AppResult<Value> {
    match column.kind {
        ColumnKind::Identifier | ColumnKind::Text => Ok(Value::text(raw)),
        ColumnKind::Integer => raw
            .trim()
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| AppError::bad_request(format!("{} must be an integer", column.key))),
    }
}

fn row_from_json(table: &TableDef, json: &JsonValue) -> AppResult<Row> {
    let object = json
        .as_object()
        .ok_or_else(|| AppError::bad_request("each row must be a JSON object"))?;

    let mut row = Row::new();
    for (key, value) in object {
        let column = table.require_column(key)?;
        let value = match (column.kind, value) {
            (_, JsonValue::Null) => Value::Null,
            (ColumnKind::Identifier | ColumnKind::Text, JsonValue::String(s)) => Value::text(s.as_str()),
            (ColumnKind::Integer, JsonValue::Number(n)) => n
                .as_i64()
                .map(Value::Integer)
                .ok_or_else(|| AppError::bad_request(format!("{} must be an integer", key)))?,
            _ => return Err(AppError::bad_request(format!("{} has the wrong type for {:?}", key, column.kind))),
        };
        row.insert(key.as_str(), value);
    }
    Ok(row)
}
