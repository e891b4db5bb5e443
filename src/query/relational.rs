use sqlx::SqlitePool;

use crate::db::params::{bind_params, Param};
use crate::db::row_parsers::raw_row_from_sqlite;
use crate::db::uuid_sql::{column_ref, hex_expr, quote_ident};
use crate::errors::AppResult;
use crate::pipeline;
use crate::query::{select_list, where_clause, Filter};
use crate::schema::{RelationDef, RelationKind, Schema, TableDef};
use crate::value::Row;

/// A related set of rows to embed under the relation's name.
#[derive(Debug, Clone, PartialEq)]
pub struct With {
    pub relation: String,
    pub filters: Vec<Filter>,
    pub with: Vec<With>,
}

impl With {
    pub fn new(relation: impl Into<String>) -> Self {
        Self { relation: relation.into(), filters: Vec::new(), with: Vec::new() }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with(mut self, nested: With) -> Self {
        self.with.push(nested);
        self
    }

    /// Parses a dotted path such as `children.toys` into nested embeddings.
    pub fn from_path(path: &str) -> Option<Self> {
        let mut parts = path.split('.').map(str::trim).rev();
        let leaf = parts.next().filter(|p| !p.is_empty())?;
        let mut node = With::new(leaf);
        for part in parts {
            if part.is_empty() {
                return None;
            }
            node = With::new(part).with(node);
        }
        Some(node)
    }
}

/// Merges embeddings that share a relation so `a.b` and `a.c` become one `a`.
pub fn merge_withs(withs: Vec<With>) -> Vec<With> {
    let mut merged: Vec<With> = Vec::new();
    for w in withs {
        match merged.iter_mut().find(|m| m.relation == w.relation) {
            Some(existing) => {
                existing.filters.extend(w.filters);
                let nested = std::mem::take(&mut existing.with);
                existing.with = merge_withs(nested.into_iter().chain(w.with).collect());
            }
            None => merged.push(w),
        }
    }
    merged
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationalQuery {
    pub table: String,
    pub filters: Vec<Filter>,
    pub with: Vec<With>,
    pub limit: Option<u32>,
}

impl RelationalQuery {
    pub fn new(table: impl Into<String>) -> Self {
        Self { table: table.into(), filters: Vec::new(), with: Vec::new(), limit: None }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with(mut self, with: With) -> Self {
        self.with.push(with);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

pub async fn find_many(pool: &SqlitePool, schema: &Schema, query: &RelationalQuery) -> AppResult<Vec<Row>> {
    let table = schema.table(&query.table)?;
    let relations = query
        .with
        .iter()
        .map(|w| table.require_relation(&w.relation))
        .collect::<AppResult<Vec<_>>>()?;

    let (sql, params) = root_sql(schema, table, query)?;
    tracing::debug!(table = table.name, sql = %sql, "relational fetch");

    let rows = bind_params(sqlx::query(&sql), params).fetch_all(pool).await?;
    let raw = rows
        .iter()
        .map(|row| raw_row_from_sqlite(schema, table, &relations, row))
        .collect::<AppResult<Vec<_>>>()?;
    tracing::debug!(table = table.name, rows = raw.len(), "relational fetch fetched");

    pipeline::decode_rows(schema, table, raw)
}

pub async fn find_first(pool: &SqlitePool, schema: &Schema, query: &RelationalQuery) -> AppResult<Option<Row>> {
    let query = query.clone().limit(1);
    Ok(find_many(pool, schema, &query).await?.into_iter().next())
}

fn root_sql(schema: &Schema, table: &TableDef, query: &RelationalQuery) -> AppResult<(String, Vec<Param>)> {
    let mut params = Vec::new();
    let mut items = select_list(table, "t0");

    for w in &query.with {
        let relation = table.require_relation(&w.relation)?;
        let sub = relation_sql(schema, table, relation, w, 1, &mut params)?;
        items.push(format!("({}) AS {}", sub, quote_ident(relation.name)));
    }

    let (terms, filter_params) = where_clause(table, "t0", &query.filters)?;
    params.extend(filter_params);

    let mut sql = format!("SELECT {} FROM {} AS t0", items.join(", "), quote_ident(table.name));
    if !terms.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&terms.join(" AND "));
    }
    if let Some(limit) = query.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    Ok((sql, params))
}

/// Correlated subquery producing the JSON document for one relation.
///
/// `params` receives bind values in the order their placeholders appear.
fn relation_sql(
    schema: &Schema,
    source: &TableDef,
    relation: &RelationDef,
    with: &With,
    depth: usize,
    params: &mut Vec<Param>,
) -> AppResult<String> {
    let target = schema.table(relation.target)?;
    let alias = format!("t{}", depth);
    let parent_alias = format!("t{}", depth - 1);

    let mut fields = Vec::new();
    for column in target.columns() {
        let expr = column_ref(&alias, column.name);
        let expr = if column.is_identifier() { hex_expr(&expr) } else { expr };
        fields.push(format!("'{}', {}", column.key, expr));
    }
    for nested in &with.with {
        let nested_relation = target.require_relation(&nested.relation)?;
        let sub = relation_sql(schema, target, nested_relation, nested, depth + 1, params)?;
        fields.push(format!("'{}', json(({}))", nested_relation.name, sub));
    }
    let object = format!("json_object({})", fields.join(", "));

    let local = source.require_column(relation.local)?;
    let foreign = target.require_column(relation.foreign)?;
    let mut terms = vec![format!(
        "{} = {}",
        column_ref(&alias, foreign.name),
        column_ref(&parent_alias, local.name)
    )];
    let (filter_terms, filter_params) = where_clause(target, &alias, &with.filters)?;
    terms.extend(filter_terms);
    params.extend(filter_params);

    let sql = match relation.kind {
        RelationKind::Many => format!(
            "SELECT coalesce(json_group_array({}), '[]') FROM {} AS {} WHERE {}",
            object,
            quote_ident(target.name),
            alias,
            terms.join(" AND ")
        ),
        RelationKind::One => format!(
            "SELECT {} FROM {} AS {} WHERE {} LIMIT 1",
            object,
            quote_ident(target.name),
            alias,
            terms.join(" AND ")
        ),
    };

    Ok(sql)
}
