//! Side-by-side run of both retrieval modes over the same stored rows.
//!
//! A parent with two children is stored, then the children are read once by a
//! flat select and once embedded under their parent. Every identifier column
//! the two results share must come back with the same value and type.

use serde::Serialize;
use sqlx::SqlitePool;

use crate::db::provision::{self, Mode};
use crate::errors::AppResult;
use crate::models::{child, parent};
use crate::query::{self, Filter, RelationalQuery, With};
use crate::schema::Schema;
use crate::value::{Row, Value};

pub const PARENT_ID: &str = "550e8400-e29b-41d4-a716-446655440000";
pub const CHILD_IDS: [&str; 2] = ["550e8400-e29b-41d4-a716-446655440001", "550e8400-e29b-41d4-a716-446655440002"];
pub const PARENT_NAME: i64 = 1;
pub const CHILD_NAMES: [i64; 2] = [10, 20];

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub select_result: Vec<Row>,
    pub relational_result: Option<Row>,
}

/// A child column whose value or type differs between the two paths.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Divergence {
    pub child: String,
    pub column: &'static str,
    pub select: String,
    pub relational: String,
}

pub async fn seed(pool: &SqlitePool, schema: &Schema) -> AppResult<()> {
    query::insert(
        pool,
        schema,
        parent::TABLE,
        vec![Row::new().with("entityId", PARENT_ID).with("name", PARENT_NAME)],
    )
    .await?;

    let children = CHILD_IDS
        .iter()
        .zip(CHILD_NAMES)
        .map(|(id, name)| Row::new().with("entityId", *id).with("parentId", PARENT_ID).with("name", name))
        .collect();
    query::insert(pool, schema, child::TABLE, children).await?;

    Ok(())
}

/// Recreates the tables, seeds them and runs both retrieval modes.
pub async fn run(pool: &SqlitePool, schema: &Schema) -> AppResult<Report> {
    provision::create_tables(pool, schema, Mode::Recreate).await?;
    seed(pool, schema).await?;

    let select_result = query::select(pool, schema, child::TABLE, &[Filter::eq("parentId", PARENT_ID)]).await?;

    let relational = RelationalQuery::new(parent::TABLE)
        .filter(Filter::eq("entityId", PARENT_ID))
        .with(With::new("children"));
    let relational_result = query::find_first(pool, schema, &relational).await?;

    Ok(Report { select_result, relational_result })
}

impl Report {
    pub fn embedded_children(&self) -> &[Row] {
        self.relational_result
            .as_ref()
            .and_then(|row| row.get("children"))
            .and_then(Value::as_rows)
            .unwrap_or(&[])
    }

    /// Compares every child identifier column present in both results.
    ///
    /// Children are matched by position after sorting on the rendered
    /// `entityId`, so a path that leaves bytes in place still lines up with
    /// its counterpart.
    pub fn divergences(&self) -> Vec<Divergence> {
        let mut flat: Vec<&Row> = self.select_result.iter().collect();
        let mut nested: Vec<&Row> = self.embedded_children().iter().collect();
        flat.sort_by_key(|row| describe(row.get("entityId")));
        nested.sort_by_key(|row| describe(row.get("entityId")));

        let mut out = Vec::new();
        if flat.len() != nested.len() {
            out.push(Divergence {
                child: "*".to_string(),
                column: "count",
                select: flat.len().to_string(),
                relational: nested.len().to_string(),
            });
        }

        for (a, b) in flat.iter().zip(nested.iter()) {
            for column in ["entityId", "parentId"] {
                let (x, y) = (a.get(column), b.get(column));
                if x != y || type_of(x) != type_of(y) {
                    out.push(Divergence {
                        child: describe(a.get("entityId")),
                        column,
                        select: describe(x),
                        relational: describe(y),
                    });
                }
            }
        }
        out
    }

    pub fn is_consistent(&self) -> bool {
        self.divergences().is_empty()
    }

    pub fn render(&self) -> AppResult<String> {
        let mut lines = vec![
            "=== Test 1: flat select ===".to_string(),
            format!("Result: {}", serde_json::to_string_pretty(&self.select_result)?),
        ];
        if let Some(first) = self.select_result.first() {
            let id = first.get("entityId");
            lines.push(format!("entityId type: {} {}", type_of(id), describe(id)));
        }

        lines.push(String::new());
        lines.push("=== Test 2: relational query with children ===".to_string());
        lines.push(format!("Result: {}", serde_json::to_string_pretty(&self.relational_result)?));
        if let Some(first) = self.embedded_children().first() {
            let id = first.get("entityId");
            lines.push(format!("child entityId type: {} {}", type_of(id), describe(id)));
        }

        lines.push(String::new());
        let divergences = self.divergences();
        if divergences.is_empty() {
            lines.push("consistent: both paths agree on every identifier".to_string());
        } else {
            lines.push("inconsistent:".to_string());
            lines.extend(
                divergences
                    .iter()
                    .map(|d| format!("  {} {}: select={} relational={}", d.child, d.column, d.select, d.relational)),
            );
        }

        let mut out = lines.join("\n");
        out.push('\n');
        Ok(out)
    }
}

fn type_of(value: Option<&Value>) -> &'static str {
    value.map(Value::type_name).unwrap_or("missing")
}

fn describe(value: Option<&Value>) -> String {
    match value {
        Some(Value::Text(s)) => s.clone(),
        Some(Value::Bytes(b)) => format!("<{} bytes {}>", b.len(), hex::encode(b)),
        Some(Value::Integer(i)) => i.to_string(),
        Some(other) => other.type_name().to_string(),
        None => "missing".to_string(),
    }
}
