use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};
use crate::models::{canonical_field, integer_field, Child};
use crate::schema::{ColumnDef, RelationDef, TableDef};
use crate::value::{Row, Value};

pub const TABLE: &str = "parent";

pub fn table() -> TableDef {
    TableDef::new(TABLE)
        .with_column(ColumnDef::identifier("entityId", "entity_id").primary_key().default_random())
        .with_column(ColumnDef::integer("name", "name"))
        .with_relation(RelationDef::many("children", crate::models::child::TABLE, "entityId", "parentId"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parent {
    pub entity_id: String,
    pub name: Option<i64>,
    /// Empty unless the row was fetched with `children` embedded.
    #[serde(default)]
    pub children: Vec<Child>,
}

impl TryFrom<&Row> for Parent {
    type Error = AppError;

    fn try_from(row: &Row) -> AppResult<Self> {
        let children = match row.get("children") {
            Some(Value::Many(rows)) => rows.iter().map(Child::try_from).collect::<AppResult<Vec<_>>>()?,
            Some(other) => {
                return Err(AppError::internal(format!("children is {} instead of an array", other.type_name())))
            }
            None => Vec::new(),
        };

        Ok(Parent {
            entity_id: canonical_field(row, "entityId")?,
            name: integer_field(row, "name")?,
            children,
        })
    }
}
