use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};
use crate::models::{canonical_field, integer_field};
use crate::schema::{ColumnDef, RelationDef, TableDef};
use crate::value::Row;

pub const TABLE: &str = "child";

pub fn table() -> TableDef {
    TableDef::new(TABLE)
        .with_column(ColumnDef::identifier("entityId", "entity_id").primary_key().default_random())
        .with_column(
            ColumnDef::identifier("parentId", "parent_id")
                .not_null()
                .references(crate::models::parent::TABLE, "entityId"),
        )
        .with_column(ColumnDef::integer("name", "name"))
        .with_relation(RelationDef::one("parent", crate::models::parent::TABLE, "parentId", "entityId"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Child {
    pub entity_id: String,
    pub parent_id: String,
    pub name: Option<i64>,
}

impl TryFrom<&Row> for Child {
    type Error = AppError;

    fn try_from(row: &Row) -> AppResult<Self> {
        Ok(Child {
            entity_id: canonical_field(row, "entityId")?,
            parent_id: canonical_field(row, "parentId")?,
            name: integer_field(row, "name")?,
        })
    }
}
