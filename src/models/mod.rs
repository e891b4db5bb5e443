//! The two demonstration tables: `parent` and `child`, linked by identifier
//! columns stored as 16-byte blobs.

use crate::errors::{AppError, AppResult};
use crate::schema::Schema;
use crate::value::{Row, Value};

pub mod child;
pub mod parent;

pub use child::Child;
pub use parent::Parent;

pub fn schema() -> AppResult<Schema> {
    Schema::new(vec![parent::table(), child::table()])
}

fn canonical_field(row: &Row, key: &str) -> AppResult<String> {
    match row.get(key) {
        Some(Value::Text(s)) => Ok(s.clone()),
        Some(other) => Err(AppError::internal(format!(
            "{} is {} instead of a canonical identifier",
            key,
            other.type_name()
        ))),
        None => Err(AppError::internal(format!("missing {}", key))),
    }
}

fn integer_field(row: &Row, key: &str) -> AppResult<Option<i64>> {
    match row.get(key) {
        Some(Value::Integer(i)) => Ok(Some(*i)),
        Some(Value::Null) | None => Ok(None),
        Some(other) => Err(AppError::internal(format!("{} is {} instead of a number", key, other.type_name()))),
    }
}
