use sqlx::SqlitePool;

use crate::db::uuid_sql::{quote_ident, wire_width_check};
use crate::errors::AppResult;
use crate::schema::{Schema, TableDef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Create missing tables, keep existing ones.
    Ensure,
    /// Drop every table first.
    Recreate,
}

pub async fn create_tables(pool: &SqlitePool, schema: &Schema, mode: Mode) -> AppResult<()> {
    if mode == Mode::Recreate {
        drop_tables(pool, schema).await?;
    }

    for table in schema.tables() {
        let ddl = create_table_sql(schema, table, mode == Mode::Ensure)?;
        tracing::debug!(table = table.name, sql = %ddl, "creating table");
        sqlx::query(&ddl).execute(pool).await?;
    }

    Ok(())
}

/// Drops in reverse declaration order so referencing tables go first.
pub async fn drop_tables(pool: &SqlitePool, schema: &Schema) -> AppResult<()> {
    for table in schema.tables().iter().rev() {
        let sql = format!("DROP TABLE IF EXISTS {}", quote_ident(table.name));
        sqlx::query(&sql).execute(pool).await?;
    }
    Ok(())
}

pub fn create_table_sql(schema: &Schema, table: &TableDef, if_not_exists: bool) -> AppResult<String> {
    let mut lines = Vec::new();
    let mut foreign_keys = Vec::new();

    for column in table.columns() {
        let mut line = format!("{} {}", quote_ident(column.name), column.kind.sql_type());
        if column.not_null {
            line.push_str(" NOT NULL");
        }
        if column.primary_key {
            line.push_str(" PRIMARY KEY");
        }
        if column.is_identifier() {
            line.push(' ');
            line.push_str(&wire_width_check(column.name));
        }
        lines.push(line);

        if let Some(fk) = &column.references {
            let target = schema.table(fk.table)?;
            let target_column = target.require_column(fk.column)?;
            foreign_keys.push(format!(
                "FOREIGN KEY ({}) REFERENCES {}({})",
                quote_ident(column.name),
                quote_ident(target.name),
                quote_ident(target_column.name)
            ));
        }
    }

    lines.extend(foreign_keys);

    Ok(format!(
        "CREATE TABLE {}{} (\n  {}\n)",
        if if_not_exists { "IF NOT EXISTS " } else { "" },
        quote_ident(table.name),
        lines.join(",\n  ")
    ))
}
