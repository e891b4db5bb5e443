//! Declarative table, column and relation descriptors.
//!
//! Descriptors are built once, validated by [`Schema::new`], and read-only
//! afterwards. The pipeline and the storage adapter both consult them to know
//! which columns carry identifiers and how tables relate.

use std::collections::HashSet;

use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// 16-byte binary in storage, canonical string in results.
    Identifier,
    Integer,
    Text,
}

impl ColumnKind {
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnKind::Identifier => "BLOB",
            ColumnKind::Integer => "INTEGER",
            ColumnKind::Text => "TEXT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: &'static str,
    pub column: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    /// Field name in result rows.
    pub key: &'static str,
    /// Column name in storage.
    pub name: &'static str,
    pub kind: ColumnKind,
    pub not_null: bool,
    pub primary_key: bool,
    pub default_random: bool,
    pub references: Option<ForeignKey>,
}

impl ColumnDef {
    fn new(key: &'static str, name: &'static str, kind: ColumnKind) -> Self {
        Self {
            key,
            name,
            kind,
            not_null: false,
            primary_key: false,
            default_random: false,
            references: None,
        }
    }

    pub fn identifier(key: &'static str, name: &'static str) -> Self {
        Self::new(key, name, ColumnKind::Identifier)
    }

    pub fn integer(key: &'static str, name: &'static str) -> Self {
        Self::new(key, name, ColumnKind::Integer)
    }

    pub fn text(key: &'static str, name: &'static str) -> Self {
        Self::new(key, name, ColumnKind::Text)
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.not_null = true;
        self
    }

    /// Generate a random identifier on insert when the caller omits one.
    pub fn default_random(mut self) -> Self {
        self.default_random = true;
        self
    }

    pub fn references(mut self, table: &'static str, column: &'static str) -> Self {
        self.references = Some(ForeignKey { table, column });
        self
    }

    pub fn is_identifier(&self) -> bool {
        self.kind == ColumnKind::Identifier
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    One,
    Many,
}

/// Related rows of `target` where `target.foreign = source.local`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDef {
    pub name: &'static str,
    pub kind: RelationKind,
    pub target: &'static str,
    pub local: &'static str,
    pub foreign: &'static str,
}

impl RelationDef {
    pub fn one(name: &'static str, target: &'static str, local: &'static str, foreign: &'static str) -> Self {
        Self { name, kind: RelationKind::One, target, local, foreign }
    }

    pub fn many(name: &'static str, target: &'static str, local: &'static str, foreign: &'static str) -> Self {
        Self { name, kind: RelationKind::Many, target, local, foreign }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    columns: Vec<ColumnDef>,
    relations: Vec<RelationDef>,
}

impl TableDef {
    pub fn new(name: &'static str) -> Self {
        Self { name, columns: Vec::new(), relations: Vec::new() }
    }

    pub fn with_column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_relation(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn relations(&self) -> &[RelationDef] {
        &self.relations
    }

    pub fn column(&self, key: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.key == key)
    }

    pub fn relation(&self, name: &str) -> Option<&RelationDef> {
        self.relations.iter().find(|r| r.name == name)
    }

    pub fn require_column(&self, key: &str) -> AppResult<&ColumnDef> {
        self.column(key)
            .ok_or_else(|| AppError::bad_request(format!("unknown column {}.{}", self.name, key)))
    }

    pub fn require_relation(&self, name: &str) -> AppResult<&RelationDef> {
        self.relation(name)
            .ok_or_else(|| AppError::bad_request(format!("unknown relation {}.{}", self.name, name)))
    }
}

/// The validated set of tables, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    tables: Vec<TableDef>,
}

impl Schema {
    pub fn new(tables: Vec<TableDef>) -> AppResult<Self> {
        let schema = Self { tables };
        schema.validate()?;
        Ok(schema)
    }

    pub fn tables(&self) -> &[TableDef] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> AppResult<&TableDef> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| AppError::not_found(format!("unknown table {}", name)))
    }

    fn validate(&self) -> AppResult<()> {
        let invalid = |msg: String| AppError::configuration(format!("invalid schema: {}", msg));

        let mut names = HashSet::new();
        for table in &self.tables {
            if !names.insert(table.name) {
                return Err(invalid(format!("duplicate table {}", table.name)));
            }
        }

        for table in &self.tables {
            let mut keys = HashSet::new();
            for column in &table.columns {
                if !keys.insert(column.key) {
                    return Err(invalid(format!("duplicate column {}.{}", table.name, column.key)));
                }
                if column.default_random && !column.is_identifier() {
                    return Err(invalid(format!(
                        "{}.{} generates random identifiers but is not an identifier column",
                        table.name, column.key
                    )));
                }
                if let Some(fk) = &column.references {
                    let target = self.lookup(fk.table).ok_or_else(|| {
                        invalid(format!("{}.{} references unknown table {}", table.name, column.key, fk.table))
                    })?;
                    let target_column = target.column(fk.column).ok_or_else(|| {
                        invalid(format!("{}.{} references unknown column {}.{}", table.name, column.key, fk.table, fk.column))
                    })?;
                    if target_column.kind != column.kind {
                        return Err(invalid(format!(
                            "{}.{} and {}.{} differ in kind",
                            table.name, column.key, fk.table, fk.column
                        )));
                    }
                }
            }

            for relation in &table.relations {
                if !keys.insert(relation.name) {
                    return Err(invalid(format!("relation {}.{} shadows another field", table.name, relation.name)));
                }
                let target = self.lookup(relation.target).ok_or_else(|| {
                    invalid(format!("relation {}.{} targets unknown table {}", table.name, relation.name, relation.target))
                })?;
                let local = table.column(relation.local).ok_or_else(|| {
                    invalid(format!("relation {}.{} uses unknown column {}", table.name, relation.name, relation.local))
                })?;
                let foreign = target.column(relation.foreign).ok_or_else(|| {
                    invalid(format!(
                        "relation {}.{} uses unknown column {}.{}",
                        table.name, relation.name, relation.target, relation.foreign
                    ))
                })?;
                if local.kind != foreign.kind {
                    return Err(invalid(format!(
                        "relation {}.{} joins {} to {}.{} of a different kind",
                        table.name, relation.name, relation.local, relation.target, relation.foreign
                    )));
                }
            }
        }

        Ok(())
    }

    fn lookup(&self, name: &str) -> Option<&TableDef> {
        self.tables.iter().find(|t| t.name == name)
    }
}
