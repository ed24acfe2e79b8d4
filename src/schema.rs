//! Schema snapshot used by the generators.
//!
//! A [`Schema`] is read from the engine at the start of a generation batch
//! and is immutable afterwards. DDL issued during the batch is only observed
//! after the next read.

use std::collections::HashSet;

use serde::Serialize;

use crate::context::Context;
use crate::error::GenError;
use crate::types::CompositeType;

/// Name of the implicit row identifier column.
pub const ROWID: &str = "rowid";

/// A column owned by a table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    /// Name of the owning table.
    pub table: String,
    pub ty: CompositeType,
    pub is_primary_key: bool,
    pub is_nullable: bool,
    /// Synthesized row identifier rather than a declared column.
    pub is_rowid: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: CompositeType) -> Self {
        Self {
            name: name.into(),
            table: String::new(),
            ty,
            is_primary_key: false,
            is_nullable: true,
            is_rowid: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self.is_nullable = false;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.is_nullable = false;
        self
    }

    /// `table.column`, as rendered in expressions.
    pub fn qualified_name(&self) -> String {
        if self.table.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.table, self.name)
        }
    }
}

/// A table or view with its ordered columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub is_view: bool,
}

impl Table {
    /// Views are recognized by their `v` name prefix.
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        let name = name.into();
        let columns = columns
            .into_iter()
            .map(|mut c| {
                c.table = name.clone();
                c
            })
            .collect();
        Self {
            is_view: name.starts_with('v'),
            name,
            columns,
        }
    }

    /// Append the implicit `rowid` column when no column is a primary key.
    pub fn with_rowid(mut self) -> Self {
        let has_pk = self.columns.iter().any(|c| c.is_primary_key);
        let has_rowid = self.columns.iter().any(|c| c.name == ROWID);
        if !has_pk && !has_rowid {
            let mut rowid = Column::new(ROWID, CompositeType::int()).not_null();
            rowid.table = self.name.clone();
            rowid.is_rowid = true;
            self.columns.push(rowid);
        }
        self
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Declared columns, without the synthesized rowid.
    pub fn declared_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| !c.is_rowid)
    }

    pub fn random_column(&self, ctx: &mut Context) -> Result<&Column, GenError> {
        ctx.choose(&self.columns)
            .ok_or_else(|| GenError::schema_empty(format!("columns in {}", self.name)))
    }

    /// Random non-empty subset of the declared columns.
    pub fn random_non_empty_column_subset(&self, ctx: &mut Context) -> Vec<Column> {
        let declared: Vec<Column> = self.declared_columns().cloned().collect();
        ctx.non_empty_subset(&declared)
    }

    /// First `cN` name not used by this table.
    pub fn free_column_name(&self) -> String {
        (0..)
            .map(|i| format!("c{i}"))
            .find(|name| !self.has_column(name))
            .unwrap_or_default()
    }
}

/// Several tables picked for one query, with the union of their columns.
#[derive(Debug, Clone)]
pub struct TableGroup {
    pub tables: Vec<Table>,
}

impl TableGroup {
    pub fn columns(&self) -> Vec<Column> {
        self.tables
            .iter()
            .flat_map(|t| t.columns.iter().cloned())
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name.clone()).collect()
    }
}

/// Tables and views visible to one generation batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schema {
    tables: Vec<Table>,
}

impl Schema {
    pub fn new(tables: Vec<Table>) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Base tables only.
    pub fn base_tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter().filter(|t| !t.is_view)
    }

    pub fn random_table(
        &self,
        ctx: &mut Context,
        predicate: impl Fn(&Table) -> bool,
    ) -> Result<&Table, GenError> {
        let candidates: Vec<&Table> = self.tables.iter().filter(|&t| predicate(t)).collect();
        ctx.choose(&candidates)
            .copied()
            .ok_or_else(|| GenError::schema_empty("matching table"))
    }

    /// Random non-view table.
    pub fn random_base_table(&self, ctx: &mut Context) -> Result<&Table, GenError> {
        self.random_table(ctx, |t| !t.is_view)
    }

    /// Random non-empty subset of all tables and views.
    pub fn random_non_empty_tables(&self, ctx: &mut Context) -> Result<TableGroup, GenError> {
        if self.tables.is_empty() {
            return Err(GenError::schema_empty("tables"));
        }
        Ok(TableGroup {
            tables: ctx.non_empty_subset(&self.tables),
        })
    }

    fn names(&self) -> HashSet<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    fn free_name(&self, prefix: char) -> String {
        let used = self.names();
        (0..)
            .map(|i| format!("{prefix}{i}"))
            .find(|name| !used.contains(name.as_str()))
            .unwrap_or_default()
    }

    /// First `tN` name not in use.
    pub fn free_table_name(&self) -> String {
        self.free_name('t')
    }

    /// First `vN` name not in use.
    pub fn free_view_name(&self) -> String {
        self.free_name('v')
    }
}
