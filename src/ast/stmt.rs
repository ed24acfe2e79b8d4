//! DDL and DML statements.

use std::fmt;

use itertools::Itertools;

use super::expr::{Collation, Expr, Order};
use super::select::Select;
use crate::constant::Constant;
use crate::types::{DataKind, TypeName};

/// Column type spellings accepted by the dialect's CREATE TABLE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumIter)]
pub enum SqlType {
    TinyInt,
    SmallInt,
    MediumInt,
    Int,
    BigInt,
    Varchar,
    TinyText,
    Text,
    MediumText,
    LongText,
    Boolean,
    Float,
    Double,
    Decimal,
}

impl SqlType {
    pub fn kind(self) -> DataKind {
        match self {
            SqlType::TinyInt
            | SqlType::SmallInt
            | SqlType::MediumInt
            | SqlType::Int
            | SqlType::BigInt => DataKind::Integer,
            SqlType::Varchar
            | SqlType::TinyText
            | SqlType::Text
            | SqlType::MediumText
            | SqlType::LongText => DataKind::Text,
            SqlType::Boolean => DataKind::Boolean,
            SqlType::Float => DataKind::Float,
            SqlType::Double => DataKind::Double,
            SqlType::Decimal => DataKind::Decimal,
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SqlType::TinyInt => "TINYINT",
            SqlType::SmallInt => "SMALLINT",
            SqlType::MediumInt => "MEDIUMINT",
            SqlType::Int => "INT",
            SqlType::BigInt => "BIGINT",
            SqlType::Varchar => "VARCHAR(500)",
            SqlType::TinyText => "TINYTEXT",
            SqlType::Text => "TEXT",
            SqlType::MediumText => "MEDIUMTEXT",
            SqlType::LongText => "LONGTEXT",
            SqlType::Boolean => "BOOLEAN",
            SqlType::Float => "FLOAT",
            SqlType::Double => "DOUBLE",
            SqlType::Decimal => "DECIMAL",
        };
        write!(f, "{s}")
    }
}

/// A column type as written in a column definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnType {
    pub base: SqlType,
    /// Integer display width.
    pub display_width: Option<u8>,
    /// `(M, D)` for floating point and decimal types; `D <= M`.
    pub precision: Option<(u8, u8)>,
    pub unsigned: bool,
    pub zerofill: bool,
}

impl ColumnType {
    pub fn new(base: SqlType) -> Self {
        Self {
            base,
            display_width: None,
            precision: None,
            unsigned: false,
            zerofill: false,
        }
    }

    pub fn kind(&self) -> DataKind {
        self.base.kind()
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)?;
        if let Some(w) = self.display_width {
            write!(f, "({w})")?;
        }
        if let Some((m, d)) = self.precision {
            write!(f, "({m}, {d})")?;
        }
        if self.unsigned {
            write!(f, " UNSIGNED")?;
        }
        if self.zerofill {
            write!(f, " ZEROFILL")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumIter, strum::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum ColumnFormat {
    Fixed,
    Dynamic,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumIter, strum::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Storage {
    Disk,
    Memory,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnOption {
    Null,
    NotNull,
    Unique { key: bool },
    Comment(String),
    ColumnFormat(ColumnFormat),
    Storage(Storage),
    PrimaryKey,
    Collate(Collation),
    Check(Expr),
    Default(Constant),
}

impl fmt::Display for ColumnOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnOption::Null => write!(f, "NULL"),
            ColumnOption::NotNull => write!(f, "NOT NULL"),
            ColumnOption::Unique { key: true } => write!(f, "UNIQUE KEY"),
            ColumnOption::Unique { key: false } => write!(f, "UNIQUE"),
            ColumnOption::Comment(c) => write!(f, "COMMENT {}", Constant::Text(c.clone())),
            ColumnOption::ColumnFormat(c) => write!(f, "COLUMN_FORMAT {c}"),
            ColumnOption::Storage(s) => write!(f, "STORAGE {s}"),
            ColumnOption::PrimaryKey => write!(f, "PRIMARY KEY"),
            ColumnOption::Collate(c) => write!(f, "COLLATE {c}"),
            ColumnOption::Check(e) => write!(f, "CHECK({e})"),
            ColumnOption::Default(c) => write!(f, "DEFAULT({c})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ColumnType,
    pub options: Vec<ColumnOption>,
}

impl ColumnDef {
    pub fn is_primary_key(&self) -> bool {
        self.options.contains(&ColumnOption::PrimaryKey)
    }

    /// Explicitly declared `NULL`.
    pub fn is_marked_null(&self) -> bool {
        self.options.contains(&ColumnOption::Null)
    }

    pub fn is_not_null(&self) -> bool {
        self.options.contains(&ColumnOption::NotNull)
    }
}

impl fmt::Display for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.ty)?;
        for option in &self.options {
            write!(f, " {option}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableBody {
    /// Copy the definition of an existing table.
    Like(String),
    Columns {
        columns: Vec<ColumnDef>,
        /// Table-level `PRIMARY KEY(...)`; empty when absent.
        primary_key: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub name: String,
    pub if_not_exists: bool,
    pub body: TableBody,
}

impl CreateTable {
    pub fn columns(&self) -> &[ColumnDef] {
        match &self.body {
            TableBody::Columns { columns, .. } => columns,
            TableBody::Like(_) => &[],
        }
    }
}

impl fmt::Display for CreateTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CREATE TABLE ")?;
        if self.if_not_exists {
            write!(f, "IF NOT EXISTS ")?;
        }
        write!(f, "{}", self.name)?;
        match &self.body {
            TableBody::Like(source) => write!(f, " LIKE {source}"),
            TableBody::Columns {
                columns,
                primary_key,
            } => {
                write!(f, "({}", columns.iter().join(", "))?;
                if !primary_key.is_empty() {
                    write!(f, ", PRIMARY KEY({})", primary_key.iter().join(", "))?;
                }
                write!(f, ")")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlterAction {
    AddColumn {
        name: String,
        ty: TypeName,
    },
    AlterColumnType {
        column: String,
        ty: TypeName,
        using: Option<Expr>,
    },
    DropColumn {
        column: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlterTable {
    pub table: String,
    pub action: AlterAction,
}

impl fmt::Display for AlterTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ALTER TABLE {} ", self.table)?;
        match &self.action {
            AlterAction::AddColumn { name, ty } => write!(f, "ADD COLUMN {name} {ty}"),
            AlterAction::AlterColumnType { column, ty, using } => {
                write!(f, "ALTER COLUMN {column} SET DATA TYPE {ty}")?;
                if let Some(using) = using {
                    write!(f, " USING {using}")?;
                }
                Ok(())
            }
            AlterAction::DropColumn { column } => write!(f, "DROP COLUMN {column}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertValue {
    Default,
    Constant(Constant),
}

impl fmt::Display for InsertValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertValue::Default => write!(f, "DEFAULT"),
            InsertValue::Constant(c) => write!(f, "{c}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: String,
    pub columns: Vec<String>,
    /// Each row has one value per column.
    pub rows: Vec<Vec<InsertValue>>,
}

impl fmt::Display for Insert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "INSERT INTO {}({}) VALUES ",
            self.table,
            self.columns.iter().join(", ")
        )?;
        let rows = self
            .rows
            .iter()
            .map(|row| format!("({})", row.iter().join(", ")))
            .join(", ");
        write!(f, "{rows}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: String,
    pub sets: Vec<(String, Expr)>,
    pub where_clause: Option<Expr>,
}

impl fmt::Display for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sets = self
            .sets
            .iter()
            .map(|(column, value)| format!("{column}={value}"))
            .join(", ");
        write!(f, "UPDATE {} SET {sets}", self.table)?;
        if let Some(w) = &self.where_clause {
            write!(f, " WHERE {w}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub table: String,
    pub where_clause: Option<Expr>,
}

impl fmt::Display for Delete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DELETE FROM {}", self.table)?;
        if let Some(w) = &self.where_clause {
            write!(f, " WHERE {w}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateIndex {
    pub unique: bool,
    pub name: String,
    pub table: String,
    pub columns: Vec<(String, Option<Order>)>,
    pub where_clause: Option<Expr>,
}

impl fmt::Display for CreateIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CREATE ")?;
        if self.unique {
            write!(f, "UNIQUE ")?;
        }
        let columns = self
            .columns
            .iter()
            .map(|(name, order)| match order {
                Some(o) => format!("{name} {o}"),
                None => name.clone(),
            })
            .join(", ");
        write!(f, "INDEX {} ON {}({columns})", self.name, self.table)?;
        if let Some(w) = &self.where_clause {
            write!(f, " WHERE {w}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateView {
    pub name: String,
    pub columns: Vec<String>,
    pub select: Select,
}

impl fmt::Display for CreateView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CREATE VIEW {}({}) AS {}",
            self.name,
            self.columns.iter().join(", "),
            self.select
        )
    }
}

/// Any statement the generators produce.
#[derive(Debug, Clone, PartialEq, strum::EnumDiscriminants)]
#[strum_discriminants(name(StatementKind))]
#[strum_discriminants(derive(Hash, strum::EnumIter, strum::Display))]
pub enum Statement {
    CreateTable(CreateTable),
    AlterTable(AlterTable),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
    CreateIndex(CreateIndex),
    CreateView(CreateView),
    Explain(Select),
    Select(Select),
    Vacuum,
    Analyze,
}

impl Statement {
    pub fn kind(&self) -> StatementKind {
        StatementKind::from(self)
    }

    /// Whether executing the statement may change the schema.
    pub fn is_ddl(&self) -> bool {
        matches!(
            self,
            Statement::CreateTable(_)
                | Statement::AlterTable(_)
                | Statement::CreateIndex(_)
                | Statement::CreateView(_)
        )
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::CreateTable(s) => write!(f, "{s}"),
            Statement::AlterTable(s) => write!(f, "{s}"),
            Statement::Insert(s) => write!(f, "{s}"),
            Statement::Update(s) => write!(f, "{s}"),
            Statement::Delete(s) => write!(f, "{s}"),
            Statement::CreateIndex(s) => write!(f, "{s}"),
            Statement::CreateView(s) => write!(f, "{s}"),
            Statement::Explain(s) => write!(f, "EXPLAIN {s}"),
            Statement::Select(s) => write!(f, "{s}"),
            Statement::Vacuum => write!(f, "VACUUM"),
            Statement::Analyze => write!(f, "ANALYZE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::expr::BinaryOp;
    use crate::types::CompositeType;

    fn c(name: &str) -> Expr {
        Expr::Column(crate::ast::expr::ColumnRef {
            table: None,
            column: name.into(),
        })
    }

    #[test]
    fn test_create_table_rendering() {
        let stmt = CreateTable {
            name: "t0".into(),
            if_not_exists: true,
            body: TableBody::Columns {
                columns: vec![
                    ColumnDef {
                        name: "c0".into(),
                        ty: ColumnType {
                            display_width: Some(11),
                            zerofill: true,
                            ..ColumnType::new(SqlType::Int)
                        },
                        options: vec![ColumnOption::NotNull, ColumnOption::PrimaryKey],
                    },
                    ColumnDef {
                        name: "c1".into(),
                        ty: ColumnType {
                            precision: Some((10, 2)),
                            unsigned: true,
                            ..ColumnType::new(SqlType::Decimal)
                        },
                        options: vec![
                            ColumnOption::Comment("asdf".into()),
                            ColumnOption::Default(Constant::Int(1)),
                        ],
                    },
                ],
                primary_key: vec![],
            },
        };
        assert_eq!(
            stmt.to_string(),
            "CREATE TABLE IF NOT EXISTS t0(c0 INT(11) ZEROFILL NOT NULL PRIMARY KEY, \
             c1 DECIMAL(10, 2) UNSIGNED COMMENT 'asdf' DEFAULT(1))"
        );
        assert!(stmt.columns()[0].is_primary_key());
    }

    #[test]
    fn test_create_table_like_and_table_key() {
        let like = CreateTable {
            name: "t1".into(),
            if_not_exists: false,
            body: TableBody::Like("t0".into()),
        };
        assert_eq!(like.to_string(), "CREATE TABLE t1 LIKE t0");
        assert!(like.columns().is_empty());

        let keyed = CreateTable {
            name: "t2".into(),
            if_not_exists: false,
            body: TableBody::Columns {
                columns: vec![ColumnDef {
                    name: "c0".into(),
                    ty: ColumnType::new(SqlType::Varchar),
                    options: vec![ColumnOption::Collate(Collation::NoCase)],
                }],
                primary_key: vec!["c0".into()],
            },
        };
        assert_eq!(
            keyed.to_string(),
            "CREATE TABLE t2(c0 VARCHAR(500) COLLATE NOCASE, PRIMARY KEY(c0))"
        );
    }

    #[test]
    fn test_alter_table_rendering() {
        let mut ctx = crate::context::Context::new_with_seed(1);
        let ty = CompositeType::bigint().spell(&mut ctx);
        let alter = AlterTable {
            table: "t0".into(),
            action: AlterAction::AlterColumnType {
                column: "c0".into(),
                ty,
                using: Some(c("c0")),
            },
        };
        assert_eq!(
            alter.to_string(),
            format!("ALTER TABLE t0 ALTER COLUMN c0 SET DATA TYPE {} USING c0", ty.spelling)
        );
        let drop = AlterTable {
            table: "t0".into(),
            action: AlterAction::DropColumn {
                column: "c1".into(),
            },
        };
        assert_eq!(drop.to_string(), "ALTER TABLE t0 DROP COLUMN c1");
    }

    #[test]
    fn test_dml_rendering() {
        let insert = Insert {
            table: "t0".into(),
            columns: vec!["c0".into(), "c1".into()],
            rows: vec![
                vec![
                    InsertValue::Constant(Constant::Int(1)),
                    InsertValue::Constant(Constant::Text("a".into())),
                ],
                vec![InsertValue::Default, InsertValue::Constant(Constant::Null)],
            ],
        };
        assert_eq!(
            insert.to_string(),
            "INSERT INTO t0(c0, c1) VALUES (1, 'a'), (DEFAULT, NULL)"
        );

        let update = Update {
            table: "t0".into(),
            sets: vec![("c0".into(), Expr::constant(Constant::Int(2)))],
            where_clause: Some(Expr::binary(c("c0"), BinaryOp::Lt, Expr::constant(Constant::Int(5)))),
        };
        assert_eq!(update.to_string(), "UPDATE t0 SET c0=2 WHERE (c0) < (5)");

        let delete = Delete {
            table: "t0".into(),
            where_clause: None,
        };
        assert_eq!(delete.to_string(), "DELETE FROM t0");
    }

    #[test]
    fn test_index_and_view_rendering() {
        let index = CreateIndex {
            unique: true,
            name: "i3".into(),
            table: "t0".into(),
            columns: vec![("c0".into(), None), ("c1".into(), Some(Order::Desc))],
            where_clause: Some(c("c0").is_null()),
        };
        assert_eq!(
            index.to_string(),
            "CREATE UNIQUE INDEX i3 ON t0(c0, c1 DESC) WHERE (c0) IS NULL"
        );

        let view = CreateView {
            name: "v0".into(),
            columns: vec!["c0".into()],
            select: Select::new(vec![c("c0")], vec!["t0".into()], vec![]),
        };
        assert_eq!(view.to_string(), "CREATE VIEW v0(c0) AS SELECT c0 FROM t0");
        assert!(Statement::CreateView(view).is_ddl());
        assert!(!Statement::Vacuum.is_ddl());
        assert_eq!(Statement::Analyze.to_string(), "ANALYZE");
    }
}
