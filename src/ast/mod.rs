//! SQL AST. `Display` is the renderer: every node prints itself, and the
//! output depends only on the tree.

pub mod expr;
pub mod select;
pub mod stmt;

pub use expr::{
    BinaryOp, Collation, ColumnRef, Expr, ExprKind, FunctionCall, Order, PostfixOp, PrefixOp,
};
pub use select::{Join, JoinKind, Select, SelectColumn};
pub use stmt::{
    AlterAction, AlterTable, ColumnDef, ColumnFormat, ColumnOption, ColumnType, CreateIndex,
    CreateTable, CreateView, Delete, Insert, InsertValue, SqlType, Statement, StatementKind,
    Storage, TableBody, Update,
};
