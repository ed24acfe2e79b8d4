//! DELETE generation.

use super::{GeneratedStatement, Generator};
use crate::ast::{Delete, Statement};
use crate::context::Context;
use crate::error::GenError;
use crate::errors::ErrorGroup;

pub fn generate_delete(
    g: &Generator<'_>,
    ctx: &mut Context,
) -> Result<GeneratedStatement, GenError> {
    let table = g.schema.random_base_table(ctx)?;
    let where_clause = if ctx.gen_bool() {
        let mut exprs = g.expr_generator().with_columns(table.columns.clone());
        Some(exprs.generate_expression(ctx)?)
    } else {
        None
    };
    let stmt = Delete {
        table: table.name.clone(),
        where_clause,
    };
    Ok(GeneratedStatement::new(
        Statement::Delete(stmt),
        g.errors(&[ErrorGroup::Expression]),
    ))
}
