//! UPDATE generation.

use super::{GeneratedStatement, Generator};
use crate::ast::{Expr, Statement, Update};
use crate::context::Context;
use crate::error::GenError;
use crate::errors::ErrorGroup;

/// UPDATE of a random column subset with an optional WHERE.
///
/// Values are constants, except that a rare value is a full expression.
pub fn generate_update(
    g: &Generator<'_>,
    ctx: &mut Context,
) -> Result<GeneratedStatement, GenError> {
    let table = g.schema.random_base_table(ctx)?;
    let columns = table.random_non_empty_column_subset(ctx);
    if columns.is_empty() {
        return Err(GenError::exhausted("update", "table has no declared columns"));
    }
    // CHECK constraints and partial index predicates see the new row.
    let errors = g.errors(&[ErrorGroup::Insert, ErrorGroup::Expression]);
    let mut exprs = g.expr_generator().with_columns(table.columns.clone());

    let mut sets = Vec::with_capacity(columns.len());
    for column in columns {
        let value = if ctx.small_probability() {
            exprs.generate_expression(ctx)?
        } else {
            Expr::constant(exprs.generate_constant(ctx)?)
        };
        sets.push((column.name, value));
    }

    let where_clause = if ctx.gen_bool() {
        Some(exprs.generate_expression(ctx)?)
    } else {
        None
    };

    let stmt = Update {
        table: table.name.clone(),
        sets,
        where_clause,
    };
    Ok(GeneratedStatement::new(Statement::Update(stmt), errors))
}
