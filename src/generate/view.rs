//! CREATE VIEW generation.

use super::select::generate_select;
use super::{GeneratedStatement, Generator};
use crate::ast::{CreateView, Statement};
use crate::context::Context;
use crate::error::GenError;
use crate::errors::ErrorGroup;

/// `CREATE VIEW vN(c0, ..) AS SELECT ..` with matching column counts.
pub fn generate_create_view(
    g: &Generator<'_>,
    ctx: &mut Context,
) -> Result<GeneratedStatement, GenError> {
    let count = ctx.small_number() + 1;
    let select = generate_select(g, ctx, count)?;
    let stmt = CreateView {
        name: g.schema.free_view_name(),
        columns: (0..count).map(|i| format!("c{i}")).collect(),
        select,
    };
    Ok(GeneratedStatement::new(
        Statement::CreateView(stmt),
        g.errors(&[ErrorGroup::Expression, ErrorGroup::GroupBy]),
    ))
}
