//! Non-optimizing reference engine construction.
//!
//! The same predicate is evaluated once as a WHERE filter, where the
//! optimizer may use indexes and pushdown, and once as a per-row value summed
//! over the unfiltered join. Both must agree on how many rows satisfy it.

use super::{Oracle, QUERY_ERROR_GROUPS};
use crate::ast::{Expr, Select, SelectColumn};
use crate::context::Context;
use crate::error::{CheckError, Discrepancy};
use crate::executor::{self, StatementExecutor};
use crate::generate::Generator;
use crate::generate::select::generate_table_source;
use crate::types::TypeName;

pub struct NoRecOracle;

/// The two formulations of one NoREC round.
#[derive(Debug, Clone)]
pub struct NoRecQueries {
    pub optimized: String,
    pub unoptimized: String,
}

impl NoRecOracle {
    /// Generate a predicate and build both formulations around it.
    pub fn generate(ctx: &mut Context, g: &Generator<'_>) -> Result<NoRecQueries, CheckError> {
        let source = generate_table_source(g, ctx)?;
        let mut exprs = g.expr_generator().with_columns(source.columns);
        let predicate = exprs.generate_expression(ctx)?;
        let order_by = if ctx.gen_bool() {
            exprs.generate_order_bys(ctx)?
        } else {
            Vec::new()
        };
        let fetch = exprs.columns().iter().map(Expr::column).collect();
        Ok(Self::build(fetch, source.from, source.joins, predicate, order_by))
    }

    fn build(
        fetch: Vec<Expr>,
        from: Vec<String>,
        joins: Vec<crate::ast::Join>,
        predicate: Expr,
        order_by: Vec<Expr>,
    ) -> NoRecQueries {
        let mut optimized = Select::new(fetch, from.clone(), joins.clone())
            .with_where(Some(predicate.clone()));
        optimized.order_by = order_by;

        let guard = format!(" IS NOT NULL AND ({predicate})");
        let flag = Expr::cast(Expr::postfix_text(predicate, guard), TypeName::bigint());
        let inner = Select::new(Vec::new(), from, joins)
            .with_columns(vec![SelectColumn::aliased(flag, "count")]);

        NoRecQueries {
            optimized: optimized.to_string(),
            unoptimized: format!("SELECT SUM(count) FROM ({inner}) as res"),
        }
    }
}

impl Oracle for NoRecOracle {
    fn name(&self) -> &'static str {
        "NoREC"
    }

    fn check(
        &mut self,
        ctx: &mut Context,
        g: &Generator<'_>,
        exec: &mut dyn StatementExecutor,
    ) -> Result<(), CheckError> {
        let queries = Self::generate(ctx, g)?;
        let errors = g.errors(QUERY_ERROR_GROUPS);

        let first_count = executor::query(exec, &queries.optimized, &errors)?.len() as i64;
        let rows = executor::query(exec, &queries.unoptimized, &errors)?;
        let second_count = match rows.first().and_then(|row| row.0.first()) {
            None => 0,
            Some(value) => value.as_count().ok_or_else(|| CheckError::Unexpected {
                sql: queries.unoptimized.clone(),
                message: format!("count is not an integer: {value}"),
            })?,
        };

        if first_count != second_count {
            tracing::error!(
                "NoREC mismatch: {first_count} != {second_count}\n{}; -- {first_count}\n{} -- {second_count}",
                queries.optimized,
                queries.unoptimized
            );
            return Err(Discrepancy::new(
                self.name(),
                format!("{first_count} rows vs SUM {second_count}"),
            )
            .query(queries.optimized, first_count)
            .query(queries.unoptimized, second_count)
            .into());
        }
        Ok(())
    }
}
