//! Query partitioning for aggregate functions.
//!
//! `MIN`, `MAX`, `SUM` and `COUNT` over all rows can be recomputed from the
//! same aggregate over each of the three partitions. `COUNT` is recombined
//! with `SUM`.

use super::tlp::partition_predicates;
use super::{Oracle, QUERY_ERROR_GROUPS};
use crate::ast::{Expr, Select, SelectColumn};
use crate::context::Context;
use crate::error::{CheckError, Discrepancy, GenError};
use crate::executor::{self, SqlValue, StatementExecutor};
use crate::functions::aggregate;
use crate::generate::Generator;
use crate::generate::select::generate_table_source;

/// Aggregates that can be recombined, with the outer recombining function.
const RECOMPOSABLE: &[(&str, &str)] = &[
    ("MIN", "MIN"),
    ("MAX", "MAX"),
    ("SUM", "SUM"),
    ("COUNT", "SUM"),
];

pub struct AggregateOracle;

#[derive(Debug, Clone)]
pub struct AggregateQueries {
    pub original: String,
    pub recomposed: String,
}

impl AggregateOracle {
    pub fn generate(ctx: &mut Context, g: &Generator<'_>) -> Result<AggregateQueries, GenError> {
        let source = generate_table_source(g, ctx)?;
        let mut exprs = g.expr_generator().with_columns(source.columns);
        let (name, outer) = *ctx
            .choose(RECOMPOSABLE)
            .ok_or_else(|| GenError::exhausted("aggregate", "no recomposable aggregate"))?;
        let def = aggregate(name)
            .ok_or_else(|| GenError::exhausted("aggregate", format!("{name} not in catalog")))?;
        let argument = exprs.generate_expression(ctx)?;
        let predicate = exprs.generate_expression(ctx)?;

        let base = Select::new(Vec::new(), source.from, source.joins)
            .with_columns(vec![SelectColumn::aliased(Expr::call(def, vec![argument]), "agg")]);
        Ok(Self::build(base, &predicate, outer))
    }

    fn build(base: Select, predicate: &Expr, outer: &str) -> AggregateQueries {
        let parts = partition_predicates(predicate)
            .map(|p| base.clone().with_where(Some(p)).to_string())
            .join(" UNION ALL ");
        AggregateQueries {
            original: base.to_string(),
            recomposed: format!("SELECT {outer}(agg) FROM ({parts}) as res"),
        }
    }
}

/// Numeric results are compared by value so an integer sum and a real sum
/// of the same rows agree.
fn values_agree(a: &SqlValue, b: &SqlValue) -> bool {
    match (a, b) {
        (SqlValue::Integer(x), SqlValue::Real(y)) | (SqlValue::Real(y), SqlValue::Integer(x)) => {
            SqlValue::Real(*x as f64) == SqlValue::Real(*y)
        }
        _ => a == b,
    }
}

fn scalar(rows: Vec<executor::Row>) -> SqlValue {
    rows.into_iter()
        .next()
        .and_then(|row| row.0.into_iter().next())
        .unwrap_or(SqlValue::Null)
}

impl Oracle for AggregateOracle {
    fn name(&self) -> &'static str {
        "TLP AGGREGATE"
    }

    fn check(
        &mut self,
        ctx: &mut Context,
        g: &Generator<'_>,
        exec: &mut dyn StatementExecutor,
    ) -> Result<(), CheckError> {
        let queries = Self::generate(ctx, g)?;
        let errors = g.errors(QUERY_ERROR_GROUPS);
        let original = scalar(executor::query(exec, &queries.original, &errors)?);
        let recomposed = scalar(executor::query(exec, &queries.recomposed, &errors)?);
        if values_agree(&original, &recomposed) {
            return Ok(());
        }
        tracing::error!("{} mismatch: {original} != {recomposed}", self.name());
        Err(
            Discrepancy::new(self.name(), format!("{original} != {recomposed}"))
                .query(queries.original, &original)
                .query(queries.recomposed, &recomposed)
                .into(),
        )
    }
}
