//! Ternary logic query partitioning.
//!
//! A predicate `p` splits any row set into the rows where `p` is true, where
//! `NOT p` is true and where `p IS NULL`. Running a query once unrestricted
//! and once per partition must give the same rows overall.

use super::{Oracle, QUERY_ERROR_GROUPS, compare_partitions};
use crate::ast::{Expr, Select};
use crate::context::Context;
use crate::error::{CheckError, GenError};
use crate::executor::{self, StatementExecutor};
use crate::generate::Generator;
use crate::generate::select::generate_table_source;

/// Clause the partitioning predicate is injected into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumIter)]
pub enum TlpVariant {
    #[strum(to_string = "WHERE")]
    Where,
    /// Grouped query, predicate in HAVING.
    #[strum(to_string = "HAVING")]
    Having,
    /// Grouped query, predicate in WHERE, compared as sets.
    #[strum(to_string = "GROUP BY")]
    GroupBy,
    /// DISTINCT query, predicate in WHERE, compared as sets.
    #[strum(to_string = "DISTINCT")]
    Distinct,
}

/// `p`, `NOT p` and `p IS NULL`.
pub fn partition_predicates(predicate: &Expr) -> [Expr; 3] {
    [
        predicate.clone(),
        predicate.clone().negate(),
        predicate.clone().is_null(),
    ]
}

/// An unrestricted query and its three partitions.
#[derive(Debug, Clone)]
pub struct PartitionedQuery {
    pub original: Select,
    pub partitions: [Select; 3],
    /// Duplicates are not preserved by the partitions.
    pub as_set: bool,
}

pub struct TlpOracle {
    variant: TlpVariant,
}

impl TlpOracle {
    pub fn new(variant: TlpVariant) -> Self {
        Self { variant }
    }

    pub fn variant(&self) -> TlpVariant {
        self.variant
    }

    /// Generate a base query and a predicate and partition it for this
    /// oracle's clause.
    pub fn generate(
        &self,
        ctx: &mut Context,
        g: &Generator<'_>,
    ) -> Result<PartitionedQuery, GenError> {
        let source = generate_table_source(g, ctx)?;
        let mut exprs = g.expr_generator().with_columns(source.columns);
        let keys = ctx.non_empty_subset(exprs.columns());
        let fetch: Vec<Expr> = keys.iter().map(Expr::column).collect();
        if fetch.is_empty() {
            return Err(GenError::exhausted("partitioning", "no fetch columns"));
        }
        let mut base = Select::new(fetch.clone(), source.from, source.joins);

        match self.variant {
            TlpVariant::Where => {
                let predicate = exprs.generate_expression(ctx)?;
                Ok(partition_where(base, &predicate, false))
            }
            TlpVariant::GroupBy => {
                base.group_by = fetch;
                let predicate = exprs.generate_expression(ctx)?;
                Ok(partition_where(base, &predicate, true))
            }
            TlpVariant::Distinct => {
                base.distinct = true;
                let predicate = exprs.generate_expression(ctx)?;
                Ok(partition_where(base, &predicate, true))
            }
            TlpVariant::Having => {
                base.group_by = fetch;
                if ctx.gen_bool() {
                    base.where_clause = Some(exprs.generate_expression(ctx)?);
                }
                // outside aggregates only the grouping keys have a defined value
                let predicate = g
                    .expr_generator()
                    .with_columns(keys)
                    .with_aggregate_columns(exprs.columns().to_vec())
                    .generate_having(ctx)?;
                let partitions =
                    partition_predicates(&predicate).map(|p| base.clone().with_having(Some(p)));
                Ok(PartitionedQuery {
                    original: base,
                    partitions,
                    as_set: false,
                })
            }
        }
    }
}

fn partition_where(base: Select, predicate: &Expr, as_set: bool) -> PartitionedQuery {
    let partitions = partition_predicates(predicate).map(|p| base.clone().with_where(Some(p)));
    PartitionedQuery {
        original: base,
        partitions,
        as_set,
    }
}

impl Oracle for TlpOracle {
    fn name(&self) -> &'static str {
        match self.variant {
            TlpVariant::Where => "TLP WHERE",
            TlpVariant::Having => "TLP HAVING",
            TlpVariant::GroupBy => "TLP GROUP BY",
            TlpVariant::Distinct => "TLP DISTINCT",
        }
    }

    fn check(
        &mut self,
        ctx: &mut Context,
        g: &Generator<'_>,
        exec: &mut dyn StatementExecutor,
    ) -> Result<(), CheckError> {
        let query = self.generate(ctx, g)?;
        let errors = g.errors(QUERY_ERROR_GROUPS);

        let original_sql = query.original.to_string();
        let original_rows = executor::query(exec, &original_sql, &errors)?;
        let mut partitions = Vec::with_capacity(query.partitions.len());
        for partition in &query.partitions {
            let sql = partition.to_string();
            let rows = executor::query(exec, &sql, &errors)?;
            partitions.push((sql, rows));
        }
        compare_partitions(
            self.name(),
            (&original_sql, &original_rows),
            &partitions,
            query.as_set,
        )
    }
}
