//! Query synthesis: FROM/JOIN lists and full SELECT statements.

use strum::IntoEnumIterator;

use super::{GeneratedStatement, Generator};
use crate::ast::{Join, JoinKind, Select, SelectColumn, Statement};
use crate::context::Context;
use crate::error::GenError;
use crate::errors::ErrorGroup;
use crate::schema::{Column, Table};

/// Tables chosen for one query, split into a FROM list and joins.
#[derive(Debug, Clone)]
pub struct TableSource {
    pub from: Vec<String>,
    pub joins: Vec<Join>,
    /// Columns of every chosen table.
    pub columns: Vec<Column>,
}

/// Pick a random non-empty set of tables and build its join list.
pub fn generate_table_source(
    g: &Generator<'_>,
    ctx: &mut Context,
) -> Result<TableSource, GenError> {
    let group = g.schema.random_non_empty_tables(ctx)?;
    let columns = group.columns();
    let (from, joins) = generate_joins(g, ctx, &group.tables)?;
    Ok(TableSource {
        from,
        joins,
        columns,
    })
}

/// Split `tables` into a leading FROM list and trailing joins.
///
/// An ON predicate only sees the columns of its own table and the tables
/// before it.
pub fn generate_joins(
    g: &Generator<'_>,
    ctx: &mut Context,
    tables: &[Table],
) -> Result<(Vec<String>, Vec<Join>), GenError> {
    let mut join_count = 0;
    while join_count + 1 < tables.len() && ctx.low_probability() {
        join_count += 1;
    }
    let split = tables.len() - join_count;
    let from = tables[..split].iter().map(|t| t.name.clone()).collect();

    let kinds: Vec<JoinKind> = JoinKind::iter().collect();
    let mut joins = Vec::with_capacity(join_count);
    for i in split..tables.len() {
        let kind = kinds[ctx.gen_range(kinds.len())];
        let on = if kind == JoinKind::Natural {
            None
        } else {
            let scope: Vec<Column> = tables[..=i]
                .iter()
                .flat_map(|t| t.columns.iter().cloned())
                .collect();
            let mut exprs = g.expr_generator().with_columns(scope);
            Some(exprs.generate_expression(ctx)?)
        };
        joins.push(Join {
            kind,
            table: tables[i].name.clone(),
            on,
        });
    }
    Ok((from, joins))
}

/// Build a SELECT with `column_count` generated fetch expressions and each
/// optional clause decided by a coin flip.
pub fn generate_select(
    g: &Generator<'_>,
    ctx: &mut Context,
    column_count: usize,
) -> Result<Select, GenError> {
    let source = generate_table_source(g, ctx)?;
    let mut exprs = g.expr_generator().with_columns(source.columns.clone());

    let columns = exprs
        .generate_expressions(ctx, column_count, 0)?
        .into_iter()
        .map(SelectColumn::new)
        .collect();
    let where_clause = if ctx.gen_bool() {
        Some(exprs.generate_expression(ctx)?)
    } else {
        None
    };
    let order_by = if ctx.gen_bool() {
        exprs.generate_order_bys(ctx)?
    } else {
        Vec::new()
    };
    let group_by = if ctx.gen_bool() {
        let count = ctx.small_number() + 1;
        exprs.generate_expressions(ctx, count, 0)?
    } else {
        Vec::new()
    };
    let limit = ctx.gen_bool().then(|| ctx.gen_limit());
    let offset = ctx.gen_bool().then(|| ctx.gen_limit());
    let having_allowed = !group_by.is_empty() || g.options.test_having_without_group_by;
    let having = if having_allowed && ctx.gen_bool() {
        Some(exprs.generate_having(ctx)?)
    } else {
        None
    };

    Ok(Select {
        distinct: false,
        columns,
        from: source.from,
        joins: source.joins,
        where_clause,
        group_by,
        having,
        order_by,
        limit,
        offset,
    })
}

/// `EXPLAIN` over a synthesized query.
pub fn generate_explain(
    g: &Generator<'_>,
    ctx: &mut Context,
) -> Result<GeneratedStatement, GenError> {
    let count = ctx.small_number() + 1;
    let select = generate_select(g, ctx, count)?;
    Ok(GeneratedStatement::new(
        Statement::Explain(select),
        g.errors(&[ErrorGroup::Expression, ErrorGroup::GroupBy]),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCatalog;
    use crate::generate::test_support::sample_schema;
    use crate::options::Options;
    use crate::schema::Schema;

    #[test]
    fn test_fetch_column_count() {
        let schema = sample_schema();
        let options = Options::default();
        let catalog = ErrorCatalog::default();
        let g = Generator::new(&schema, &options, &catalog);
        let mut ctx = Context::new_with_seed(42);
        for n in 1..=4 {
            for _ in 0..20 {
                if let Ok(select) = generate_select(&g, &mut ctx, n) {
                    assert_eq!(select.columns.len(), n);
                    assert!(!select.from.is_empty());
                }
            }
        }
    }

    #[test]
    fn test_every_optional_clause_shows_up() {
        let schema = sample_schema();
        let options = Options::default();
        let catalog = ErrorCatalog::default();
        let g = Generator::new(&schema, &options, &catalog);
        let mut ctx = Context::new_with_seed(1);
        let sqls: Vec<String> = (0..300)
            .filter_map(|_| generate_select(&g, &mut ctx, 1).ok())
            .map(|s| s.to_string())
            .collect();
        for clause in [" WHERE ", " GROUP BY ", " HAVING ", " ORDER BY ", " LIMIT ", " OFFSET ", " JOIN "] {
            assert!(sqls.iter().any(|s| s.contains(clause)), "{clause} never generated");
        }
        assert!(sqls.iter().any(|s| !s.contains(" WHERE ")));
    }

    #[test]
    fn test_sqlite_profile_groups_before_having() {
        let schema = sample_schema();
        let options = Options::sqlite_compatible();
        let catalog = ErrorCatalog::with_sqlite();
        let g = Generator::new(&schema, &options, &catalog);
        let mut ctx = Context::new_with_seed(1);
        let mut havings = 0;
        for _ in 0..300 {
            let Ok(select) = generate_select(&g, &mut ctx, 1) else {
                continue;
            };
            if select.having.is_some() {
                havings += 1;
                assert!(!select.group_by.is_empty(), "{select}");
            }
        }
        assert!(havings > 0);
    }

    #[test]
    fn test_limits_non_negative() {
        let schema = sample_schema();
        let options = Options::default();
        let catalog = ErrorCatalog::default();
        let g = Generator::new(&schema, &options, &catalog);
        let mut ctx = Context::new_with_seed(2);
        for _ in 0..200 {
            if let Ok(select) = generate_select(&g, &mut ctx, 1) {
                for v in select.limit.into_iter().chain(select.offset) {
                    assert!((0..=i32::MAX as i64).contains(&v));
                }
            }
        }
    }

    #[test]
    fn test_join_scope_excludes_later_tables() {
        let schema = sample_schema();
        let options = Options::default();
        let catalog = ErrorCatalog::default();
        let g = Generator::new(&schema, &options, &catalog);
        let tables = schema.tables().to_vec();
        for seed in 0..300 {
            let mut ctx = Context::new_with_seed(seed);
            let Ok((from, joins)) = generate_joins(&g, &mut ctx, &tables) else {
                continue;
            };
            assert_eq!(from.len() + joins.len(), tables.len());
            assert!(!from.is_empty());
            for (offset, join) in joins.iter().enumerate() {
                let position = from.len() + offset;
                if let Some(on) = &join.on {
                    let text = on.to_string();
                    for later in &tables[position + 1..] {
                        assert!(!text.contains(&format!("{}.", later.name)), "{text}");
                    }
                } else {
                    assert_eq!(join.kind, JoinKind::Natural);
                }
            }
        }
    }

    #[test]
    fn test_empty_schema_aborts() {
        let schema = Schema::default();
        let options = Options::default();
        let catalog = ErrorCatalog::default();
        let g = Generator::new(&schema, &options, &catalog);
        let mut ctx = Context::new_with_seed(1);
        assert!(generate_select(&g, &mut ctx, 1).is_err());
    }
}
