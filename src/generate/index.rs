//! CREATE INDEX generation.

use super::{GeneratedStatement, Generator};
use crate::ast::{CreateIndex, Order, Statement};
use crate::context::Context;
use crate::error::GenError;
use crate::errors::ErrorGroup;

/// Index names are drawn from a small fixed pool since existing indexes
/// are not part of the schema snapshot.
const INDEX_NAMES: &[&str] = &["i0", "i1", "i2", "i3", "i4"];

pub fn generate_create_index(
    g: &Generator<'_>,
    ctx: &mut Context,
) -> Result<GeneratedStatement, GenError> {
    let mut errors = g.errors(&[ErrorGroup::CreateIndex]);
    let unique = ctx.gen_bool();
    if unique {
        g.catalog.add_to(ErrorGroup::UniqueIndex, &mut errors);
    }
    let name = INDEX_NAMES[ctx.gen_range(INDEX_NAMES.len())].to_string();
    let table = g.schema.random_base_table(ctx)?;

    let columns = table
        .random_non_empty_column_subset(ctx)
        .into_iter()
        .map(|c| {
            let order = if ctx.low_probability() {
                Some(if ctx.gen_bool() { Order::Asc } else { Order::Desc })
            } else {
                None
            };
            (c.name, order)
        })
        .collect::<Vec<_>>();
    if columns.is_empty() {
        return Err(GenError::exhausted("create index", "table has no declared columns"));
    }

    let where_clause = if ctx.gen_bool() {
        g.catalog.add_to(ErrorGroup::Expression, &mut errors);
        let mut exprs = g.expr_generator().with_columns(table.columns.clone());
        Some(exprs.generate_expression(ctx)?)
    } else {
        None
    };
    if g.options.test_rowid {
        g.catalog.add_to(ErrorGroup::Rowid, &mut errors);
    }

    let stmt = CreateIndex {
        unique,
        name,
        table: table.name.clone(),
        columns,
        where_clause,
    };
    Ok(GeneratedStatement::new(Statement::CreateIndex(stmt), errors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCatalog;
    use crate::generate::test_support::sample_schema;
    use crate::options::Options;

    #[test]
    fn test_index_shape_and_errors() {
        let schema = sample_schema();
        let options = Options::default();
        let catalog = ErrorCatalog::default();
        let g = Generator::new(&schema, &options, &catalog);
        let mut ctx = Context::new_with_seed(42);
        let mut saw_unique = false;
        for _ in 0..200 {
            let Ok(stmt) = generate_create_index(&g, &mut ctx) else {
                continue;
            };
            let Statement::CreateIndex(index) = &stmt.statement else {
                panic!("not a CREATE INDEX");
            };
            assert!(INDEX_NAMES.contains(&index.name.as_str()));
            assert!(!index.columns.is_empty());
            assert!(stmt.errors.errors_match("already exists!"));
            assert!(stmt.errors.errors_match("Cannot create an index on the rowid!"));
            if index.unique {
                saw_unique = true;
                assert!(stmt.errors.errors_match("contains duplicate data"));
            }
        }
        assert!(saw_unique);
    }

    #[test]
    fn test_rowid_error_follows_option() {
        let schema = sample_schema();
        let options = Options::default().with_rowid(false);
        let catalog = ErrorCatalog::default();
        let g = Generator::new(&schema, &options, &catalog);
        let mut ctx = Context::new_with_seed(5);
        for _ in 0..50 {
            if let Ok(stmt) = generate_create_index(&g, &mut ctx) {
                assert!(!stmt.errors.errors_match("Cannot create an index on the rowid!"));
            }
        }
    }
}
