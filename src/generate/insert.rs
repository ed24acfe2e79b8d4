//! INSERT generation.

use super::{GeneratedStatement, Generator};
use crate::ast::{Insert, InsertValue, Statement};
use crate::context::Context;
use crate::error::GenError;
use crate::errors::ErrorGroup;

/// INSERT of one or more rows into a random base table.
pub fn generate_insert(
    g: &Generator<'_>,
    ctx: &mut Context,
) -> Result<GeneratedStatement, GenError> {
    let table = g.schema.random_base_table(ctx)?;
    let columns = table.random_non_empty_column_subset(ctx);
    if columns.is_empty() {
        return Err(GenError::exhausted("insert", "table has no declared columns")
            .with_context(format!("table {}", table.name)));
    }

    let exprs = g.expr_generator();
    let row_count = ctx.small_number() + 1;
    let mut rows = Vec::with_capacity(row_count);
    for _ in 0..row_count {
        let mut row = Vec::with_capacity(columns.len());
        for _ in &columns {
            if g.options.test_insert_default && ctx.low_probability() {
                row.push(InsertValue::Default);
            } else {
                row.push(InsertValue::Constant(exprs.generate_constant(ctx)?));
            }
        }
        rows.push(row);
    }

    let stmt = Insert {
        table: table.name.clone(),
        columns: columns.into_iter().map(|c| c.name).collect(),
        rows,
    };
    // CHECK constraints and partial index predicates see the new row.
    Ok(GeneratedStatement::new(
        Statement::Insert(stmt),
        g.errors(&[ErrorGroup::Insert, ErrorGroup::Expression]),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCatalog;
    use crate::generate::test_support::sample_schema;
    use crate::options::Options;
    use crate::schema::ROWID;

    #[test]
    fn test_rows_match_column_list() {
        let schema = sample_schema();
        let options = Options::default();
        let catalog = ErrorCatalog::default();
        let g = Generator::new(&schema, &options, &catalog);
        let mut ctx = Context::new_with_seed(42);
        let mut saw_default = false;
        for _ in 0..300 {
            let Ok(stmt) = generate_insert(&g, &mut ctx) else {
                continue;
            };
            let Statement::Insert(insert) = &stmt.statement else {
                panic!("not an INSERT");
            };
            assert!(!insert.columns.is_empty());
            assert!(!insert.columns.iter().any(|c| c == ROWID));
            assert_ne!(insert.table, "v0");
            for row in &insert.rows {
                assert_eq!(row.len(), insert.columns.len());
                saw_default |= row.contains(&InsertValue::Default);
            }
            assert!(stmt.errors.errors_match("Duplicate entry"));
            assert!(stmt.errors.errors_match("Division by zero"));
        }
        assert!(saw_default);
    }

    #[test]
    fn test_sqlite_profile_never_inserts_default() {
        let schema = sample_schema();
        let options = Options::sqlite_compatible();
        let catalog = ErrorCatalog::with_sqlite();
        let g = Generator::new(&schema, &options, &catalog);
        let mut ctx = Context::new_with_seed(42);
        for _ in 0..300 {
            let Ok(stmt) = generate_insert(&g, &mut ctx) else {
                continue;
            };
            let Statement::Insert(insert) = &stmt.statement else {
                panic!("not an INSERT");
            };
            assert!(insert.rows.iter().flatten().all(|v| *v != InsertValue::Default));
        }
    }

    #[test]
    fn test_disabled_constants_abort() {
        let schema = sample_schema();
        let options = Options::default().with_all_constants(false);
        let catalog = ErrorCatalog::default();
        let g = Generator::new(&schema, &options, &catalog);
        let mut ctx = Context::new_with_seed(1);
        let aborted = (0..100)
            .filter(|_| generate_insert(&g, &mut ctx).is_err())
            .count();
        assert!(aborted > 50);
    }
}
