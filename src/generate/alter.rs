//! ALTER TABLE generation.

use super::{GeneratedStatement, Generator};
use crate::ast::{AlterAction, AlterTable, Statement};
use crate::context::Context;
use crate::error::GenError;
use crate::errors::ErrorGroup;
use crate::types::CompositeType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    AddColumn,
    AlterColumn,
    DropColumn,
}

const ACTIONS: &[Action] = &[Action::AddColumn, Action::AlterColumn, Action::DropColumn];

/// ADD COLUMN, ALTER COLUMN ... SET DATA TYPE or DROP COLUMN on a base table.
pub fn generate_alter_table(
    g: &Generator<'_>,
    ctx: &mut Context,
) -> Result<GeneratedStatement, GenError> {
    let mut errors = g.errors(&[ErrorGroup::AlterAddColumn]);
    let table = g.schema.random_base_table(ctx)?;
    let actions: Vec<Action> = ACTIONS
        .iter()
        .copied()
        .filter(|a| *a != Action::AlterColumn || g.options.test_alter_column_type)
        .collect();
    let action = actions[ctx.gen_range(actions.len())];

    let action = match action {
        Action::AddColumn => AlterAction::AddColumn {
            name: table.free_column_name(),
            ty: CompositeType::random_without_null(ctx).spell(ctx),
        },
        Action::AlterColumn => {
            let column = table.random_column(ctx)?.name.clone();
            let ty = CompositeType::random_without_null(ctx).spell(ctx);
            let using = if ctx.gen_bool() {
                g.catalog.add_to(ErrorGroup::Expression, &mut errors);
                let mut exprs = g.expr_generator().with_columns(table.columns.clone());
                Some(exprs.generate_expression(ctx)?)
            } else {
                None
            };
            g.catalog.add_to(ErrorGroup::AlterColumnType, &mut errors);
            AlterAction::AlterColumnType { column, ty, using }
        }
        Action::DropColumn => {
            let column = table.random_column(ctx)?.name.clone();
            g.catalog.add_to(ErrorGroup::AlterDropColumn, &mut errors);
            AlterAction::DropColumn { column }
        }
    };

    let stmt = AlterTable {
        table: table.name.clone(),
        action,
    };
    Ok(GeneratedStatement::new(Statement::AlterTable(stmt), errors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCatalog;
    use crate::generate::test_support::sample_schema;
    use crate::options::Options;

    #[test]
    fn test_targets_base_tables_only() {
        let schema = sample_schema();
        let options = Options::default();
        let catalog = ErrorCatalog::default();
        let g = Generator::new(&schema, &options, &catalog);
        let mut ctx = Context::new_with_seed(42);
        for _ in 0..200 {
            let Ok(stmt) = generate_alter_table(&g, &mut ctx) else {
                continue;
            };
            let Statement::AlterTable(alter) = &stmt.statement else {
                panic!("not an ALTER TABLE");
            };
            assert_ne!(alter.table, "v0");
            assert!(stmt.errors.errors_match("Table does not contain column rowid"));
        }
    }

    #[test]
    fn test_action_specific_errors() {
        let schema = sample_schema();
        let options = Options::default();
        let catalog = ErrorCatalog::default();
        let g = Generator::new(&schema, &options, &catalog);
        let mut ctx = Context::new_with_seed(7);
        let (mut adds, mut alters, mut drops) = (0, 0, 0);
        for _ in 0..300 {
            let Ok(stmt) = generate_alter_table(&g, &mut ctx) else {
                continue;
            };
            let Statement::AlterTable(alter) = &stmt.statement else {
                continue;
            };
            match &alter.action {
                AlterAction::AddColumn { name, .. } => {
                    adds += 1;
                    assert!(!schema.get_table(&alter.table).unwrap().has_column(name));
                }
                AlterAction::AlterColumnType { .. } => {
                    alters += 1;
                    assert!(stmt.errors.errors_match("Unimplemented type for cast"));
                }
                AlterAction::DropColumn { .. } => {
                    drops += 1;
                    assert!(stmt.errors.errors_match("table only has one column remaining"));
                }
            }
        }
        assert!(adds > 0 && alters > 0 && drops > 0);
    }

    #[test]
    fn test_sqlite_profile_skips_column_type_changes() {
        let schema = sample_schema();
        let options = Options::sqlite_compatible();
        let catalog = ErrorCatalog::with_sqlite();
        let g = Generator::new(&schema, &options, &catalog);
        let mut ctx = Context::new_with_seed(7);
        for _ in 0..300 {
            let Ok(stmt) = generate_alter_table(&g, &mut ctx) else {
                continue;
            };
            let Statement::AlterTable(alter) = &stmt.statement else {
                panic!("not an ALTER TABLE");
            };
            assert!(!matches!(alter.action, AlterAction::AlterColumnType { .. }));
        }
    }
}
