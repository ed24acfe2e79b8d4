//! Populates a fresh database with random tables, rows, indexes and views.

use std::iter;

use strum::IntoEnumIterator;

use crate::ast::{Statement, StatementKind};
use crate::context::Context;
use crate::error::CheckError;
use crate::errors::ErrorCatalog;
use crate::executor::{self, Session};
use crate::generate::table::{generate_create_table, table_from_definition};
use crate::generate::{GeneratedStatement, Generator};
use crate::options::Options;
use crate::schema::Schema;

/// Attempts per CREATE TABLE before the database is given up.
pub const MAX_CREATE_TABLE_ATTEMPTS: usize = 1000;

/// Statements run after the tables exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumIter)]
pub enum Action {
    Insert,
    CreateIndex,
    Update,
    Delete,
    CreateView,
    AlterTable,
    Explain,
    Vacuum,
    Analyze,
}

impl Action {
    pub fn statement_kind(self) -> StatementKind {
        match self {
            Action::Insert => StatementKind::Insert,
            Action::CreateIndex => StatementKind::CreateIndex,
            Action::Update => StatementKind::Update,
            Action::Delete => StatementKind::Delete,
            Action::CreateView => StatementKind::CreateView,
            Action::AlterTable => StatementKind::AlterTable,
            Action::Explain => StatementKind::Explain,
            Action::Vacuum => StatementKind::Vacuum,
            Action::Analyze => StatementKind::Analyze,
        }
    }

    /// How many times this action runs for one database.
    pub fn count(self, ctx: &mut Context, options: &Options) -> usize {
        match self {
            Action::Insert => ctx.gen_range(options.max_num_inserts),
            Action::CreateIndex if !options.test_indexes => 0,
            Action::CreateIndex | Action::Update => {
                ctx.gen_range_inclusive(0, options.max_num_updates)
            }
            Action::Delete => ctx.gen_range_inclusive(0, options.max_num_deletes),
            Action::CreateView => ctx.gen_range_inclusive(0, options.max_num_views),
            Action::AlterTable | Action::Explain | Action::Vacuum | Action::Analyze => {
                ctx.gen_range(2)
            }
        }
    }
}

/// Shuffled list of every action, each repeated by its drawn count.
pub fn action_plan(ctx: &mut Context, options: &Options) -> Vec<Action> {
    let mut plan: Vec<Action> = Action::iter()
        .flat_map(|action| iter::repeat_n(action, action.count(ctx, options)))
        .collect();
    ctx.shuffle(&mut plan);
    plan
}

/// What happened while populating one database.
#[derive(Debug, Default)]
pub struct DatabaseReport {
    pub statements: usize,
    pub expected_errors: usize,
    pub aborts: usize,
    pub unexpected: Vec<CheckError>,
}

impl DatabaseReport {
    fn record(&mut self, stmt: &GeneratedStatement, result: Result<(), CheckError>) -> bool {
        self.statements += 1;
        match result {
            Ok(()) => true,
            Err(e) if e.is_reportable() => {
                tracing::warn!("unexpected error for `{stmt}`: {e}");
                self.unexpected.push(e);
                false
            }
            Err(e) => {
                tracing::trace!("{e}");
                self.expected_errors += 1;
                false
            }
        }
    }
}

/// Create one or two tables and run a random action plan against them.
///
/// Returns the schema as read back after the last statement.
pub fn generate_database<S: Session>(
    ctx: &mut Context,
    session: &mut S,
    options: &Options,
    catalog: &ErrorCatalog,
) -> anyhow::Result<(Schema, DatabaseReport)> {
    let mut report = DatabaseReport::default();
    let mut schema = session.read_schema()?;

    let table_count = ctx.gen_range_inclusive(1, 2);
    for _ in 0..table_count {
        let name = schema.free_table_name();
        let mut created = false;
        for _ in 0..MAX_CREATE_TABLE_ATTEMPTS {
            let g = Generator::new(&schema, options, catalog);
            let stmt = match generate_create_table(&g, ctx, &name) {
                Ok(stmt) => stmt,
                Err(e) => {
                    tracing::trace!("{e}");
                    report.aborts += 1;
                    continue;
                }
            };
            let result = executor::execute_statement(session, &stmt);
            if report.record(&stmt, result) {
                created = true;
                break;
            }
        }
        if !created {
            anyhow::bail!("could not create table {name} in {MAX_CREATE_TABLE_ATTEMPTS} attempts");
        }
        schema = session.read_schema()?;
    }

    for action in action_plan(ctx, options) {
        let g = Generator::new(&schema, options, catalog);
        let stmt = match g.generate(ctx, action.statement_kind()) {
            Ok(stmt) => stmt,
            Err(e) => {
                tracing::trace!("{action}: {e}");
                report.aborts += 1;
                continue;
            }
        };
        let result = executor::execute_statement(session, &stmt);
        if report.record(&stmt, result) && stmt.is_ddl() {
            schema = session.read_schema()?;
        }
    }

    tracing::debug!(
        "database ready: {} tables, {} statements, {} expected errors",
        schema.tables().len(),
        report.statements,
        report.expected_errors
    );
    Ok((schema, report))
}

/// Tables followed by `count` random statements, generated without an
/// engine.
///
/// The schema is tracked from the generated CREATE TABLE statements alone,
/// so the effect of later DDL is not visible to later statements.
pub fn generate_script(
    ctx: &mut Context,
    options: &Options,
    catalog: &ErrorCatalog,
    count: usize,
) -> Vec<GeneratedStatement> {
    let mut script = Vec::new();
    let mut tables = Vec::new();
    let mut schema = Schema::default();

    let table_count = ctx.gen_range_inclusive(1, 2);
    for _ in 0..table_count {
        let name = schema.free_table_name();
        for _ in 0..MAX_CREATE_TABLE_ATTEMPTS {
            let g = Generator::new(&schema, options, catalog);
            let Ok(stmt) = generate_create_table(&g, ctx, &name) else {
                continue;
            };
            let Statement::CreateTable(def) = &stmt.statement else {
                continue;
            };
            if let Some(table) = table_from_definition(def, &schema) {
                tables.push(table);
                schema = Schema::new(tables.clone());
                script.push(stmt);
                break;
            }
        }
    }

    let target = script.len() + count;
    let actions: Vec<Action> = Action::iter().collect();
    let g = Generator::new(&schema, options, catalog);
    while script.len() < target {
        let kind = match ctx.choose(&actions) {
            Some(action) if ctx.gen_bool() => action.statement_kind(),
            _ => StatementKind::Select,
        };
        match g.generate(ctx, kind) {
            Ok(stmt) => script.push(stmt),
            Err(e) => tracing::trace!("{kind}: {e}"),
        }
    }
    script
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::sqlite::SqliteSession;

    #[test]
    fn test_plan_respects_bounds() {
        let options = Options {
            max_num_inserts: 3,
            max_num_updates: 2,
            max_num_deletes: 1,
            max_num_views: 1,
            ..Options::default()
        };
        let mut ctx = Context::new_with_seed(42);
        for _ in 0..50 {
            let plan = action_plan(&mut ctx, &options);
            let count = |a: Action| plan.iter().filter(|&&x| x == a).count();
            assert!(count(Action::Insert) < 3);
            assert!(count(Action::Update) <= 2);
            assert!(count(Action::CreateIndex) <= 2);
            assert!(count(Action::Delete) <= 1);
            assert!(count(Action::CreateView) <= 1);
            assert!(count(Action::AlterTable) <= 1);
            assert!(count(Action::Explain) <= 1);
        }
    }

    #[test]
    fn test_no_indexes_when_disabled() {
        let options = Options::default().with_indexes(false);
        let mut ctx = Context::new_with_seed(1);
        for _ in 0..50 {
            assert!(!action_plan(&mut ctx, &options).contains(&Action::CreateIndex));
        }
    }

    #[test]
    fn test_script_without_engine() {
        let options = Options::default();
        let catalog = ErrorCatalog::default();
        let mut ctx = Context::new_with_seed(42);
        let script = generate_script(&mut ctx, &options, &catalog, 25);
        let tables = script
            .iter()
            .take_while(|s| s.statement.kind() == StatementKind::CreateTable)
            .count();
        assert!((1..=2).contains(&tables));
        assert_eq!(script.len(), tables + 25);
        assert!(script.iter().all(|s| !s.sql().is_empty()));
    }

    #[test]
    fn test_populates_sqlite() {
        let options = Options::sqlite_compatible();
        let catalog = ErrorCatalog::with_sqlite();
        let mut ctx = Context::new_with_seed(42);
        for _ in 0..5 {
            let mut session = SqliteSession::open_in_memory(Duration::from_secs(10)).unwrap();
            let (schema, report) =
                generate_database(&mut ctx, &mut session, &options, &catalog).unwrap();
            assert!(schema.base_tables().count() >= 1);
            assert!(report.statements >= 1);
            assert!(report.unexpected.is_empty(), "{:?}", report.unexpected);
        }
    }
}
