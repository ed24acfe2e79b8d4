//! Statement and query generation.
//!
//! Every generator takes the randomness source explicitly and reads its
//! configuration from a [`Generator`]. Each produced statement carries the
//! error substrings its constructs can legitimately trigger.

pub mod alter;
pub mod delete;
pub mod expr;
pub mod index;
pub mod insert;
pub mod select;
pub mod table;
pub mod update;
pub mod view;

use std::fmt;

use crate::ast::{Select, Statement, StatementKind};
use crate::context::Context;
use crate::error::GenError;
use crate::errors::{ErrorCatalog, ErrorGroup, ExpectedErrors};
use crate::options::Options;
use crate::schema::Schema;

pub use expr::{ExprCategory, ExprGenerator};

/// Read-only inputs shared by all generators for one batch.
#[derive(Debug, Clone, Copy)]
pub struct Generator<'a> {
    pub schema: &'a Schema,
    pub options: &'a Options,
    pub catalog: &'a ErrorCatalog,
}

impl<'a> Generator<'a> {
    pub fn new(schema: &'a Schema, options: &'a Options, catalog: &'a ErrorCatalog) -> Self {
        Self {
            schema,
            options,
            catalog,
        }
    }

    pub fn expr_generator(&self) -> ExprGenerator<'a> {
        ExprGenerator::new(self.options)
    }

    pub fn errors(&self, groups: &[ErrorGroup]) -> ExpectedErrors {
        self.catalog.expected(groups)
    }

    /// Generate a statement of the given kind.
    pub fn generate(
        &self,
        ctx: &mut Context,
        kind: StatementKind,
    ) -> Result<GeneratedStatement, GenError> {
        match kind {
            StatementKind::CreateTable => {
                table::generate_create_table(self, ctx, &self.schema.free_table_name())
            }
            StatementKind::AlterTable => alter::generate_alter_table(self, ctx),
            StatementKind::Insert => insert::generate_insert(self, ctx),
            StatementKind::Update => update::generate_update(self, ctx),
            StatementKind::Delete => delete::generate_delete(self, ctx),
            StatementKind::CreateIndex => index::generate_create_index(self, ctx),
            StatementKind::CreateView => view::generate_create_view(self, ctx),
            StatementKind::Explain => select::generate_explain(self, ctx),
            StatementKind::Select => {
                let count = ctx.small_number() + 1;
                let select = select::generate_select(self, ctx, count)?;
                Ok(GeneratedStatement::new(
                    Statement::Select(select),
                    self.errors(&[ErrorGroup::Expression, ErrorGroup::GroupBy]),
                ))
            }
            StatementKind::Vacuum => Ok(GeneratedStatement::new(
                Statement::Vacuum,
                ExpectedErrors::new(),
            )),
            StatementKind::Analyze => Ok(GeneratedStatement::new(
                Statement::Analyze,
                ExpectedErrors::new(),
            )),
        }
    }
}

/// A statement paired with the errors it is allowed to raise.
#[derive(Debug, Clone)]
pub struct GeneratedStatement {
    pub statement: Statement,
    pub errors: ExpectedErrors,
}

impl GeneratedStatement {
    pub fn new(statement: Statement, errors: ExpectedErrors) -> Self {
        Self { statement, errors }
    }

    pub fn sql(&self) -> String {
        self.statement.to_string()
    }

    pub fn is_ddl(&self) -> bool {
        self.statement.is_ddl()
    }

    pub fn select(&self) -> Option<&Select> {
        match &self.statement {
            Statement::Select(s) | Statement::Explain(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for GeneratedStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.statement)
    }
}


#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::test_support::sample_schema;
    use super::*;

    #[test]
    fn test_every_statement_kind_renders() {
        let schema = sample_schema();
        let options = Options::default();
        let catalog = ErrorCatalog::default();
        let generator = Generator::new(&schema, &options, &catalog);
        let mut ctx = Context::new_with_seed(42);
        for kind in StatementKind::iter() {
            let mut produced = false;
            for _ in 0..50 {
                if let Ok(stmt) = generator.generate(&mut ctx, kind) {
                    assert_eq!(stmt.statement.kind(), kind);
                    assert!(!stmt.sql().is_empty());
                    produced = true;
                    break;
                }
            }
            assert!(produced, "no {kind} statement in 50 attempts");
        }
    }

    #[test]
    fn test_empty_schema_aborts_dml() {
        let schema = Schema::default();
        let options = Options::default();
        let catalog = ErrorCatalog::default();
        let generator = Generator::new(&schema, &options, &catalog);
        let mut ctx = Context::new_with_seed(1);
        assert!(generator.generate(&mut ctx, StatementKind::Insert).is_err());
        assert!(generator.generate(&mut ctx, StatementKind::Select).is_err());
        assert!(generator.generate(&mut ctx, StatementKind::CreateTable).is_ok());
    }
}
