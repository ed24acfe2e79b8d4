//! CREATE TABLE generation.

use strum::IntoEnumIterator;

use super::{GeneratedStatement, Generator};
use crate::ast::{
    Collation, ColumnDef, ColumnFormat, ColumnOption, ColumnType, CreateTable, SqlType, Statement,
    Storage, TableBody,
};
use crate::context::Context;
use crate::error::GenError;
use crate::errors::{ErrorGroup, ExpectedErrors};
use crate::schema::{Column, Schema, Table};
use crate::types::{CompositeType, DataKind};

const INT_TYPES: &[SqlType] = &[
    SqlType::TinyInt,
    SqlType::SmallInt,
    SqlType::MediumInt,
    SqlType::Int,
    SqlType::BigInt,
];

const TEXT_TYPES: &[SqlType] = &[
    SqlType::Varchar,
    SqlType::TinyText,
    SqlType::Text,
    SqlType::MediumText,
    SqlType::LongText,
];

/// Options drawn as a random subset, in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OptionSlot {
    NullOrNotNull,
    Unique,
    Comment,
    ColumnFormat,
    Storage,
    PrimaryKey,
}

const OPTION_SLOTS: &[OptionSlot] = &[
    OptionSlot::NullOrNotNull,
    OptionSlot::Unique,
    OptionSlot::Comment,
    OptionSlot::ColumnFormat,
    OptionSlot::Storage,
    OptionSlot::PrimaryKey,
];

/// Composite type a column of this declared type reads back as.
pub fn composite_type(ty: &ColumnType) -> CompositeType {
    match ty.base {
        SqlType::TinyInt => CompositeType::new(DataKind::Integer, Some(1)),
        SqlType::SmallInt => CompositeType::new(DataKind::Integer, Some(2)),
        SqlType::MediumInt | SqlType::Int => Some(CompositeType::int()),
        SqlType::BigInt => Some(CompositeType::bigint()),
        SqlType::Float => CompositeType::new(DataKind::Float, Some(4)),
        SqlType::Double | SqlType::Decimal => Some(CompositeType::double()),
        SqlType::Boolean => Some(CompositeType::boolean()),
        SqlType::Varchar
        | SqlType::TinyText
        | SqlType::Text
        | SqlType::MediumText
        | SqlType::LongText => Some(CompositeType::text()),
    }
    .unwrap_or_else(CompositeType::text)
}

/// Random column type in the dialect's spelling.
pub fn random_column_type(ctx: &mut Context) -> ColumnType {
    let kind = DataKind::random_without_null(ctx);
    let mut ty = match kind {
        DataKind::Integer => {
            let base = INT_TYPES[ctx.gen_range(INT_TYPES.len())];
            let mut ty = ColumnType::new(base);
            if ctx.gen_bool() {
                ty.display_width = Some(ctx.gen_range_inclusive(0, 255) as u8);
            }
            ty
        }
        DataKind::Text => ColumnType::new(TEXT_TYPES[ctx.gen_range(TEXT_TYPES.len())]),
        DataKind::Boolean => ColumnType::new(SqlType::Boolean),
        DataKind::Float => with_precision(ctx, ColumnType::new(SqlType::Float)),
        DataKind::Double => {
            let base = if ctx.gen_bool() {
                SqlType::Double
            } else {
                SqlType::Float
            };
            with_precision(ctx, ColumnType::new(base))
        }
        DataKind::Decimal | DataKind::Null => with_precision(ctx, ColumnType::new(SqlType::Decimal)),
    };
    if kind.is_numeric() {
        ty.unsigned = kind != DataKind::Integer && ctx.gen_bool();
        ty.zerofill = ctx.gen_bool();
    }
    ty
}

/// Optionally add `(M, D)` with M in 1..=65 and D in 1..=min(30, M).
fn with_precision(ctx: &mut Context, mut ty: ColumnType) -> ColumnType {
    if ctx.gen_bool() {
        let m = ctx.gen_range_inclusive(1, 65);
        let d = ctx.gen_range_inclusive(1, 30).min(m);
        ty.precision = Some((m as u8, d as u8));
    }
    ty
}

/// Generate `CREATE TABLE name ...`.
pub fn generate_create_table(
    g: &Generator<'_>,
    ctx: &mut Context,
    name: &str,
) -> Result<GeneratedStatement, GenError> {
    let mut errors = g.errors(&[ErrorGroup::CreateTable]);
    let if_not_exists = ctx.gen_bool();

    if g.options.test_create_table_like && ctx.gen_bool() && !g.schema.is_empty() {
        let source = g.schema.random_table(ctx, |_| true)?;
        let stmt = CreateTable {
            name: name.to_string(),
            if_not_exists,
            body: TableBody::Like(source.name.clone()),
        };
        return Ok(GeneratedStatement::new(Statement::CreateTable(stmt), errors));
    }

    let count = ctx.small_number() + 1;
    let types: Vec<ColumnType> = (0..count)
        .map(|_| {
            let mut ty = random_column_type(ctx);
            if !g.options.test_numeric_attributes {
                ty.unsigned = false;
                ty.zerofill = false;
            }
            ty
        })
        .collect();
    let scope: Vec<Column> = types
        .iter()
        .enumerate()
        .map(|(i, ty)| {
            let mut column = Column::new(format!("c{i}"), composite_type(ty));
            column.table = name.to_string();
            column
        })
        .collect();

    let mut builder = ColumnBuilder {
        g,
        scope,
        allow_primary_key: ctx.gen_bool(),
        has_primary_key: false,
        errors: &mut errors,
    };
    let mut columns = Vec::with_capacity(count);
    for (i, ty) in types.into_iter().enumerate() {
        columns.push(builder.build(ctx, format!("c{i}"), ty)?);
    }

    let mut primary_key = Vec::new();
    if g.options.test_indexes && !builder.has_primary_key && ctx.gen_bool() {
        let candidates: Vec<String> = columns
            .iter()
            .filter(|c| !c.is_marked_null())
            .map(|c| c.name.clone())
            .collect();
        primary_key = ctx.non_empty_subset(&candidates);
    }

    let stmt = CreateTable {
        name: name.to_string(),
        if_not_exists,
        body: TableBody::Columns {
            columns,
            primary_key,
        },
    };
    Ok(GeneratedStatement::new(Statement::CreateTable(stmt), errors))
}

struct ColumnBuilder<'g, 'e> {
    g: &'g Generator<'g>,
    /// Columns of the table being created, for CHECK expressions.
    scope: Vec<Column>,
    allow_primary_key: bool,
    has_primary_key: bool,
    errors: &'e mut ExpectedErrors,
}

impl ColumnBuilder<'_, '_> {
    fn build(
        &mut self,
        ctx: &mut Context,
        name: String,
        ty: ColumnType,
    ) -> Result<ColumnDef, GenError> {
        let options = self.g.options;
        let keyable = !matches!(ty.kind(), DataKind::Text | DataKind::Boolean);
        let mut out: Vec<ColumnOption> = Vec::new();
        let mut marked_null = false;

        for slot in ctx.subset(OPTION_SLOTS) {
            match slot {
                OptionSlot::NullOrNotNull => {
                    if ctx.gen_bool() {
                        out.push(ColumnOption::Null);
                        marked_null = true;
                    } else if options.test_not_null_constraints {
                        out.push(ColumnOption::NotNull);
                    }
                }
                OptionSlot::Unique if keyable && options.test_indexes => {
                    let key = options.test_unique_key && ctx.gen_bool();
                    out.push(ColumnOption::Unique { key });
                }
                OptionSlot::Comment if options.test_engine_column_options => {
                    out.push(ColumnOption::Comment("asdf".to_string()));
                }
                OptionSlot::ColumnFormat if options.test_engine_column_options => {
                    let formats: Vec<ColumnFormat> = ColumnFormat::iter().collect();
                    out.push(ColumnOption::ColumnFormat(formats[ctx.gen_range(formats.len())]));
                }
                OptionSlot::Storage if options.test_engine_column_options => {
                    let storages: Vec<Storage> = Storage::iter().collect();
                    out.push(ColumnOption::Storage(storages[ctx.gen_range(storages.len())]));
                }
                OptionSlot::PrimaryKey
                    if keyable
                        && options.test_indexes
                        && self.allow_primary_key
                        && !self.has_primary_key
                        && !marked_null =>
                {
                    out.push(ColumnOption::PrimaryKey);
                    self.has_primary_key = true;
                }
                _ => {}
            }
        }

        if options.test_collate && ty.kind() == DataKind::Text && ctx.low_probability() {
            let collations: Vec<Collation> = Collation::iter().collect();
            out.push(ColumnOption::Collate(collations[ctx.gen_range(collations.len())]));
        }
        if options.test_indexes
            && keyable
            && ctx.low_probability()
            && !out.iter().any(|o| matches!(o, ColumnOption::Unique { .. }))
        {
            out.push(ColumnOption::Unique { key: false });
        }
        if options.test_not_null_constraints
            && ctx.low_probability()
            && !marked_null
            && !out.contains(&ColumnOption::NotNull)
        {
            out.push(ColumnOption::NotNull);
        }
        if options.test_check_constraints && ctx.low_probability() {
            let mut exprs = self.g.expr_generator().with_columns(self.scope.clone());
            let check = exprs.generate_expression(ctx)?;
            self.g.catalog.add_to(ErrorGroup::Expression, self.errors);
            out.push(ColumnOption::Check(check));
        }
        if options.test_default_values && ctx.gen_bool() {
            let default = self.g.expr_generator().generate_constant(ctx)?;
            out.push(ColumnOption::Default(default));
        }

        Ok(ColumnDef {
            name,
            ty,
            options: out,
        })
    }
}

/// The table a successful CREATE TABLE leaves behind, for runs that do not
/// read the schema back from an engine.
pub fn table_from_definition(stmt: &CreateTable, schema: &Schema) -> Option<Table> {
    let columns = match &stmt.body {
        TableBody::Like(source) => schema
            .get_table(source)?
            .declared_columns()
            .cloned()
            .collect(),
        TableBody::Columns {
            columns,
            primary_key,
        } => columns
            .iter()
            .map(|def| {
                let column = Column::new(def.name.clone(), composite_type(&def.ty));
                if def.is_primary_key() || primary_key.contains(&def.name) {
                    column.primary_key()
                } else if def.is_not_null() {
                    column.not_null()
                } else {
                    column
                }
            })
            .collect(),
    };
    Some(Table::new(stmt.name.clone(), columns).with_rowid())
}
