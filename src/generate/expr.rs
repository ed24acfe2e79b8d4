//! Expression generation.

use strum::IntoEnumIterator;

use crate::ast::{BinaryOp, Collation, Expr, Order, PostfixOp, PrefixOp};
use crate::constant::Constant;
use crate::context::Context;
use crate::error::GenError;
use crate::functions::{AGGREGATE_FUNCTIONS, FunctionDef, SCALAR_FUNCTIONS};
use crate::options::Options;
use crate::schema::Column;
use crate::types::{CompositeType, DataKind};

/// Non-leaf expression categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumIter)]
pub enum ExprCategory {
    UnaryPostfix,
    UnaryPrefix,
    BinaryComparison,
    BinaryLogical,
    BinaryArithmetic,
    Cast,
    Function,
    Between,
    Case,
    In,
    Collate,
    LikeEscape,
}

impl ExprCategory {
    /// Whether the options allow this category.
    pub fn enabled(self, options: &Options) -> bool {
        match self {
            ExprCategory::Collate => options.test_collate,
            ExprCategory::Function => options.test_functions,
            ExprCategory::Cast => options.test_casts,
            ExprCategory::Between => options.test_between,
            ExprCategory::In => options.test_in,
            ExprCategory::Case => options.test_case,
            ExprCategory::BinaryComparison => options.test_binary_comparisons,
            ExprCategory::BinaryLogical => options.test_binary_logicals,
            ExprCategory::UnaryPostfix
            | ExprCategory::UnaryPrefix
            | ExprCategory::BinaryArithmetic
            | ExprCategory::LikeEscape => true,
        }
    }
}

/// Kinds a random constant is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConstantChoice {
    Data(DataKind),
    Date,
    Timestamp,
}

/// Depth-bounded random expression generator over a fixed column scope.
#[derive(Debug, Clone)]
pub struct ExprGenerator<'a> {
    options: &'a Options,
    columns: Vec<Column>,
    /// Scope inside aggregate arguments when it is wider than `columns`.
    aggregate_columns: Option<Vec<Column>>,
    allow_aggregates: bool,
}

impl<'a> ExprGenerator<'a> {
    pub fn new(options: &'a Options) -> Self {
        Self {
            options,
            columns: Vec::new(),
            aggregate_columns: None,
            allow_aggregates: false,
        }
    }

    /// Set the in-scope columns. The synthesized rowid is only kept when
    /// rowid testing is enabled.
    pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = self.visible(columns);
        self
    }

    /// Let aggregate arguments see `columns` while other leaves keep the
    /// narrower scope, as HAVING over grouping keys requires.
    pub fn with_aggregate_columns(mut self, columns: Vec<Column>) -> Self {
        self.aggregate_columns = Some(self.visible(columns));
        self
    }

    fn visible(&self, columns: Vec<Column>) -> Vec<Column> {
        let test_rowid = self.options.test_rowid;
        columns
            .into_iter()
            .filter(|c| test_rowid || !c.is_rowid)
            .collect()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn generate_expression(&mut self, ctx: &mut Context) -> Result<Expr, GenError> {
        self.generate_expression_at(ctx, 0)
    }

    pub fn generate_expressions(
        &mut self,
        ctx: &mut Context,
        count: usize,
        depth: usize,
    ) -> Result<Vec<Expr>, GenError> {
        (0..count)
            .map(|_| self.generate_expression_at(ctx, depth))
            .collect()
    }

    pub fn generate_expression_at(
        &mut self,
        ctx: &mut Context,
        depth: usize,
    ) -> Result<Expr, GenError> {
        if depth >= self.options.max_expression_depth || ctx.gen_bool() {
            return self.generate_leaf(ctx);
        }
        if self.allow_aggregates && ctx.gen_bool() {
            self.allow_aggregates = false;
            return self.generate_aggregate_at(ctx, depth);
        }

        let candidates: Vec<ExprCategory> = ExprCategory::iter()
            .filter(|c| c.enabled(self.options))
            .collect();
        let category = *ctx
            .choose(&candidates)
            .ok_or_else(|| GenError::exhausted("expression", "no expression category enabled"))?;

        self.dispatch(ctx, depth, category)
    }

    fn dispatch(
        &mut self,
        ctx: &mut Context,
        depth: usize,
        category: ExprCategory,
    ) -> Result<Expr, GenError> {
        let child = depth + 1;
        match category {
            ExprCategory::Collate => {
                let collation = pick(ctx, Collation::iter())?;
                Ok(Expr::collate(self.generate_expression_at(ctx, child)?, collation))
            }
            ExprCategory::UnaryPrefix => {
                let op = pick(ctx, PrefixOp::iter())?;
                Ok(Expr::prefix(op, self.generate_expression_at(ctx, child)?))
            }
            ExprCategory::UnaryPostfix => {
                let op = pick(ctx, PostfixOp::iter())?;
                Ok(Expr::postfix(op, self.generate_expression_at(ctx, child)?))
            }
            ExprCategory::BinaryComparison => {
                let regex = self.options.test_regex_operators;
                let ops: Vec<BinaryOp> = BinaryOp::comparison()
                    .iter()
                    .copied()
                    .filter(|op| regex || !op.is_regex())
                    .collect();
                self.generate_binary(ctx, child, &ops)
            }
            ExprCategory::BinaryLogical => self.generate_binary(ctx, child, BinaryOp::logical()),
            ExprCategory::BinaryArithmetic => self.generate_binary(ctx, child, BinaryOp::arithmetic()),
            ExprCategory::Cast => {
                let expr = self.generate_expression_at(ctx, child)?;
                let target = CompositeType::random_without_null(ctx).spell(ctx);
                Ok(Expr::cast(expr, target))
            }
            ExprCategory::Function => {
                let def = ctx
                    .choose(SCALAR_FUNCTIONS)
                    .ok_or_else(|| GenError::exhausted("function", "empty function catalog"))?;
                self.generate_call(ctx, def, child)
            }
            ExprCategory::Between => {
                let expr = self.generate_expression_at(ctx, child)?;
                let low = self.generate_expression_at(ctx, child)?;
                let high = self.generate_expression_at(ctx, child)?;
                Ok(Expr::between(expr, low, high, ctx.gen_bool()))
            }
            ExprCategory::In => {
                let expr = self.generate_expression_at(ctx, child)?;
                let count = ctx.small_number() + 1;
                let list = self.generate_expressions(ctx, count, child)?;
                Ok(Expr::in_list(expr, list, ctx.gen_bool()))
            }
            ExprCategory::Case => {
                let operand = self.generate_expression_at(ctx, child)?;
                let count = ctx.small_number() + 1;
                let conditions = self.generate_expressions(ctx, count, child)?;
                let results = self.generate_expressions(ctx, count, child)?;
                let else_expr = self.generate_expression_at(ctx, child)?;
                let whens = conditions.into_iter().zip(results).collect();
                Ok(Expr::case(operand, whens, else_expr))
            }
            ExprCategory::LikeEscape => {
                let expr = self.generate_expression_at(ctx, child)?;
                let pattern = self.generate_expression_at(ctx, child)?;
                let escape = self.generate_expression_at(ctx, child)?;
                Ok(Expr::like_escape(expr, pattern, escape))
            }
        }
    }

    fn generate_binary(
        &mut self,
        ctx: &mut Context,
        depth: usize,
        ops: &[BinaryOp],
    ) -> Result<Expr, GenError> {
        let op = *ctx
            .choose(ops)
            .ok_or_else(|| GenError::exhausted("binary operator", "empty operator set"))?;
        let left = self.generate_expression_at(ctx, depth)?;
        let right = self.generate_expression_at(ctx, depth)?;
        Ok(Expr::binary(left, op, right))
    }

    fn generate_call(
        &mut self,
        ctx: &mut Context,
        def: &FunctionDef,
        depth: usize,
    ) -> Result<Expr, GenError> {
        let count = def.arg_count(ctx);
        let args = self.generate_expressions(ctx, count, depth)?;
        Ok(Expr::call(def, args))
    }

    /// Column reference or constant.
    pub fn generate_leaf(&mut self, ctx: &mut Context) -> Result<Expr, GenError> {
        if !self.columns.is_empty() && ctx.gen_bool() {
            self.generate_column(ctx)
        } else {
            self.generate_constant(ctx).map(Expr::constant)
        }
    }

    pub fn generate_column(&mut self, ctx: &mut Context) -> Result<Expr, GenError> {
        ctx.choose(&self.columns)
            .map(Expr::column)
            .ok_or_else(|| GenError::exhausted("column reference", "no columns in scope"))
    }

    /// Random constant; NULL with small probability.
    ///
    /// Drawing a kind the options disable aborts the attempt instead of
    /// falling back to another kind.
    pub fn generate_constant(&self, ctx: &mut Context) -> Result<Constant, GenError> {
        if ctx.small_probability() {
            return Ok(Constant::Null);
        }
        let choices: Vec<ConstantChoice> = DataKind::non_null()
            .map(ConstantChoice::Data)
            .chain([ConstantChoice::Date, ConstantChoice::Timestamp])
            .collect();
        let choice = *ctx
            .choose(&choices)
            .ok_or_else(|| GenError::exhausted("constant", "no constant kinds"))?;
        let o = self.options;
        match choice {
            ConstantChoice::Data(DataKind::Integer) => {
                require(o.test_int_constants, "INTEGER")?;
                if o.test_bit_constants && ctx.small_probability() {
                    Ok(Constant::Bit(ctx.gen_integer()))
                } else {
                    Ok(Constant::Int(ctx.gen_integer()))
                }
            }
            ConstantChoice::Data(DataKind::Text) => {
                require(o.test_string_constants, "VARCHAR")?;
                Ok(Constant::Text(ctx.gen_string()))
            }
            ConstantChoice::Data(DataKind::Boolean) => {
                require(o.test_boolean_constants, "BOOLEAN")?;
                Ok(Constant::Boolean(ctx.gen_bool()))
            }
            ConstantChoice::Data(DataKind::Double | DataKind::Float | DataKind::Decimal) => {
                require(o.test_float_constants, "FLOAT")?;
                Ok(Constant::Double(ctx.gen_double()))
            }
            ConstantChoice::Date => {
                require(o.test_date_constants, "DATE")?;
                let ms = ctx.gen_epoch_millis();
                Constant::date_from_millis(ms)
                    .ok_or_else(|| GenError::exhausted("constant", "date out of range"))
            }
            ConstantChoice::Timestamp => {
                require(o.test_timestamp_constants, "TIMESTAMP")?;
                let ms = ctx.gen_epoch_millis();
                Constant::timestamp_from_millis(ms)
                    .ok_or_else(|| GenError::exhausted("constant", "timestamp out of range"))
            }
            ConstantChoice::Data(DataKind::Null) => Ok(Constant::Null),
        }
    }

    /// ORDER BY list; each item is independently wrapped in ASC/DESC.
    pub fn generate_order_bys(&mut self, ctx: &mut Context) -> Result<Vec<Expr>, GenError> {
        let count = ctx.small_number() + 1;
        let exprs = self.generate_expressions(ctx, count, 0)?;
        let mut out = Vec::with_capacity(exprs.len());
        for expr in exprs {
            if ctx.gen_bool() {
                let order = pick(ctx, Order::iter())?;
                out.push(Expr::ordering(expr, Some(order)));
            } else {
                out.push(expr);
            }
        }
        Ok(out)
    }

    /// Predicate for a HAVING clause; it may contain one aggregate call.
    pub fn generate_having(&mut self, ctx: &mut Context) -> Result<Expr, GenError> {
        self.allow_aggregates = true;
        let expr = self.generate_expression(ctx);
        self.allow_aggregates = false;
        expr
    }

    /// One aggregate call whose arguments contain no aggregate.
    pub fn generate_aggregate(&mut self, ctx: &mut Context) -> Result<Expr, GenError> {
        let saved = std::mem::replace(&mut self.allow_aggregates, false);
        let expr = self.generate_aggregate_at(ctx, 0);
        self.allow_aggregates = saved;
        expr
    }

    fn generate_aggregate_at(&mut self, ctx: &mut Context, depth: usize) -> Result<Expr, GenError> {
        let def = ctx
            .choose(AGGREGATE_FUNCTIONS)
            .ok_or_else(|| GenError::exhausted("aggregate", "empty aggregate catalog"))?;
        let Some(scope) = self.aggregate_columns.clone() else {
            return self.generate_call(ctx, def, depth + 1);
        };
        let outer = std::mem::replace(&mut self.columns, scope);
        let call = self.generate_call(ctx, def, depth + 1);
        self.columns = outer;
        call
    }
}

fn require(enabled: bool, kind: &str) -> Result<(), GenError> {
    if enabled {
        Ok(())
    } else {
        Err(GenError::constant_disabled(kind))
    }
}

fn pick<T: Copy>(ctx: &mut Context, items: impl Iterator<Item = T>) -> Result<T, GenError> {
    let items: Vec<T> = items.collect();
    ctx.choose(&items)
        .copied()
        .ok_or_else(|| GenError::exhausted("operator", "empty operator set"))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::ast::ExprKind;
    use crate::error::GenErrorKind;
    use crate::schema::Table;

    fn columns() -> Vec<Column> {
        Table::new(
            "t0",
            vec![
                Column::new("c0", CompositeType::int()),
                Column::new("c1", CompositeType::text()),
            ],
        )
        .with_rowid()
        .columns
    }

    #[test]
    fn test_depth_is_bounded() {
        let options = Options::default().with_max_expression_depth(3);
        let mut ctx = Context::new_with_seed(42);
        let mut generator = ExprGenerator::new(&options).with_columns(columns());
        let mut generated = 0;
        for _ in 0..500 {
            if let Ok(expr) = generator.generate_expression(&mut ctx) {
                assert!(expr.depth() <= 3, "too deep: {expr}");
                generated += 1;
            }
        }
        assert!(generated > 0);
    }

    #[test]
    fn test_no_aggregates_outside_having() {
        let options = Options::default();
        let mut ctx = Context::new_with_seed(7);
        let mut generator = ExprGenerator::new(&options).with_columns(columns());
        for _ in 0..300 {
            if let Ok(expr) = generator.generate_expression(&mut ctx) {
                assert!(!expr.contains_aggregate(), "{expr}");
            }
        }
    }

    #[test]
    fn test_having_never_nests_aggregates() {
        let options = Options::default().with_max_expression_depth(5);
        let mut ctx = Context::new_with_seed(9);
        let mut generator = ExprGenerator::new(&options).with_columns(columns());
        let mut saw_aggregate = false;
        for _ in 0..500 {
            let Ok(expr) = generator.generate_having(&mut ctx) else {
                continue;
            };
            saw_aggregate |= expr.contains_aggregate();
            assert!(count_aggregates(&expr) <= 1, "{expr}");
        }
        assert!(saw_aggregate);
    }

    #[test]
    fn test_having_leaves_outside_aggregates_use_keys() {
        let options = Options::default().with_max_expression_depth(4);
        let all = columns();
        let keys = vec![all[0].clone()];
        let mut ctx = Context::new_with_seed(21);
        let mut generator = ExprGenerator::new(&options)
            .with_columns(keys)
            .with_aggregate_columns(all);
        let mut saw_wide_aggregate = false;
        for _ in 0..500 {
            let Ok(expr) = generator.generate_having(&mut ctx) else {
                continue;
            };
            let mut outside = Vec::new();
            let mut inside = Vec::new();
            collect_columns(&expr, false, &mut outside, &mut inside);
            assert!(outside.iter().all(|c| c == "c0"), "{expr}");
            saw_wide_aggregate |= inside.iter().any(|c| c != "c0");
        }
        assert!(saw_wide_aggregate);
        assert_eq!(generator.columns().len(), 1);
    }

    fn collect_columns(
        expr: &Expr,
        in_aggregate: bool,
        outside: &mut Vec<String>,
        inside: &mut Vec<String>,
    ) {
        let in_aggregate = in_aggregate
            || matches!(expr, Expr::Function(f) if f.is_aggregate());
        if let Expr::Column(c) = expr {
            if in_aggregate {
                inside.push(c.column.clone());
            } else {
                outside.push(c.column.clone());
            }
        }
        for child in expr.children() {
            collect_columns(child, in_aggregate, outside, inside);
        }
    }

    fn count_aggregates(expr: &Expr) -> usize {
        let own = match expr {
            Expr::Function(f) if f.is_aggregate() => 1,
            _ => 0,
        };
        own + expr.children().iter().map(|c| count_aggregates(c)).sum::<usize>()
    }

    #[test]
    fn test_disabled_categories_never_appear() {
        let options = Options::default()
            .with_max_expression_depth(4)
            .with_casts(false)
            .with_functions(false)
            .with_collate(false);
        let mut ctx = Context::new_with_seed(5);
        let mut generator = ExprGenerator::new(&options).with_columns(columns());
        for _ in 0..300 {
            if let Ok(expr) = generator.generate_expression(&mut ctx) {
                assert!(!contains_kind(&expr, ExprKind::Cast), "{expr}");
                assert!(!contains_kind(&expr, ExprKind::Collate), "{expr}");
                assert!(!contains_kind(&expr, ExprKind::Function), "{expr}");
            }
        }
    }

    #[test]
    fn test_sqlite_profile_skips_dialect_operators() {
        let options = Options::sqlite_compatible().with_max_expression_depth(4);
        let mut ctx = Context::new_with_seed(9);
        let mut generator = ExprGenerator::new(&options).with_columns(columns());
        let mut generated = 0;
        for _ in 0..500 {
            if let Ok(expr) = generator.generate_expression(&mut ctx) {
                assert!(!uses_dialect_syntax(&expr), "{expr}");
                generated += 1;
            }
        }
        assert!(generated > 0);
    }

    fn uses_dialect_syntax(expr: &Expr) -> bool {
        let own = match expr {
            Expr::Binary(b) => b.op.is_regex(),
            Expr::Constant(Constant::Bit(_)) => true,
            _ => false,
        };
        own || expr.children().iter().any(|c| uses_dialect_syntax(c))
    }

    fn contains_kind(expr: &Expr, kind: ExprKind) -> bool {
        expr.kind() == kind || expr.children().iter().any(|c| contains_kind(c, kind))
    }

    #[test]
    fn test_disabled_constant_aborts() {
        let options = Options::default().with_all_constants(false);
        let generator = ExprGenerator::new(&options);
        let mut ctx = Context::new_with_seed(3);
        let mut aborted = 0;
        for _ in 0..200 {
            match generator.generate_constant(&mut ctx) {
                Ok(c) => assert!(c.is_null()),
                Err(e) => {
                    assert!(matches!(e.kind, GenErrorKind::ConstantDisabled { .. }));
                    aborted += 1;
                }
            }
        }
        assert!(aborted > 150);
    }

    #[test]
    fn test_rowid_hidden_when_disabled() {
        let options = Options::default().with_rowid(false);
        let generator = ExprGenerator::new(&options).with_columns(columns());
        assert!(generator.columns().iter().all(|c| !c.is_rowid));
        let options = Options::default();
        let generator = ExprGenerator::new(&options).with_columns(columns());
        assert!(generator.columns().iter().any(|c| c.is_rowid));
    }

    #[test]
    fn test_order_bys_non_empty() {
        let options = Options::default();
        let mut ctx = Context::new_with_seed(11);
        let mut generator = ExprGenerator::new(&options).with_columns(columns());
        for _ in 0..100 {
            if let Ok(items) = generator.generate_order_bys(&mut ctx) {
                assert!(!items.is_empty());
            }
        }
    }

    #[test]
    fn test_aggregate_is_single_call() {
        let options = Options::default();
        let mut ctx = Context::new_with_seed(13);
        let mut generator = ExprGenerator::new(&options).with_columns(columns());
        for _ in 0..100 {
            if let Ok(expr) = generator.generate_aggregate(&mut ctx) {
                assert_eq!(count_aggregates(&expr), 1);
            }
        }
    }

    proptest! {
        #[test]
        fn rendering_is_deterministic(seed in any::<u64>()) {
            let options = Options::default();
            let mut ctx = Context::new_with_seed(seed);
            let mut generator = ExprGenerator::new(&options).with_columns(columns());
            if let Ok(expr) = generator.generate_expression(&mut ctx) {
                prop_assert_eq!(expr.to_string(), expr.to_string());
                prop_assert_eq!(expr.clone().negate().to_string(), format!("NOT ({expr})"));
                prop_assert_eq!(expr.clone().is_null().to_string(), format!("({expr}) IS NULL"));
            }
        }

        #[test]
        fn same_seed_same_expression(seed in any::<u64>()) {
            let options = Options::default();
            let mut a = Context::new_with_seed(seed);
            let mut b = Context::new_with_seed(seed);
            let first = ExprGenerator::new(&options).with_columns(columns()).generate_expression(&mut a);
            let second = ExprGenerator::new(&options).with_columns(columns()).generate_expression(&mut b);
            prop_assert_eq!(
                first.map(|e| e.to_string()).ok(),
                second.map(|e| e.to_string()).ok()
            );
        }
    }
}
