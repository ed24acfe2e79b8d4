//! Expression tree and its rendering.
//!
//! Every operand is wrapped in parentheses when rendered, so the text never
//! depends on operator precedence.

use std::fmt;

use itertools::Itertools;

use crate::constant::Constant;
use crate::functions::FunctionDef;
use crate::schema::Column;
use crate::types::TypeName;

/// A SQL expression.
#[derive(Debug, Clone, PartialEq, strum::EnumDiscriminants)]
#[strum_discriminants(name(ExprKind))]
#[strum_discriminants(derive(Hash, strum::EnumIter, strum::Display))]
pub enum Expr {
    Column(ColumnRef),
    Constant(Constant),
    Prefix(Box<PrefixExpr>),
    Postfix(Box<PostfixExpr>),
    Collate(Box<CollateExpr>),
    Binary(Box<BinaryExpr>),
    Between(Box<BetweenExpr>),
    LikeEscape(Box<LikeEscapeExpr>),
    Case(Box<CaseExpr>),
    InList(Box<InListExpr>),
    Function(FunctionCall),
    Cast(Box<CastExpr>),
    Ordering(Box<OrderingTerm>),
    /// Expression followed by raw SQL text; used by oracle rewrites.
    PostfixText(Box<PostfixTextExpr>),
}

impl Expr {
    pub fn column(column: &Column) -> Self {
        Expr::Column(ColumnRef {
            table: Some(column.table.clone()).filter(|t| !t.is_empty()),
            column: column.name.clone(),
        })
    }

    pub fn constant(constant: Constant) -> Self {
        Expr::Constant(constant)
    }

    pub fn prefix(op: PrefixOp, expr: Expr) -> Self {
        Expr::Prefix(Box::new(PrefixExpr { op, expr }))
    }

    pub fn postfix(op: PostfixOp, expr: Expr) -> Self {
        Expr::Postfix(Box::new(PostfixExpr { op, expr }))
    }

    pub fn collate(expr: Expr, collation: Collation) -> Self {
        Expr::Collate(Box::new(CollateExpr { expr, collation }))
    }

    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        Expr::Binary(Box::new(BinaryExpr { left, op, right }))
    }

    pub fn between(expr: Expr, low: Expr, high: Expr, negated: bool) -> Self {
        Expr::Between(Box::new(BetweenExpr {
            expr,
            low,
            high,
            negated,
        }))
    }

    pub fn like_escape(expr: Expr, pattern: Expr, escape: Expr) -> Self {
        Expr::LikeEscape(Box::new(LikeEscapeExpr {
            expr,
            pattern,
            escape,
        }))
    }

    pub fn case(operand: Expr, whens: Vec<(Expr, Expr)>, else_expr: Expr) -> Self {
        Expr::Case(Box::new(CaseExpr {
            operand,
            whens,
            else_expr,
        }))
    }

    pub fn in_list(expr: Expr, list: Vec<Expr>, negated: bool) -> Self {
        Expr::InList(Box::new(InListExpr {
            expr,
            list,
            negated,
        }))
    }

    pub fn function(name: &'static str, args: Vec<Expr>) -> Self {
        Expr::Function(FunctionCall { name, args })
    }

    pub fn call(def: &FunctionDef, args: Vec<Expr>) -> Self {
        Self::function(def.name, args)
    }

    pub fn cast(expr: Expr, target: TypeName) -> Self {
        Expr::Cast(Box::new(CastExpr { expr, target }))
    }

    pub fn ordering(expr: Expr, order: Option<Order>) -> Self {
        Expr::Ordering(Box::new(OrderingTerm { expr, order }))
    }

    pub fn postfix_text(expr: Expr, text: impl Into<String>) -> Self {
        Expr::PostfixText(Box::new(PostfixTextExpr {
            expr,
            text: text.into(),
        }))
    }

    /// `NOT (expr)`.
    pub fn negate(self) -> Self {
        Expr::prefix(PrefixOp::Not, self)
    }

    /// `(expr) IS NULL`.
    pub fn is_null(self) -> Self {
        Expr::postfix(PostfixOp::IsNull, self)
    }

    pub fn kind(&self) -> ExprKind {
        ExprKind::from(self)
    }

    /// Nesting depth; leaves have depth 0.
    pub fn depth(&self) -> usize {
        let children = self.children();
        children.iter().map(|c| c.depth() + 1).max().unwrap_or(0)
    }

    /// Direct sub-expressions in rendering order.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Column(_) | Expr::Constant(_) => vec![],
            Expr::Prefix(p) => vec![&p.expr],
            Expr::Postfix(p) => vec![&p.expr],
            Expr::Collate(c) => vec![&c.expr],
            Expr::Binary(b) => vec![&b.left, &b.right],
            Expr::Between(b) => vec![&b.expr, &b.low, &b.high],
            Expr::LikeEscape(l) => vec![&l.expr, &l.pattern, &l.escape],
            Expr::Case(c) => {
                let mut out = vec![&c.operand];
                for (when, then) in &c.whens {
                    out.push(when);
                    out.push(then);
                }
                out.push(&c.else_expr);
                out
            }
            Expr::InList(i) => std::iter::once(&i.expr).chain(i.list.iter()).collect(),
            Expr::Function(f) => f.args.iter().collect(),
            Expr::Cast(c) => vec![&c.expr],
            Expr::Ordering(o) => vec![&o.expr],
            Expr::PostfixText(p) => vec![&p.expr],
        }
    }

    /// True if any node in the tree is a call to an aggregate function.
    pub fn contains_aggregate(&self) -> bool {
        if let Expr::Function(f) = self {
            if f.is_aggregate() {
                return true;
            }
        }
        self.children().iter().any(|c| c.contains_aggregate())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(c) => write!(f, "{c}"),
            Expr::Constant(c) => write!(f, "{c}"),
            Expr::Prefix(p) => write!(f, "{} ({})", p.op, p.expr),
            Expr::Postfix(p) => write!(f, "({}) {}", p.expr, p.op),
            Expr::Collate(c) => write!(f, "({}) COLLATE {}", c.expr, c.collation),
            Expr::Binary(b) => write!(f, "({}) {} ({})", b.left, b.op, b.right),
            Expr::Between(b) => {
                write!(f, "({})", b.expr)?;
                if b.negated {
                    write!(f, " NOT")?;
                }
                write!(f, " BETWEEN ({}) AND ({})", b.low, b.high)
            }
            Expr::LikeEscape(l) => {
                write!(f, "({}) LIKE ({}) ESCAPE ({})", l.expr, l.pattern, l.escape)
            }
            Expr::Case(c) => {
                write!(f, "CASE ({})", c.operand)?;
                for (when, then) in &c.whens {
                    write!(f, " WHEN ({when}) THEN ({then})")?;
                }
                write!(f, " ELSE ({}) END", c.else_expr)
            }
            Expr::InList(i) => {
                write!(f, "({})", i.expr)?;
                if i.negated {
                    write!(f, " NOT")?;
                }
                write!(f, " IN ({})", i.list.iter().join(", "))
            }
            Expr::Function(func) => write!(f, "{func}"),
            Expr::Cast(c) => write!(f, "CAST(({}) AS {})", c.expr, c.target),
            Expr::Ordering(o) => match o.order {
                Some(order) => write!(f, "{} {order}", o.expr),
                None => write!(f, "{}", o.expr),
            },
            Expr::PostfixText(p) => write!(f, "({}){}", p.expr, p.text),
        }
    }
}

/// A column reference, qualified by its table when known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub column: String,
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(table) = &self.table {
            write!(f, "{table}.")?;
        }
        write!(f, "{}", self.column)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrefixExpr {
    pub op: PrefixOp,
    pub expr: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumIter)]
pub enum PrefixOp {
    Not,
    Plus,
    Minus,
}

impl fmt::Display for PrefixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PrefixOp::Not => "NOT",
            PrefixOp::Plus => "+",
            PrefixOp::Minus => "-",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostfixExpr {
    pub op: PostfixOp,
    pub expr: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumIter)]
pub enum PostfixOp {
    IsNull,
    IsNotNull,
}

impl fmt::Display for PostfixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PostfixOp::IsNull => "IS NULL",
            PostfixOp::IsNotNull => "IS NOT NULL",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollateExpr {
    pub expr: Expr,
    pub collation: Collation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumIter)]
pub enum Collation {
    NoCase,
    NoAccent,
    NoAccentNoCase,
    C,
    Posix,
}

impl fmt::Display for Collation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Collation::NoCase => "NOCASE",
            Collation::NoAccent => "NOACCENT",
            Collation::NoAccentNoCase => "NOACCENT.NOCASE",
            Collation::C => "C",
            Collation::Posix => "POSIX",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub left: Expr,
    pub op: BinaryOp,
    pub right: Expr,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    // Comparison
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
    Ne,
    Like,
    NotLike,
    SimilarTo,
    NotSimilarTo,
    RegexMatch,
    RegexNotMatch,
    // Logical
    And,
    Or,
    // Arithmetic and bitwise
    Concat,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    LeftShift,
    RightShift,
}

impl BinaryOp {
    pub fn comparison() -> &'static [BinaryOp] {
        &[
            BinaryOp::Eq,
            BinaryOp::Gt,
            BinaryOp::Ge,
            BinaryOp::Lt,
            BinaryOp::Le,
            BinaryOp::Ne,
            BinaryOp::Like,
            BinaryOp::NotLike,
            BinaryOp::SimilarTo,
            BinaryOp::NotSimilarTo,
            BinaryOp::RegexMatch,
            BinaryOp::RegexNotMatch,
        ]
    }

    /// SIMILAR TO and the POSIX match operators.
    pub fn is_regex(self) -> bool {
        matches!(
            self,
            BinaryOp::SimilarTo
                | BinaryOp::NotSimilarTo
                | BinaryOp::RegexMatch
                | BinaryOp::RegexNotMatch
        )
    }

    pub fn logical() -> &'static [BinaryOp] {
        &[BinaryOp::And, BinaryOp::Or]
    }

    pub fn arithmetic() -> &'static [BinaryOp] {
        &[
            BinaryOp::Concat,
            BinaryOp::Add,
            BinaryOp::Sub,
            BinaryOp::Mul,
            BinaryOp::Div,
            BinaryOp::Mod,
            BinaryOp::BitAnd,
            BinaryOp::BitOr,
            BinaryOp::LeftShift,
            BinaryOp::RightShift,
        ]
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Eq => "=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Ne => "!=",
            BinaryOp::Like => "LIKE",
            BinaryOp::NotLike => "NOT LIKE",
            BinaryOp::SimilarTo => "SIMILAR TO",
            BinaryOp::NotSimilarTo => "NOT SIMILAR TO",
            BinaryOp::RegexMatch => "~",
            BinaryOp::RegexNotMatch => "!~",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Concat => "||",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::LeftShift => "<<",
            BinaryOp::RightShift => ">>",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BetweenExpr {
    pub expr: Expr,
    pub low: Expr,
    pub high: Expr,
    pub negated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LikeEscapeExpr {
    pub expr: Expr,
    pub pattern: Expr,
    pub escape: Expr,
}

/// `CASE operand WHEN .. THEN .. ELSE .. END`.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseExpr {
    pub operand: Expr,
    pub whens: Vec<(Expr, Expr)>,
    pub else_expr: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InListExpr {
    pub expr: Expr,
    pub list: Vec<Expr>,
    pub negated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: &'static str,
    pub args: Vec<Expr>,
}

impl FunctionCall {
    pub fn is_aggregate(&self) -> bool {
        crate::functions::aggregate(self.name).is_some()
    }
}

impl fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.args.iter().join(", "))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CastExpr {
    pub expr: Expr,
    pub target: TypeName,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderingTerm {
    pub expr: Expr,
    pub order: Option<Order>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumIter)]
pub enum Order {
    Asc,
    Desc,
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Order::Asc => write!(f, "ASC"),
            Order::Desc => write!(f, "DESC"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostfixTextExpr {
    pub expr: Expr,
    pub text: String,
}
