//! SELECT statement and joins.

use std::fmt;

use itertools::Itertools;

use super::expr::Expr;

/// LIMIT used when only an OFFSET was chosen; the grammar has no bare OFFSET.
const UNBOUNDED_LIMIT: i64 = i64::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumIter)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Natural,
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Natural => "NATURAL JOIN",
        };
        write!(f, "{s}")
    }
}

/// One join clause following the FROM list.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: String,
    /// Present for every kind except NATURAL.
    pub on: Option<Expr>,
}

impl fmt::Display for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.table)?;
        if let Some(on) = &self.on {
            write!(f, " ON {on}")?;
        }
        Ok(())
    }
}

/// A fetch column with an optional alias.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectColumn {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl SelectColumn {
    pub fn new(expr: Expr) -> Self {
        Self { expr, alias: None }
    }

    pub fn aliased(expr: Expr, alias: impl Into<String>) -> Self {
        Self {
            expr,
            alias: Some(alias.into()),
        }
    }
}

impl fmt::Display for SelectColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {alias}")?;
        }
        Ok(())
    }
}

/// A fully decided SELECT.
///
/// The synthesizer settles every optional clause before building the value,
/// so rendering never makes a decision of its own.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Select {
    pub distinct: bool,
    pub columns: Vec<SelectColumn>,
    pub from: Vec<String>,
    pub joins: Vec<Join>,
    pub where_clause: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<Expr>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Select {
    pub fn new(columns: Vec<Expr>, from: Vec<String>, joins: Vec<Join>) -> Self {
        Self {
            columns: columns.into_iter().map(SelectColumn::new).collect(),
            from,
            joins,
            ..Default::default()
        }
    }

    pub fn with_where(mut self, predicate: Option<Expr>) -> Self {
        self.where_clause = predicate;
        self
    }

    pub fn with_having(mut self, predicate: Option<Expr>) -> Self {
        self.having = predicate;
        self
    }

    /// Same query with a different fetch list.
    pub fn with_columns(mut self, columns: Vec<SelectColumn>) -> Self {
        self.columns = columns;
        self
    }

    /// `FROM ... JOIN ...` part, shared with rewritten queries.
    pub fn from_clause(&self) -> String {
        let mut out = self.from.iter().join(", ");
        for join in &self.joins {
            out.push(' ');
            out.push_str(&join.to_string());
        }
        out
    }
}

impl fmt::Display for Select {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT ")?;
        if self.distinct {
            write!(f, "DISTINCT ")?;
        }
        write!(f, "{}", self.columns.iter().join(", "))?;
        if !self.from.is_empty() {
            write!(f, " FROM {}", self.from_clause())?;
        }
        if let Some(w) = &self.where_clause {
            write!(f, " WHERE {w}")?;
        }
        if !self.group_by.is_empty() {
            write!(f, " GROUP BY {}", self.group_by.iter().join(", "))?;
        }
        if let Some(h) = &self.having {
            write!(f, " HAVING {h}")?;
        }
        if !self.order_by.is_empty() {
            write!(f, " ORDER BY {}", self.order_by.iter().join(", "))?;
        }
        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => write!(f, " LIMIT {limit} OFFSET {offset}")?,
            (Some(limit), None) => write!(f, " LIMIT {limit}")?,
            (None, Some(offset)) => write!(f, " LIMIT {UNBOUNDED_LIMIT} OFFSET {offset}")?,
            (None, None) => {}
        }
        Ok(())
    }
}
