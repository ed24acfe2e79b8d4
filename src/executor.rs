//! Interfaces to the database under test.
//!
//! The generators and oracles never touch a connection. They go through
//! [`StatementExecutor`] to run rendered SQL and through [`SchemaProvider`]
//! to read the current schema back.

use std::fmt;

use itertools::Itertools;

use crate::error::CheckError;
use crate::errors::{ExpectedErrors, classify};
use crate::generate::GeneratedStatement;
use crate::schema::Schema;

/// A single value returned by the engine.
#[derive(Debug, Clone)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl PartialEq for SqlValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (SqlValue::Null, SqlValue::Null) => true,
            (SqlValue::Integer(a), SqlValue::Integer(b)) => a == b,
            (SqlValue::Real(a), SqlValue::Real(b)) => {
                if a.is_nan() && b.is_nan() {
                    true
                } else if a.is_nan() || b.is_nan() {
                    false
                } else {
                    a == b || (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
                }
            }
            (SqlValue::Text(a), SqlValue::Text(b)) => a == b,
            (SqlValue::Blob(a), SqlValue::Blob(b)) => a == b,
            _ => false,
        }
    }
}

impl SqlValue {
    /// Interpret a scalar aggregate result as a row count. `NULL` is what
    /// `SUM` returns over no rows, so it counts as zero.
    pub fn as_count(&self) -> Option<i64> {
        match self {
            SqlValue::Null => Some(0),
            SqlValue::Integer(i) => Some(*i),
            SqlValue::Real(f) if f.is_finite() && f.fract() == 0.0 => Some(*f as i64),
            SqlValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Stable textual key used for multiset comparison of result rows.
    ///
    /// Reals are rounded to ten significant digits so results that only
    /// differ by evaluation order of a floating point sum compare equal.
    pub fn canonical(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Integer(i) => format!("i:{i}"),
            SqlValue::Real(f) if f.is_nan() => "r:NaN".to_string(),
            SqlValue::Real(f) if f.is_infinite() => format!("r:{f}"),
            SqlValue::Real(f) if *f == 0.0 => "r:0".to_string(),
            SqlValue::Real(f) => format!("r:{f:.9e}"),
            SqlValue::Text(s) => format!("t:{s}"),
            SqlValue::Blob(b) => format!("b:{}", b.iter().map(|x| format!("{x:02X}")).join("")),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Integer(i) => write!(f, "{i}"),
            SqlValue::Real(r) => write!(f, "{r}"),
            SqlValue::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            SqlValue::Blob(b) => {
                write!(f, "X'")?;
                for byte in b {
                    write!(f, "{byte:02X}")?;
                }
                write!(f, "'")
            }
            SqlValue::Null => write!(f, "NULL"),
        }
    }
}

/// A row of values from a query result.
#[derive(Debug, Clone, PartialEq)]
pub struct Row(pub Vec<SqlValue>);

impl Row {
    pub fn canonical(&self) -> String {
        self.0.iter().map(SqlValue::canonical).join("|")
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0.iter().join(", "))
    }
}

/// Result of executing a statement.
#[derive(Debug, Clone)]
pub enum QueryResult {
    /// Statement executed successfully and produced rows.
    Rows(Vec<Row>),
    /// Statement executed successfully without producing rows.
    Ok,
    /// Statement failed with an error message.
    Error(String),
}

impl QueryResult {
    pub fn is_error(&self) -> bool {
        matches!(self, QueryResult::Error(_))
    }

    /// Rows of a successful result, empty when none were produced.
    pub fn into_rows(self) -> Result<Vec<Row>, String> {
        match self {
            QueryResult::Rows(rows) => Ok(rows),
            QueryResult::Ok => Ok(Vec::new()),
            QueryResult::Error(e) => Err(e),
        }
    }
}

/// Runs rendered SQL against the engine under test.
pub trait StatementExecutor {
    fn execute(&mut self, sql: &str) -> QueryResult;
}

/// Reads the engine's current tables and views.
pub trait SchemaProvider {
    fn read_schema(&mut self) -> anyhow::Result<Schema>;
}

/// A database session usable by the provider and the oracles.
pub trait Session: StatementExecutor + SchemaProvider {}

impl<T: StatementExecutor + SchemaProvider> Session for T {}

/// Execute `sql` and classify a failure against `errors`.
pub fn query<E: StatementExecutor + ?Sized>(
    exec: &mut E,
    sql: &str,
    errors: &ExpectedErrors,
) -> Result<Vec<Row>, CheckError> {
    tracing::debug!("{sql}");
    exec.execute(sql)
        .into_rows()
        .map_err(|message| classify(&message, sql, errors))
}

/// Execute a generated statement with its own expected errors.
pub fn execute_statement<E: StatementExecutor + ?Sized>(
    exec: &mut E,
    stmt: &GeneratedStatement,
) -> Result<(), CheckError> {
    query(exec, &stmt.sql(), &stmt.errors).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned(Vec<QueryResult>);

    impl StatementExecutor for Canned {
        fn execute(&mut self, _sql: &str) -> QueryResult {
            self.0.remove(0)
        }
    }

    #[test]
    fn test_real_tolerance() {
        assert_eq!(SqlValue::Real(0.1 + 0.2), SqlValue::Real(0.3));
        assert_eq!(SqlValue::Real(f64::NAN), SqlValue::Real(f64::NAN));
        assert_ne!(SqlValue::Real(1.0), SqlValue::Real(1.1));
        assert_ne!(SqlValue::Integer(1), SqlValue::Real(1.0));
    }

    #[test]
    fn test_canonical_rows() {
        let a = Row(vec![SqlValue::Real(0.1 + 0.2), SqlValue::Null]);
        let b = Row(vec![SqlValue::Real(0.3), SqlValue::Null]);
        assert_eq!(a.canonical(), b.canonical());
        assert_eq!(
            Row(vec![SqlValue::Real(-0.0)]).canonical(),
            Row(vec![SqlValue::Real(0.0)]).canonical()
        );
        assert_ne!(
            Row(vec![SqlValue::Integer(1)]).canonical(),
            Row(vec![SqlValue::Text("1".into())]).canonical()
        );
    }

    #[test]
    fn test_as_count() {
        assert_eq!(SqlValue::Null.as_count(), Some(0));
        assert_eq!(SqlValue::Integer(7).as_count(), Some(7));
        assert_eq!(SqlValue::Real(3.0).as_count(), Some(3));
        assert_eq!(SqlValue::Real(3.5).as_count(), None);
        assert_eq!(SqlValue::Text(" 4".into()).as_count(), Some(4));
    }

    #[test]
    fn test_query_classifies_errors() {
        let errors = ExpectedErrors::new().with("Division by zero");
        let mut exec = Canned(vec![
            QueryResult::Error("Division by zero in expression".into()),
            QueryResult::Error("disk I/O error".into()),
            QueryResult::Ok,
        ]);
        assert!(matches!(
            query(&mut exec, "SELECT 1/0", &errors),
            Err(CheckError::Expected { .. })
        ));
        let err = query(&mut exec, "SELECT 1", &errors).unwrap_err();
        assert!(err.is_reportable());
        assert!(query(&mut exec, "SELECT 1", &errors).unwrap().is_empty());
    }
}
