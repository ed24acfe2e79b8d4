//! Error types for generation and for the oracle boundary.

use std::fmt;

use serde::Serialize;

/// Signal that a generation attempt cannot proceed.
///
/// This is never a test failure. The caller discards the attempt and retries
/// with fresh randomness.
#[derive(Debug, Clone)]
pub struct GenError {
    pub kind: GenErrorKind,
    pub scope: String,
    pub context: Vec<String>,
}

/// Kind of generation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenErrorKind {
    /// A constant of a kind disabled by configuration was requested.
    ConstantDisabled { kind: String },

    /// Schema doesn't have required objects.
    SchemaEmpty { needed: String },

    /// No valid candidates available after filtering.
    Exhausted { reason: String },

    /// Invalid configuration.
    InvalidConfig { message: String },
}

impl GenError {
    /// Create a disabled-constant error.
    pub fn constant_disabled(kind: impl Into<String>) -> Self {
        Self::new(GenErrorKind::ConstantDisabled { kind: kind.into() })
    }

    /// Create a schema empty error.
    pub fn schema_empty(needed: impl Into<String>) -> Self {
        Self::new(GenErrorKind::SchemaEmpty {
            needed: needed.into(),
        })
    }

    /// Create an exhausted error.
    pub fn exhausted(scope: &str, reason: impl Into<String>) -> Self {
        Self::new(GenErrorKind::Exhausted {
            reason: reason.into(),
        })
        .in_scope(scope)
    }

    /// Create an invalid config error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(GenErrorKind::InvalidConfig {
            message: message.into(),
        })
    }

    fn new(kind: GenErrorKind) -> Self {
        Self {
            kind,
            scope: String::new(),
            context: vec![],
        }
    }

    /// Add context to the error.
    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    /// Set the scope.
    pub fn in_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }
}

impl fmt::Display for GenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            GenErrorKind::ConstantDisabled { kind } => {
                write!(f, "{kind} constants are disabled")?;
            }
            GenErrorKind::SchemaEmpty { needed } => {
                write!(f, "schema missing required {needed}")?;
            }
            GenErrorKind::Exhausted { reason } => {
                if self.scope.is_empty() {
                    write!(f, "no valid candidates: {reason}")?;
                } else {
                    write!(f, "no valid candidates in scope '{}': {reason}", self.scope)?;
                }
            }
            GenErrorKind::InvalidConfig { message } => {
                write!(f, "invalid configuration: {message}")?;
            }
        }

        if !self.context.is_empty() {
            write!(f, "\n  context:")?;
            for c in &self.context {
                write!(f, "\n    - {c}")?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for GenError {}

/// Everything an oracle check can end in besides a pass.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    /// Generation gave up; retry with fresh randomness.
    #[error("generation aborted: {0}")]
    Aborted(#[from] GenError),

    /// The engine rejected a query with an anticipated error.
    #[error("expected error: {message}")]
    Expected { message: String },

    /// The engine rejected a query with an error nobody anticipated.
    #[error("unexpected error for `{sql}`: {message}")]
    Unexpected { sql: String, message: String },

    /// Equivalent formulations disagree.
    #[error("{0}")]
    Mismatch(Box<Discrepancy>),
}

impl CheckError {
    /// Only unexpected errors and mismatches end up in a report.
    pub fn is_reportable(&self) -> bool {
        matches!(self, CheckError::Unexpected { .. } | CheckError::Mismatch(_))
    }

    pub fn is_mismatch(&self) -> bool {
        matches!(self, CheckError::Mismatch(_))
    }
}

/// Reproduction artifact for a result mismatch.
#[derive(Debug, Clone, Serialize)]
pub struct Discrepancy {
    pub oracle: String,
    pub queries: Vec<ObservedQuery>,
    pub summary: String,
}

/// One rendered query and what the engine returned for it.
#[derive(Debug, Clone, Serialize)]
pub struct ObservedQuery {
    pub sql: String,
    pub observed: String,
}

impl Discrepancy {
    pub fn new(oracle: &str, summary: impl Into<String>) -> Self {
        Self {
            oracle: oracle.to_string(),
            queries: Vec::new(),
            summary: summary.into(),
        }
    }

    pub fn query(mut self, sql: impl Into<String>, observed: impl fmt::Display) -> Self {
        self.queries.push(ObservedQuery {
            sql: sql.into(),
            observed: observed.to_string(),
        });
        self
    }
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} mismatch: {}", self.oracle, self.summary)?;
        for q in &self.queries {
            write!(f, "\n  {}; -- {}", q.sql, q.observed)?;
        }
        Ok(())
    }
}

impl From<Discrepancy> for CheckError {
    fn from(d: Discrepancy) -> Self {
        CheckError::Mismatch(Box::new(d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_error() {
        let err = GenError::exhausted("where clause", "no columns available");
        assert!(matches!(err.kind, GenErrorKind::Exhausted { .. }));
        assert_eq!(err.scope, "where clause");
        assert!(err.to_string().contains("where clause"));
    }

    #[test]
    fn test_error_with_context() {
        let err = GenError::constant_disabled("INTEGER")
            .with_context("generating DEFAULT value")
            .with_context("column c0");

        assert_eq!(err.context.len(), 2);
        let msg = err.to_string();
        assert!(msg.starts_with("INTEGER constants are disabled"));
        assert!(msg.contains("context:"));
        assert!(msg.contains("column c0"));
    }

    #[test]
    fn test_schema_empty_error() {
        let err = GenError::schema_empty("tables");
        assert!(matches!(err.kind, GenErrorKind::SchemaEmpty { .. }));
        assert!(err.to_string().contains("tables"));
    }

    #[test]
    fn test_reportable_classes() {
        let aborted: CheckError = GenError::schema_empty("tables").into();
        assert!(!aborted.is_reportable());
        assert!(
            !CheckError::Expected {
                message: "Division by zero".into()
            }
            .is_reportable()
        );
        assert!(
            CheckError::Unexpected {
                sql: "SELECT 1".into(),
                message: "crash".into()
            }
            .is_reportable()
        );
        let mismatch: CheckError = Discrepancy::new("NoREC", "counts differ").into();
        assert!(mismatch.is_reportable());
        assert!(mismatch.is_mismatch());
    }

    #[test]
    fn test_discrepancy_display_lists_queries() {
        let d = Discrepancy::new("NoREC", "2 != 3")
            .query("SELECT t0.c0 FROM t0 WHERE p", 2)
            .query("SELECT SUM(count) FROM (...) as res", 3);
        let text = d.to_string();
        assert!(text.contains("NoREC mismatch: 2 != 3"));
        assert!(text.contains("SELECT t0.c0 FROM t0 WHERE p; -- 2"));
        assert!(text.contains("as res; -- 3"));
    }
}
