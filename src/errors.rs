//! Expected-error catalog and classification.
//!
//! Every generated statement carries the substrings under which an engine
//! rejection counts as anticipated. The substrings are configuration, grouped
//! by the construct that makes them possible.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CheckError;

/// Ordered, de-duplicated set of expected error substrings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExpectedErrors {
    errors: Vec<String>,
}

impl ExpectedErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, error: impl Into<String>) {
        let error = error.into();
        if !self.errors.contains(&error) {
            self.errors.push(error);
        }
    }

    pub fn extend<I, S>(&mut self, errors: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for e in errors {
            self.add(e);
        }
    }

    pub fn with(mut self, error: impl Into<String>) -> Self {
        self.add(error);
        self
    }

    /// True if `message` contains any of the expected substrings.
    pub fn errors_match(&self, message: &str) -> bool {
        self.errors.iter().any(|e| message.contains(e.as_str()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Construct families that share expected errors.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum ErrorGroup {
    Expression,
    Insert,
    GroupBy,
    CreateTable,
    AlterAddColumn,
    AlterColumnType,
    AlterDropColumn,
    CreateIndex,
    UniqueIndex,
    Rowid,
    Timeout,
}

/// Expected error substrings keyed by [`ErrorGroup`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorCatalog {
    groups: BTreeMap<ErrorGroup, Vec<String>>,
}

const EXPRESSION_ERRORS: &[&str] = &[
    "Division by zero",
    "Out of range value",
    "value is out of range",
    "Truncated incorrect",
    "Incorrect DOUBLE value",
    "Incorrect INTEGER value",
    "Incorrect datetime value",
    "Incorrect date value",
    "Illegal mix of collations",
    "Unknown collation",
    "is not valid for CHARACTER SET",
    "Unknown column",
    "Invalid use of group function",
    "Incorrect parameter count",
    "Incorrect arguments to ESCAPE",
    "Operand should contain",
    "Unimplemented type for cast",
    "Conversion:",
    "regexp",
    "Data truncation",
];

const INSERT_ERRORS: &[&str] = &[
    "Duplicate entry",
    "cannot be null",
    "doesn't have a default value",
    "Data too long",
    "Out of range value",
    "Incorrect integer value",
    "Incorrect string value",
    "Incorrect decimal value",
    "Check constraint",
    "is violated",
];

const GROUP_BY_ERRORS: &[&str] = &[
    "isn't in GROUP BY",
    "contains nonaggregated column",
    "Can't group on",
    "Invalid use of group function",
];

const CREATE_TABLE_ERRORS: &[&str] = &[
    "Invalid default value",
    "Too big precision",
    "Too big scale",
    "M must be >= D",
    "Display width out of range",
    "Incorrect column specifier",
    "used in key specification without a key length",
    "Specified key was too long",
    "Multiple primary key defined",
    "All parts of a PRIMARY KEY must be NOT NULL",
    "Invalid type for index",
    "is not allowed in",
    "already exists",
    "Check constraint",
];

const ALTER_ADD_COLUMN_ERRORS: &[&str] = &[
    " does not have a column with name \"rowid\"",
    "Table does not contain column rowid referenced in alter statement",
    "Duplicate column name",
];

const ALTER_COLUMN_TYPE_ERRORS: &[&str] = &[
    "Cannot change the type of this column: an index depends on it!",
    "Cannot change the type of a column that has a UNIQUE or PRIMARY KEY constraint specified",
    "Unimplemented type for cast",
    "Conversion:",
    "Cannot change the type of a column that has a CHECK constraint specified",
];

const ALTER_DROP_COLUMN_ERRORS: &[&str] = &[
    "named in key does not exist",
    "Cannot drop this column:",
    "Cannot drop column: table only has one column remaining!",
    "because there is a CHECK constraint that depends on it",
    "because there is a UNIQUE constraint that depends on it",
    "You can't delete all columns with ALTER TABLE",
];

const CREATE_INDEX_ERRORS: &[&str] = &["already exists!", "Duplicate key name"];

const UNIQUE_INDEX_ERRORS: &[&str] =
    &["Cant create unique index, table contains duplicate data on indexed column(s)"];

const ROWID_ERRORS: &[&str] = &["Cannot create an index on the rowid!"];

const TIMEOUT_ERRORS: &[&str] = &[
    "canceling statement due to statement timeout",
    "Query execution was interrupted",
    "interrupted",
];

/// Rejections an embedded SQLite reports for the same constructs.
const SQLITE_ERRORS: &[(ErrorGroup, &[&str])] = &[
    (
        ErrorGroup::Expression,
        &[
            "no such function",
            "no such collation sequence",
            "no such column",
            "ambiguous column name",
            "misuse of aggregate",
            "wrong number of arguments",
            "integer overflow",
            "ESCAPE expression must be a single character",
            "LIKE or GLOB pattern too complex",
            "string or blob too big",
            "term out of range",
            "aggregate functions are not allowed",
            "Expression tree is too large",
            "parser stack overflow",
            "RIGHT and FULL OUTER JOINs are not currently supported",
            "cannot join using column",
            "datatype mismatch",
        ],
    ),
    (
        ErrorGroup::Insert,
        &[
            "UNIQUE constraint failed",
            "NOT NULL constraint failed",
            "CHECK constraint failed",
            "PRIMARY KEY must be unique",
            "datatype mismatch",
        ],
    ),
    (ErrorGroup::GroupBy, &["misuse of aggregate"]),
    (
        ErrorGroup::CreateTable,
        &[
            "default value of column",
            "has more than one primary key",
            "duplicate column name",
        ],
    ),
    (
        ErrorGroup::AlterAddColumn,
        &[
            "duplicate column name",
            "Cannot add a PRIMARY KEY column",
            "Cannot add a UNIQUE column",
            "Cannot add a NOT NULL column with default value NULL",
            "Cannot add a column with non-constant default",
        ],
    ),
    (
        ErrorGroup::AlterDropColumn,
        &[
            "cannot drop",
            "no such column",
            "error in view",
            "error in index",
        ],
    ),
    (ErrorGroup::CreateIndex, &["already exists", "no such column"]),
    (ErrorGroup::UniqueIndex, &["UNIQUE constraint failed"]),
    (ErrorGroup::Rowid, &["no such column: rowid"]),
];

impl Default for ErrorCatalog {
    fn default() -> Self {
        let entries: [(ErrorGroup, &[&str]); 11] = [
            (ErrorGroup::Expression, EXPRESSION_ERRORS),
            (ErrorGroup::Insert, INSERT_ERRORS),
            (ErrorGroup::GroupBy, GROUP_BY_ERRORS),
            (ErrorGroup::CreateTable, CREATE_TABLE_ERRORS),
            (ErrorGroup::AlterAddColumn, ALTER_ADD_COLUMN_ERRORS),
            (ErrorGroup::AlterColumnType, ALTER_COLUMN_TYPE_ERRORS),
            (ErrorGroup::AlterDropColumn, ALTER_DROP_COLUMN_ERRORS),
            (ErrorGroup::CreateIndex, CREATE_INDEX_ERRORS),
            (ErrorGroup::UniqueIndex, UNIQUE_INDEX_ERRORS),
            (ErrorGroup::Rowid, ROWID_ERRORS),
            (ErrorGroup::Timeout, TIMEOUT_ERRORS),
        ];
        let groups = entries
            .into_iter()
            .map(|(g, errs)| (g, errs.iter().map(|s| s.to_string()).collect()))
            .collect();
        Self { groups }
    }
}

impl ErrorCatalog {
    /// Catalog with no entries.
    pub fn empty() -> Self {
        Self {
            groups: BTreeMap::new(),
        }
    }

    /// The default catalog extended with SQLite's messages.
    pub fn with_sqlite() -> Self {
        let mut catalog = Self::default();
        for (group, errs) in SQLITE_ERRORS {
            catalog.extend_group(*group, errs.iter().copied());
        }
        catalog
    }

    /// Load a JSON object of `group -> [substring]` and add it on top of the
    /// default catalog.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let extra: ErrorCatalog = serde_json::from_str(&text)?;
        Ok(Self::default().merged(extra))
    }

    pub fn merged(mut self, other: ErrorCatalog) -> Self {
        for (group, errs) in other.groups {
            self.extend_group(group, errs);
        }
        self
    }

    pub fn extend_group<I, S>(&mut self, group: ErrorGroup, errors: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.groups.entry(group).or_default();
        for e in errors {
            let e = e.into();
            if !entry.contains(&e) {
                entry.push(e);
            }
        }
    }

    pub fn get(&self, group: ErrorGroup) -> &[String] {
        self.groups.get(&group).map(Vec::as_slice).unwrap_or_default()
    }

    /// Add every substring of `group` to `errors`.
    pub fn add_to(&self, group: ErrorGroup, errors: &mut ExpectedErrors) {
        errors.extend(self.get(group).iter().cloned());
    }

    /// Expected errors for a statement built from the given groups.
    pub fn expected(&self, groups: &[ErrorGroup]) -> ExpectedErrors {
        let mut errors = ExpectedErrors::new();
        for group in groups {
            self.add_to(*group, &mut errors);
        }
        errors
    }
}

/// Turn a raw engine error into an expected or unexpected [`CheckError`].
pub fn classify(message: &str, sql: &str, expected: &ExpectedErrors) -> CheckError {
    if expected.errors_match(message) {
        CheckError::Expected {
            message: message.to_string(),
        }
    } else {
        CheckError::Unexpected {
            sql: sql.to_string(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_expected_errors_dedup_and_match() {
        let mut errors = ExpectedErrors::new();
        errors.add("Division by zero");
        errors.add("Division by zero");
        errors.extend(["Conversion:", "already exists!"]);
        assert_eq!(errors.len(), 3);
        assert!(errors.errors_match("ERROR 1365: Division by zero"));
        assert!(errors.errors_match("Conversion: cannot cast 'a' to INT"));
        assert!(!errors.errors_match("segmentation fault"));
        assert!(!ExpectedErrors::new().errors_match(""));
    }

    #[test]
    fn test_default_catalog_covers_every_group() {
        let catalog = ErrorCatalog::default();
        for group in ErrorGroup::iter() {
            assert!(!catalog.get(group).is_empty(), "{group:?} is empty");
        }
    }

    #[test]
    fn test_disallowed_cast_in_check_is_expected() {
        let catalog = ErrorCatalog::default();
        let errors = catalog.expected(&[ErrorGroup::CreateTable, ErrorGroup::Expression]);
        let sql = "CREATE TABLE t0(c0 INT CHECK(CAST((c0) AS BOOL)))";
        let verdict = classify("Unimplemented type for cast (INTEGER -> BOOLEAN)", sql, &errors);
        assert!(matches!(verdict, CheckError::Expected { .. }));
        assert!(!verdict.is_reportable());
    }

    #[test]
    fn test_unmatched_error_is_reportable_with_sql() {
        let errors = ErrorCatalog::default().expected(&[ErrorGroup::Insert]);
        let verdict = classify("internal assertion failed", "INSERT INTO t0 VALUES (1)", &errors);
        match verdict {
            CheckError::Unexpected { sql, message } => {
                assert_eq!(sql, "INSERT INTO t0 VALUES (1)");
                assert_eq!(message, "internal assertion failed");
            }
            other => panic!("unexpected verdict: {other:?}"),
        }
    }

    #[test]
    fn test_sqlite_extension_keeps_defaults() {
        let catalog = ErrorCatalog::with_sqlite();
        let expr = catalog.get(ErrorGroup::Expression);
        assert!(expr.iter().any(|e| e == "Division by zero"));
        assert!(expr.iter().any(|e| e == "no such function"));
    }

    #[test]
    fn test_ill_formed_query_is_unexpected() {
        let catalog = ErrorCatalog::with_sqlite();
        let errors = catalog.expected(&[
            ErrorGroup::Expression,
            ErrorGroup::GroupBy,
            ErrorGroup::Timeout,
        ]);
        for message in [
            "near \"SIMILAR\": syntax error",
            "unrecognized token: \"!\"",
            "You have an error in your SQL syntax; check the manual",
            "Got error 1 from storage engine",
        ] {
            let verdict = classify(message, "SELECT 1", &errors);
            assert!(verdict.is_reportable(), "{message} was swallowed");
        }
        assert!(!classify("interrupted", "SELECT 1", &errors).is_reportable());
    }

    #[test]
    fn test_json_file_extends_default() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"insert": ["Lock wait timeout"], "rowid": ["rowid is virtual"]}}"#)
            .unwrap();
        let catalog = ErrorCatalog::from_json_file(file.path()).unwrap();
        assert!(catalog.get(ErrorGroup::Insert).iter().any(|e| e == "Lock wait timeout"));
        assert!(catalog.get(ErrorGroup::Insert).iter().any(|e| e == "Duplicate entry"));
        assert_eq!(catalog.get(ErrorGroup::Rowid).len(), 2);
    }

    #[test]
    fn test_json_rejects_unknown_group() {
        let parsed: Result<ErrorCatalog, _> = serde_json::from_str(r#"{"vacuum": ["x"]}"#);
        assert!(parsed.is_err());
    }
}
