//! Metamorphic test oracles.
//!
//! An oracle generates a query, derives one or more equivalent formulations
//! from it, runs all of them and compares the results. A check ends in one
//! of the [`CheckError`] classes when it does not pass; only mismatches and
//! unexpected engine errors are bugs.

pub mod aggregate;
pub mod composite;
pub mod norec;
pub mod tlp;

use std::collections::HashMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::{CheckError, Discrepancy};
use crate::errors::ErrorGroup;
use crate::executor::{Row, StatementExecutor};
use crate::generate::Generator;

pub use aggregate::AggregateOracle;
pub use composite::CompositeOracle;
pub use norec::NoRecOracle;
pub use tlp::{TlpOracle, TlpVariant};

/// Error groups every oracle query may legitimately raise.
pub const QUERY_ERROR_GROUPS: &[ErrorGroup] = &[
    ErrorGroup::Expression,
    ErrorGroup::GroupBy,
    ErrorGroup::Timeout,
];

/// Rows shown per side when a row set mismatch is reported.
const MAX_REPORTED_ROWS: usize = 5;

pub trait Oracle {
    fn name(&self) -> &'static str;

    /// Run one generate-execute-compare round against the current schema.
    fn check(
        &mut self,
        ctx: &mut Context,
        g: &Generator<'_>,
        exec: &mut dyn StatementExecutor,
    ) -> Result<(), CheckError>;
}

/// Oracle selectable from the command line.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum OracleKind {
    #[default]
    #[value(name = "norec")]
    #[serde(rename = "norec")]
    #[strum(serialize = "norec")]
    NoRec,
    Where,
    Having,
    GroupBy,
    Distinct,
    Aggregate,
    /// Every partitioning variant in sequence.
    QueryPartitioning,
}

impl OracleKind {
    pub fn create(self) -> Box<dyn Oracle> {
        match self {
            OracleKind::NoRec => Box::new(NoRecOracle),
            OracleKind::Where => Box::new(TlpOracle::new(TlpVariant::Where)),
            OracleKind::Having => Box::new(TlpOracle::new(TlpVariant::Having)),
            OracleKind::GroupBy => Box::new(TlpOracle::new(TlpVariant::GroupBy)),
            OracleKind::Distinct => Box::new(TlpOracle::new(TlpVariant::Distinct)),
            OracleKind::Aggregate => Box::new(AggregateOracle),
            OracleKind::QueryPartitioning => Box::new(CompositeOracle::query_partitioning()),
        }
    }
}

/// Sorted canonical keys of `rows`; duplicates are dropped when `as_set`.
fn canonical(rows: &[Row], as_set: bool) -> Vec<String> {
    let keys = rows.iter().map(Row::canonical).sorted();
    if as_set {
        keys.dedup().collect()
    } else {
        keys.collect()
    }
}

/// Keys of `a` that are not matched one-for-one in `b`.
fn difference(a: &[String], b: &[String]) -> Vec<String> {
    let mut remaining: HashMap<&str, usize> = b.iter().map(String::as_str).counts();
    a.iter()
        .filter(|key| match remaining.get_mut(key.as_str()) {
            Some(n) if *n > 0 => {
                *n -= 1;
                false
            }
            _ => true,
        })
        .cloned()
        .collect()
}

/// Compare the result of an unrestricted query with the concatenated
/// results of its partitions.
///
/// With `as_set` only the distinct rows are compared, which is what GROUP BY
/// and DISTINCT queries guarantee.
pub(crate) fn compare_partitions(
    oracle: &str,
    original: (&str, &[Row]),
    partitions: &[(String, Vec<Row>)],
    as_set: bool,
) -> Result<(), CheckError> {
    let (original_sql, original_rows) = original;
    let combined: Vec<Row> = partitions
        .iter()
        .flat_map(|(_, rows)| rows.iter().cloned())
        .collect();
    let expected = canonical(original_rows, as_set);
    let actual = canonical(&combined, as_set);
    if expected == actual {
        return Ok(());
    }

    let missing = difference(&expected, &actual);
    let extra = difference(&actual, &expected);
    let summary = format!(
        "{} rows vs {} rows in partitions; only in original: [{}]; only in partitions: [{}]",
        expected.len(),
        actual.len(),
        missing.iter().take(MAX_REPORTED_ROWS).join(", "),
        extra.iter().take(MAX_REPORTED_ROWS).join(", "),
    );
    tracing::error!("{oracle} mismatch: {summary}");
    let mut discrepancy = Discrepancy::new(oracle, summary)
        .query(original_sql, format!("{} rows", original_rows.len()));
    for (sql, rows) in partitions {
        discrepancy = discrepancy.query(sql.as_str(), format!("{} rows", rows.len()));
    }
    Err(discrepancy.into())
}
