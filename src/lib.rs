//! Random SQL generation with metamorphic oracles.
//!
//! The [`generate`] module builds random schemas, data and queries for the
//! StoneDB dialect. The [`oracle`] module turns generated queries into
//! verdicts by comparing equivalent formulations: NoREC compares a filtered
//! row count against an unfiltered sum, and ternary logic partitioning
//! compares a query against the union of its three predicate partitions.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use stonedb_fuzzer::{ErrorCatalog, OracleKind, Options, Runner, RunnerConfig, SqliteSession};
//!
//! let config = RunnerConfig {
//!     seed: 42,
//!     oracle: OracleKind::NoRec,
//!     options: Options::sqlite_compatible(),
//!     catalog: ErrorCatalog::with_sqlite(),
//!     ..Default::default()
//! };
//! let report = Runner::new(config)
//!     .run(|_| SqliteSession::open_in_memory(Duration::from_secs(10)))
//!     .unwrap();
//! assert!(report.is_success());
//! ```

pub mod ast;
pub mod constant;
pub mod context;
pub mod error;
pub mod errors;
pub mod executor;
pub mod functions;
pub mod generate;
pub mod options;
pub mod oracle;
pub mod provider;
pub mod runner;
pub mod schema;
pub mod sqlite;
pub mod types;

pub use context::Context;
pub use error::{CheckError, Discrepancy, GenError, GenErrorKind};
pub use errors::{ErrorCatalog, ErrorGroup, ExpectedErrors};
pub use executor::{QueryResult, Row, SchemaProvider, Session, SqlValue, StatementExecutor};
pub use generate::{GeneratedStatement, Generator};
pub use options::Options;
pub use oracle::{Oracle, OracleKind};
pub use runner::{RunReport, Runner, RunnerConfig, Stats};
pub use schema::{Column, Schema, Table};
pub use sqlite::SqliteSession;
pub use types::{CompositeType, DataKind};
