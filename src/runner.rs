//! Multi-threaded test loop.
//!
//! Each worker owns its session and its randomness. Workers only share the
//! counters in [`Stats`] and the list of reportable failures.

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, bail};
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use parking_lot::Mutex;
use rand::RngCore;
use serde::Serialize;

use crate::context::Context;
use crate::error::{CheckError, Discrepancy};
use crate::errors::ErrorCatalog;
use crate::executor::Session;
use crate::generate::Generator;
use crate::options::Options;
use crate::oracle::OracleKind;
use crate::provider::{DatabaseReport, generate_database};

/// Configuration for a run.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Global seed; worker `i` uses `seed + i`.
    pub seed: u64,
    pub num_threads: usize,
    /// Databases generated per worker.
    pub num_tries: usize,
    /// Oracle checks per database.
    pub num_queries: usize,
    pub oracle: OracleKind,
    pub options: Options,
    pub catalog: ErrorCatalog,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            seed: rand::rng().next_u64(),
            num_threads: 1,
            num_tries: 100,
            num_queries: 1000,
            oracle: OracleKind::default(),
            options: Options::default(),
            catalog: ErrorCatalog::default(),
        }
    }
}

/// Counters shared by all workers.
#[derive(Debug, Default)]
pub struct Stats {
    pub databases: AtomicUsize,
    pub statements: AtomicUsize,
    pub queries: AtomicUsize,
    pub expected_errors: AtomicUsize,
    pub aborts: AtomicUsize,
    pub unexpected_errors: AtomicUsize,
    pub mismatches: AtomicUsize,
}

/// Plain copy of [`Stats`] for reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub databases: usize,
    pub statements: usize,
    pub queries: usize,
    pub expected_errors: usize,
    pub aborts: usize,
    pub unexpected_errors: usize,
    pub mismatches: usize,
}

impl StatsSnapshot {
    /// No unexpected error and no mismatch.
    pub fn is_success(&self) -> bool {
        self.unexpected_errors == 0 && self.mismatches == 0
    }

    pub fn to_table(&self, config: &RunnerConfig) -> Table {
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);

        let status = if self.is_success() {
            Cell::new("PASSED")
                .fg(Color::Green)
                .add_attribute(Attribute::Bold)
        } else {
            Cell::new("FAILED")
                .fg(Color::Red)
                .add_attribute(Attribute::Bold)
        };
        table.set_header(vec![
            Cell::new("Run Results").add_attribute(Attribute::Bold),
            status,
        ]);

        table.add_row(vec![Cell::new("Seed").fg(Color::Cyan), Cell::new(config.seed)]);
        table.add_row(vec![
            Cell::new("Oracle").fg(Color::Cyan),
            Cell::new(config.oracle),
        ]);
        table.add_row(vec![
            Cell::new("Threads").fg(Color::Cyan),
            Cell::new(config.num_threads),
        ]);

        for (label, value) in [
            ("Databases", self.databases),
            ("Statements", self.statements),
            ("Queries", self.queries),
            ("Expected Errors", self.expected_errors),
            ("Aborted Generations", self.aborts),
        ] {
            table.add_row(vec![Cell::new(label).fg(Color::Blue), Cell::new(value)]);
        }

        for (label, value) in [
            ("Unexpected Errors", self.unexpected_errors),
            ("Mismatches", self.mismatches),
        ] {
            let cell = if value > 0 {
                Cell::new(value).fg(Color::Red).add_attribute(Attribute::Bold)
            } else {
                Cell::new(value).fg(Color::Green)
            };
            table.add_row(vec![Cell::new(label).fg(Color::Red), cell]);
        }

        table
    }
}

impl Stats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            databases: self.databases.load(Ordering::Relaxed),
            statements: self.statements.load(Ordering::Relaxed),
            queries: self.queries.load(Ordering::Relaxed),
            expected_errors: self.expected_errors.load(Ordering::Relaxed),
            aborts: self.aborts.load(Ordering::Relaxed),
            unexpected_errors: self.unexpected_errors.load(Ordering::Relaxed),
            mismatches: self.mismatches.load(Ordering::Relaxed),
        }
    }

    fn record_database(&self, report: &DatabaseReport) {
        self.databases.fetch_add(1, Ordering::Relaxed);
        self.statements
            .fetch_add(report.statements, Ordering::Relaxed);
        self.expected_errors
            .fetch_add(report.expected_errors, Ordering::Relaxed);
        self.aborts.fetch_add(report.aborts, Ordering::Relaxed);
        self.unexpected_errors
            .fetch_add(report.unexpected.len(), Ordering::Relaxed);
    }

    fn record_check(&self, result: &Result<(), CheckError>) {
        self.queries.fetch_add(1, Ordering::Relaxed);
        let counter = match result {
            Ok(()) => return,
            Err(CheckError::Aborted(_)) => &self.aborts,
            Err(CheckError::Expected { .. }) => &self.expected_errors,
            Err(CheckError::Unexpected { .. }) => &self.unexpected_errors,
            Err(CheckError::Mismatch(_)) => &self.mismatches,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnexpectedError,
    Mismatch,
}

/// A reportable failure with what is needed to reproduce it.
#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord {
    pub worker: usize,
    /// Seed of the worker that found it.
    pub seed: u64,
    /// Index of the database within the worker.
    pub database: usize,
    pub kind: FailureKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discrepancy: Option<Discrepancy>,
}

impl FailureRecord {
    fn new(worker: usize, seed: u64, database: usize, error: CheckError) -> Self {
        let message = error.to_string();
        let (kind, discrepancy) = match error {
            CheckError::Mismatch(d) => (FailureKind::Mismatch, Some(*d)),
            _ => (FailureKind::UnexpectedError, None),
        };
        Self {
            worker,
            seed,
            database,
            kind,
            message,
            discrepancy,
        }
    }
}

/// Summary written to the JSON report file.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub seed: u64,
    pub oracle: OracleKind,
    pub stats: StatsSnapshot,
    pub failures: Vec<FailureRecord>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.stats.is_success()
    }
}

pub struct Runner {
    config: RunnerConfig,
    stats: Stats,
    failures: Mutex<Vec<FailureRecord>>,
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config,
            stats: Stats::default(),
            failures: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Run every worker to completion.
    ///
    /// `factory` opens a fresh session for a worker; it is called once per
    /// generated database.
    pub fn run<S, F>(&self, factory: F) -> Result<RunReport>
    where
        S: Session,
        F: Fn(usize) -> Result<S> + Sync,
    {
        self.config.options.check()?;
        let factory = &factory;

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..self.config.num_threads.max(1))
                .map(|worker| scope.spawn(move || self.run_worker(worker, factory)))
                .collect();
            for handle in handles {
                match handle.join() {
                    Ok(result) => result?,
                    Err(_) => bail!("worker thread panicked"),
                }
            }
            Ok(())
        })?;

        Ok(RunReport {
            seed: self.config.seed,
            oracle: self.config.oracle,
            stats: self.stats.snapshot(),
            failures: self.failures.lock().clone(),
        })
    }

    fn run_worker<S, F>(&self, worker: usize, factory: &F) -> Result<()>
    where
        S: Session,
        F: Fn(usize) -> Result<S>,
    {
        let seed = self.config.seed.wrapping_add(worker as u64);
        let mut ctx = Context::new_with_seed(seed);
        let mut oracle = self.config.oracle.create();
        tracing::info!("worker {worker} started with seed {seed}");

        for database in 0..self.config.num_tries {
            let mut session = factory(worker)?;
            let (schema, report) = match generate_database(
                &mut ctx,
                &mut session,
                &self.config.options,
                &self.config.catalog,
            ) {
                Ok(generated) => generated,
                Err(e) => {
                    tracing::warn!("worker {worker}: database {database} skipped: {e:#}");
                    continue;
                }
            };
            self.stats.record_database(&report);
            for error in report.unexpected {
                self.record_failure(worker, seed, database, error);
            }

            let g = Generator::new(&schema, &self.config.options, &self.config.catalog);
            for _ in 0..self.config.num_queries {
                let result = oracle.check(&mut ctx, &g, &mut session);
                self.stats.record_check(&result);
                if let Err(error) = result {
                    if error.is_reportable() {
                        self.record_failure(worker, seed, database, error);
                    }
                }
            }
        }

        tracing::info!("worker {worker} finished");
        Ok(())
    }

    fn record_failure(&self, worker: usize, seed: u64, database: usize, error: CheckError) {
        self.failures
            .lock()
            .push(FailureRecord::new(worker, seed, database, error));
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::sqlite::SqliteSession;

    fn config(oracle: OracleKind) -> RunnerConfig {
        RunnerConfig {
            seed: 42,
            num_threads: 2,
            num_tries: 2,
            num_queries: 20,
            oracle,
            options: Options::sqlite_compatible(),
            catalog: ErrorCatalog::with_sqlite(),
        }
    }

    fn sqlite(_worker: usize) -> Result<SqliteSession> {
        SqliteSession::open_in_memory(Duration::from_secs(10))
    }

    #[test]
    fn test_run_counts_queries() {
        let runner = Runner::new(config(OracleKind::NoRec));
        let report = runner.run(sqlite).unwrap();
        assert_eq!(report.stats.databases, 4);
        assert_eq!(report.stats.queries, 2 * 2 * 20);
        assert_eq!(report.stats.mismatches, 0);
        assert_eq!(report.stats.unexpected_errors, 0, "{:?}", report.failures);
        assert!(report.is_success());
    }

    #[test]
    fn test_sqlite_defaults_raise_no_unexpected_errors() {
        for oracle in [
            OracleKind::NoRec,
            OracleKind::Where,
            OracleKind::Having,
            OracleKind::GroupBy,
            OracleKind::Distinct,
            OracleKind::Aggregate,
        ] {
            let mut config = config(oracle);
            config.seed = 7;
            config.num_queries = 50;
            let report = Runner::new(config).run(sqlite).unwrap();
            assert!(report.stats.queries > 0);
            assert_eq!(
                report.stats.unexpected_errors, 0,
                "{oracle}: {:?}",
                report.failures
            );
        }
    }

    #[test]
    fn test_invalid_options_rejected() {
        let mut config = config(OracleKind::Where);
        config.options = config.options.with_max_expression_depth(0);
        assert!(Runner::new(config).run(sqlite).is_err());
    }

    #[test]
    fn test_report_serializes() {
        let mut config = config(OracleKind::QueryPartitioning);
        config.num_threads = 1;
        config.num_tries = 1;
        let report = Runner::new(config).run(sqlite).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["oracle"], "query-partitioning");
        assert_eq!(json["seed"], 42);
        assert!(json["stats"]["queries"].as_u64().unwrap() > 0);
    }

    #[test]
    fn test_failure_record_keeps_discrepancy() {
        let error: CheckError = Discrepancy::new("NoREC", "1 != 2").query("q", 1).into();
        let record = FailureRecord::new(0, 7, 3, error);
        assert_eq!(record.kind, FailureKind::Mismatch);
        assert_eq!(record.discrepancy.unwrap().queries.len(), 1);
        let error = CheckError::Unexpected {
            sql: "SELECT 1".into(),
            message: "boom".into(),
        };
        let record = FailureRecord::new(0, 7, 3, error);
        assert_eq!(record.kind, FailureKind::UnexpectedError);
        assert!(record.discrepancy.is_none());
    }
}
