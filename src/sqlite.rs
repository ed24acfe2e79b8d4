//! SQLite session built on `rusqlite`.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use anyhow::Context as _;
use rusqlite::Connection;
use rusqlite::types::ValueRef;

use crate::executor::{QueryResult, Row, SchemaProvider, SqlValue, StatementExecutor};
use crate::schema::{Column, Schema, Table};
use crate::types::CompositeType;

/// Number of VM instructions between two deadline checks.
const PROGRESS_INTERVAL: i32 = 1000;

const NO_DEADLINE: u64 = u64::MAX;

/// A connection with a per-statement execution deadline.
///
/// A statement that runs past the deadline is interrupted and reported as an
/// ordinary error whose message contains "interrupted". A zero timeout
/// disables the deadline.
pub struct SqliteSession {
    conn: Connection,
    timeout: Duration,
    epoch: Instant,
    deadline_ms: Arc<AtomicU64>,
}

impl SqliteSession {
    pub fn open_in_memory(timeout: Duration) -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
        Ok(Self::from_connection(conn, timeout))
    }

    pub fn open(path: &Path, timeout: Duration) -> anyhow::Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {}", path.display()))?;
        Ok(Self::from_connection(conn, timeout))
    }

    fn from_connection(conn: Connection, timeout: Duration) -> Self {
        let epoch = Instant::now();
        let deadline_ms = Arc::new(AtomicU64::new(NO_DEADLINE));
        let deadline = Arc::clone(&deadline_ms);
        conn.progress_handler(
            PROGRESS_INTERVAL,
            Some(move || {
                let elapsed = epoch.elapsed().as_millis() as u64;
                elapsed > deadline.load(Ordering::Relaxed)
            }),
        );
        Self {
            conn,
            timeout,
            epoch,
            deadline_ms,
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn arm_deadline(&self) {
        if self.timeout.is_zero() {
            return;
        }
        let now = self.epoch.elapsed().as_millis() as u64;
        let timeout = self.timeout.as_millis() as u64;
        self.deadline_ms
            .store(now.saturating_add(timeout), Ordering::Relaxed);
    }

    fn disarm_deadline(&self) {
        self.deadline_ms.store(NO_DEADLINE, Ordering::Relaxed);
    }

    /// Statements without result columns are executed; the rest are
    /// stepped to completion. A failed column read fails the statement.
    fn run(&self, sql: &str) -> rusqlite::Result<QueryResult> {
        let mut stmt = self.conn.prepare(sql)?;
        let column_count = stmt.column_count();
        if column_count == 0 {
            stmt.execute([])?;
            return Ok(QueryResult::Ok);
        }

        let mut query_rows = stmt.query([])?;
        let mut rows = Vec::new();
        while let Some(row) = query_rows.next()? {
            rows.push(read_row(row, column_count)?);
        }
        Ok(if rows.is_empty() {
            QueryResult::Ok
        } else {
            QueryResult::Rows(rows)
        })
    }

    fn read_columns(&self, table: &str) -> rusqlite::Result<Vec<Column>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, type, \"notnull\", pk FROM pragma_table_info(?1)")?;
        let columns = stmt
            .query_map([table], |row| {
                let name: String = row.get(0)?;
                let declared: String = row.get(1)?;
                let not_null: bool = row.get(2)?;
                let pk: i64 = row.get(3)?;
                let mut column = Column::new(name, CompositeType::parse_declared(&declared));
                if pk > 0 {
                    column = column.primary_key();
                } else if not_null {
                    column = column.not_null();
                }
                Ok(column)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(columns)
    }
}

impl StatementExecutor for SqliteSession {
    fn execute(&mut self, sql: &str) -> QueryResult {
        self.arm_deadline();
        let result = self.run(sql);
        self.disarm_deadline();
        result.unwrap_or_else(|e| QueryResult::Error(e.to_string()))
    }
}

impl SchemaProvider for SqliteSession {
    fn read_schema(&mut self) -> anyhow::Result<Schema> {
        let mut stmt = self.conn.prepare(
            "SELECT name, type FROM sqlite_master \
             WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let objects = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        drop(stmt);

        let mut tables = Vec::with_capacity(objects.len());
        for (name, kind) in objects {
            let columns = match self.read_columns(&name) {
                Ok(columns) => columns,
                // a view can be left broken by a later ALTER TABLE
                Err(e) if kind == "view" => {
                    tracing::debug!("skipping view {name}: {e}");
                    continue;
                }
                Err(e) => return Err(e).with_context(|| format!("reading columns of {name}")),
            };
            if columns.is_empty() {
                continue;
            }
            let table = Table::new(name, columns);
            tables.push(if kind == "table" {
                table.with_rowid()
            } else {
                table
            });
        }
        Ok(Schema::new(tables))
    }
}

fn read_row(row: &rusqlite::Row<'_>, column_count: usize) -> rusqlite::Result<Row> {
    (0..column_count)
        .map(|i| row.get_ref(i).map(convert_value))
        .collect::<rusqlite::Result<Vec<_>>>()
        .map(Row)
}

fn convert_value(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(i) => SqlValue::Integer(i),
        ValueRef::Real(f) => SqlValue::Real(f),
        ValueRef::Text(s) => SqlValue::Text(String::from_utf8_lossy(s).to_string()),
        ValueRef::Blob(b) => SqlValue::Blob(b.to_vec()),
    }
}
