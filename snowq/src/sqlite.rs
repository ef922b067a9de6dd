//! SQLite Driver
//!
//! A local driver backed by `sqlx`. The account names the database: a
//! `sqlite:` URL, `:memory:`, or a file path. User and password are accepted
//! and ignored.
//!
//! Each connection owns a current-thread tokio runtime and blocks on the
//! `sqlx` futures, so the driver is synchronous like every other driver.

use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use sqlx::sqlite::{SqliteConnectOptions, SqliteRow};
use sqlx::{ConnectOptions, Row as _, TypeInfo, ValueRef};
use tokio::runtime::Runtime;
use uuid::Uuid;

use crate::config::Credentials;
use crate::driver::{Connection, Cursor, Driver, Row};
use crate::error::DriverError;

const MEMORY_ACCOUNT: &str = ":memory:";

/// VM instructions between deadline checks
const PROGRESS_OPS: i32 = 1000;

/// Extended result code of an interrupted statement
const SQLITE_INTERRUPT: &str = "9";

/// Driver for local SQLite databases
#[derive(Debug, Clone, Default)]
pub struct SqliteDriver;

impl SqliteDriver {
    /// Create a new driver
    pub fn new() -> Self {
        Self
    }
}

impl Driver for SqliteDriver {
    type Connection = SqliteConnection;

    fn connect(&self, credentials: &Credentials) -> Result<SqliteConnection, DriverError> {
        let options = connect_options(&credentials.account)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DriverError::new(format!("Failed to start runtime: {}", e)))?;

        let conn = runtime.block_on(options.connect()).map_err(driver_error)?;
        tracing::debug!("Opened SQLite database {}", credentials.account);

        Ok(SqliteConnection {
            shared: Arc::new(Shared {
                conn: Mutex::new(Some(conn)),
                runtime,
            }),
        })
    }
}

fn connect_options(account: &str) -> Result<SqliteConnectOptions, DriverError> {
    let options = if account.is_empty() || account == MEMORY_ACCOUNT {
        SqliteConnectOptions::from_str("sqlite::memory:").map_err(driver_error)?
    } else if account.starts_with("sqlite:") {
        SqliteConnectOptions::from_str(account).map_err(driver_error)?
    } else {
        SqliteConnectOptions::new().filename(account)
    };
    Ok(options.create_if_missing(true))
}

// Field order matters: the connection drops before its runtime
struct Shared {
    conn: Mutex<Option<sqlx::SqliteConnection>>,
    runtime: Runtime,
}

/// Connection to a SQLite database, shared by its cursors
pub struct SqliteConnection {
    shared: Arc<Shared>,
}

impl Connection for SqliteConnection {
    type Cursor = SqliteCursor;

    fn cursor(&self) -> Result<SqliteCursor, DriverError> {
        if self.shared.conn.lock().is_none() {
            return Err(DriverError::connection_closed());
        }
        Ok(SqliteCursor {
            shared: Arc::clone(&self.shared),
            rows: VecDeque::new(),
            query_id: None,
            closed: false,
        })
    }

    fn close(&mut self) -> Result<(), DriverError> {
        let conn = self.shared.conn.lock().take();
        match conn {
            Some(conn) => self
                .shared
                .runtime
                .block_on(sqlx::Connection::close(conn))
                .map_err(driver_error),
            None => Ok(()),
        }
    }

    fn version_query(&self) -> &str {
        "SELECT sqlite_version()"
    }
}

/// Cursor buffering the rows of its last statement
pub struct SqliteCursor {
    shared: Arc<Shared>,
    rows: VecDeque<Row>,
    query_id: Option<String>,
    closed: bool,
}

impl Cursor for SqliteCursor {
    fn execute(&mut self, sql: &str, timeout: Option<Duration>) -> Result<(), DriverError> {
        if self.closed {
            return Err(DriverError::cursor_closed());
        }
        self.rows.clear();
        let query_id = Uuid::new_v4().to_string();
        self.query_id = Some(query_id.clone());

        let mut guard = self.shared.conn.lock();
        let conn = guard.as_mut().ok_or_else(DriverError::connection_closed)?;

        let fetched = self.shared.runtime.block_on(async {
            // Interrupts the statement inside the VM once the deadline passes
            if let Some(timeout) = timeout {
                let deadline = Instant::now() + timeout;
                conn.lock_handle()
                    .await?
                    .set_progress_handler(PROGRESS_OPS, move || Instant::now() < deadline);
            }
            let fetched = sqlx::query(sql).fetch_all(&mut *conn).await;
            if timeout.is_some() {
                conn.lock_handle().await?.remove_progress_handler();
            }
            fetched
        });

        let rows = match fetched {
            Ok(rows) => rows,
            Err(err) if is_idle_rollback(sql, &err) => {
                tracing::debug!("No open transaction, rollback is a no-op");
                Vec::new()
            }
            Err(err) => {
                let err = match timeout {
                    Some(timeout) if is_interrupt(&err) => DriverError::statement_timeout(timeout),
                    _ => driver_error(err),
                };
                return Err(err.with_query_id(query_id));
            }
        };

        self.rows = rows
            .iter()
            .map(decode_row)
            .collect::<Result<VecDeque<_>, _>>()
            .map_err(|err| err.with_query_id(query_id))?;
        Ok(())
    }

    fn fetchone(&mut self) -> Result<Option<Row>, DriverError> {
        if self.closed {
            return Err(DriverError::cursor_closed());
        }
        Ok(self.rows.pop_front())
    }

    fn query_id(&self) -> Option<&str> {
        self.query_id.as_deref()
    }

    fn close(&mut self) {
        self.closed = true;
        self.rows.clear();
    }
}

fn decode_row(row: &SqliteRow) -> Result<Row, DriverError> {
    (0..row.len()).map(|index| decode_cell(row, index)).collect()
}

fn decode_cell(row: &SqliteRow, index: usize) -> Result<Option<String>, DriverError> {
    let value = row.try_get_raw(index).map_err(driver_error)?;
    if value.is_null() {
        return Ok(None);
    }

    let cell = match value.type_info().name() {
        "INTEGER" => row.try_get::<i64, _>(index).map(|v| v.to_string()),
        "REAL" => row.try_get::<f64, _>(index).map(|v| v.to_string()),
        "BLOB" => row.try_get::<Vec<u8>, _>(index).map(|v| to_hex(&v)),
        _ => row.try_get::<String, _>(index),
    };
    cell.map(Some).map_err(driver_error)
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn is_interrupt(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some(SQLITE_INTERRUPT),
        _ => false,
    }
}

/// A warehouse treats `rollback` outside a transaction as a no-op; SQLite
/// rejects it.
fn is_idle_rollback(sql: &str, err: &sqlx::Error) -> bool {
    let rollback = sql.trim().trim_end_matches(';').trim();
    match err {
        sqlx::Error::Database(db) => {
            rollback.eq_ignore_ascii_case("rollback")
                && db.message().contains("no transaction is active")
        }
        _ => false,
    }
}

/// Map a `sqlx` error, keeping the database's error code when it has one
fn driver_error(err: sqlx::Error) -> DriverError {
    match &err {
        sqlx::Error::Database(db) => {
            let error = DriverError::new(db.message());
            match db.code().and_then(|code| code.parse::<i32>().ok()) {
                Some(code) => error.with_errno(code),
                None => error,
            }
        }
        _ => DriverError::new(err.to_string()),
    }
}
