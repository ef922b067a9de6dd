//! Test utilities for session testing
//!
//! A scripted driver that records every call it receives, so tests can
//! assert on the exact sequence of connect, execute and close calls.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::Credentials;
use crate::driver::{Connection, Cursor, Driver, Row, VERSION_QUERY};
use crate::error::DriverError;

/// A call received by the fake driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect { user: String, account: String },
    Cursor { cursor: usize },
    Execute {
        cursor: usize,
        sql: String,
        timeout: Option<Duration>,
    },
    CloseCursor { cursor: usize },
    Close,
}

#[derive(Default)]
struct Script {
    connect_error: Option<DriverError>,
    cursor_error: Option<DriverError>,
    close_error: Option<DriverError>,
    failures: HashMap<String, DriverError>,
    results: HashMap<String, Vec<Row>>,
    next_cursor: usize,
}

#[derive(Default)]
struct Shared {
    calls: Mutex<Vec<Call>>,
    script: Mutex<Script>,
}

impl Shared {
    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

#[derive(Clone)]
pub struct FakeDriver {
    shared: Arc<Shared>,
}

impl FakeDriver {
    /// Driver reporting server version `8.0.0`
    pub fn new() -> Self {
        Self::default().with_version("8.0.0")
    }

    pub fn with_version(self, version: &str) -> Self {
        self.with_rows(VERSION_QUERY, vec![vec![Some(version.to_string())]])
    }

    pub fn with_rows(self, sql: &str, rows: Vec<Row>) -> Self {
        self.shared
            .script
            .lock()
            .results
            .insert(sql.to_string(), rows);
        self
    }

    pub fn fail_connect(self, err: DriverError) -> Self {
        self.shared.script.lock().connect_error = Some(err);
        self
    }

    pub fn fail_cursor(self, err: DriverError) -> Self {
        self.shared.script.lock().cursor_error = Some(err);
        self
    }

    pub fn fail_close(self, err: DriverError) -> Self {
        self.shared.script.lock().close_error = Some(err);
        self
    }

    /// Make every execution of `sql` fail with `err`
    pub fn fail_on(self, sql: &str, err: DriverError) -> Self {
        self.shared
            .script
            .lock()
            .failures
            .insert(sql.to_string(), err);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.shared.calls.lock().clone()
    }

    /// Executed statements as `(cursor, sql, timeout)`
    pub fn executed(&self) -> Vec<(usize, String, Option<Duration>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Execute {
                    cursor,
                    sql,
                    timeout,
                } => Some((cursor, sql, timeout)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|call| predicate(*call)).count()
    }
}

impl Default for FakeDriver {
    fn default() -> Self {
        Self {
            shared: Arc::new(Shared::default()),
        }
    }
}

impl Driver for FakeDriver {
    type Connection = FakeConnection;

    fn connect(&self, credentials: &Credentials) -> Result<FakeConnection, DriverError> {
        self.shared.record(Call::Connect {
            user: credentials.user.clone(),
            account: credentials.account.clone(),
        });
        if let Some(err) = self.shared.script.lock().connect_error.clone() {
            return Err(err);
        }
        Ok(FakeConnection {
            shared: Arc::clone(&self.shared),
        })
    }
}

pub struct FakeConnection {
    shared: Arc<Shared>,
}

impl Connection for FakeConnection {
    type Cursor = FakeCursor;

    fn cursor(&self) -> Result<FakeCursor, DriverError> {
        let id = {
            let mut script = self.shared.script.lock();
            if let Some(err) = script.cursor_error.clone() {
                return Err(err);
            }
            script.next_cursor += 1;
            script.next_cursor
        };
        self.shared.record(Call::Cursor { cursor: id });
        Ok(FakeCursor {
            id,
            shared: Arc::clone(&self.shared),
            rows: VecDeque::new(),
        })
    }

    fn close(&mut self) -> Result<(), DriverError> {
        self.shared.record(Call::Close);
        match self.shared.script.lock().close_error.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

pub struct FakeCursor {
    id: usize,
    shared: Arc<Shared>,
    rows: VecDeque<Row>,
}

impl FakeCursor {
    pub fn id(&self) -> usize {
        self.id
    }
}

impl Cursor for FakeCursor {
    fn execute(&mut self, sql: &str, timeout: Option<Duration>) -> Result<(), DriverError> {
        self.shared.record(Call::Execute {
            cursor: self.id,
            sql: sql.to_string(),
            timeout,
        });
        let script = self.shared.script.lock();
        if let Some(err) = script.failures.get(sql) {
            return Err(err.clone());
        }
        self.rows = script.results.get(sql).cloned().unwrap_or_default().into();
        Ok(())
    }

    fn fetchone(&mut self) -> Result<Option<Row>, DriverError> {
        Ok(self.rows.pop_front())
    }

    fn close(&mut self) {
        self.shared.record(Call::CloseCursor { cursor: self.id });
    }
}
