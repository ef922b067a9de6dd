//! Driver Interface
//!
//! The connector capability a [`Session`](crate::Session) is built on.
//! Drivers own the network protocol, authentication and statement
//! execution; snowq only sequences calls into them.

use std::time::Duration;

use crate::config::Credentials;
use crate::error::DriverError;

/// Query used to read the server version when a session is opened
pub const VERSION_QUERY: &str = "SELECT current_version()";

/// One result row. `None` is SQL NULL.
pub type Row = Vec<Option<String>>;

/// Entry point of a client driver
pub trait Driver {
    type Connection: Connection;

    /// Open a connection with the given credentials
    fn connect(&self, credentials: &Credentials) -> Result<Self::Connection, DriverError>;
}

/// An open connection to the warehouse
pub trait Connection {
    type Cursor: Cursor;

    /// Create a new cursor on this connection
    fn cursor(&self) -> Result<Self::Cursor, DriverError>;

    /// Close the connection
    fn close(&mut self) -> Result<(), DriverError>;

    /// Statement returning the server version as its first column
    fn version_query(&self) -> &str {
        VERSION_QUERY
    }
}

/// Per-statement execution and result handle
pub trait Cursor {
    /// Execute one statement. `None` leaves the timeout to the driver.
    fn execute(&mut self, sql: &str, timeout: Option<Duration>) -> Result<(), DriverError>;

    /// Next row of the last result, or `None` once exhausted
    fn fetchone(&mut self) -> Result<Option<Row>, DriverError>;

    /// Remaining rows of the last result
    fn fetchall(&mut self) -> Result<Vec<Row>, DriverError> {
        let mut rows = Vec::new();
        while let Some(row) = self.fetchone()? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Identifier the driver assigned to the last executed statement
    fn query_id(&self) -> Option<&str> {
        None
    }

    fn close(&mut self);
}
