//! snowq
//!
//! Session wrapper around a warehouse client driver: open a connection, run
//! SQL text or SQL files, and roll back after a statement timeout.

pub mod config;
pub mod driver;
pub mod error;
pub mod query_file;
pub mod session;
pub mod sqlite;

#[cfg(test)]
mod test_utils;

pub use config::{Config, Credentials};
pub use driver::{Connection, Cursor, Driver, Row};
pub use error::{DriverError, Error, ErrorKind, Result};
pub use session::{Session, DEFAULT_TIMEOUT};
pub use sqlite::SqliteDriver;
