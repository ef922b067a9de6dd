//! Session Management
//!
//! A session owns one driver connection for its whole lifetime and runs
//! statements on fresh cursors.

use std::path::Path;
use std::time::Duration;

use crate::config::{Config, Credentials, DEFAULT_TIMEOUT_SECS};
use crate::driver::{Connection, Cursor, Driver};
use crate::error::{DriverError, Error, ErrorKind, Result};
use crate::query_file;

/// Statement timeout used when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(DEFAULT_TIMEOUT_SECS);

/// Statement issued after a statement timeout
const ROLLBACK: &str = "rollback";

/// Session
///
/// The connection is closed exactly once: by [`Session::close`], or when
/// the session is dropped.
pub struct Session<C: Connection> {
    user: String,
    account: String,

    /// Server version read when the session was opened
    version: String,

    /// Timeout used by `sql` and `sqlf`
    timeout: Duration,

    connection: C,
    closed: bool,
}

impl<C: Connection> Session<C> {
    /// Open a connection and read the server version.
    ///
    /// If the version cannot be read, the connection is closed before the
    /// error is returned.
    pub fn connect<D>(driver: &D, credentials: &Credentials) -> Result<Self>
    where
        D: Driver<Connection = C>,
    {
        tracing::debug!(
            "Connecting as {} to account {}",
            credentials.user,
            credentials.account
        );
        let mut connection = driver.connect(credentials)?;

        let version = match read_version(&connection) {
            Ok(version) => version,
            Err(err) => {
                if let Err(close_err) = connection.close() {
                    tracing::warn!("Failed to close connection after setup error: {}", close_err);
                }
                return Err(err);
            }
        };
        tracing::debug!("Connected, server version {}", version);

        Ok(Self {
            user: credentials.user.clone(),
            account: credentials.account.clone(),
            version,
            timeout: DEFAULT_TIMEOUT,
            connection,
            closed: false,
        })
    }

    /// Open a session from a [`Config`], using its timeout as the default
    pub fn from_config<D>(driver: &D, config: &Config) -> Result<Self>
    where
        D: Driver<Connection = C>,
    {
        Ok(Self::connect(driver, &config.credentials())?.with_timeout(config.timeout()))
    }

    /// Replace the default statement timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get user
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Get account
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Get server version
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Get default statement timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get connection
    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// Execute `query` with the session timeout
    pub fn sql(&self, query: &str) -> Result<C::Cursor> {
        self.sql_with_timeout(query, self.timeout)
    }

    /// Execute `query` on a new cursor and hand the cursor to the caller.
    ///
    /// A statement timeout is not an error here: the same cursor runs
    /// `rollback` and is returned holding the rollback's result. Any other
    /// driver error is returned unchanged.
    pub fn sql_with_timeout(&self, query: &str, timeout: Duration) -> Result<C::Cursor> {
        let mut cursor = self.connection.cursor()?;
        tracing::debug!("Executing SQL (timeout={:?}): {}", timeout, query);

        match cursor.execute(query, Some(timeout)) {
            Ok(()) => Ok(cursor),
            Err(err) if err.kind() == ErrorKind::StatementTimeout => {
                tracing::warn!("Query Timeout, rolling back: {}", err);
                cursor.execute(ROLLBACK, None)?;
                Ok(cursor)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Execute the statement stored in a SQL file with the session timeout
    pub fn sqlf(&self, path: impl AsRef<Path>) -> Result<C::Cursor> {
        self.sqlf_with_timeout(path, self.timeout)
    }

    /// Execute the statement stored in a SQL file.
    ///
    /// Line breaks are removed from the file without inserting a separator;
    /// see [`query_file::load_query`]. An empty path fails with
    /// [`Error::EmptyFilename`] before anything is read.
    pub fn sqlf_with_timeout(&self, path: impl AsRef<Path>, timeout: Duration) -> Result<C::Cursor> {
        let query = query_file::load_query(path.as_ref())?;
        self.sql_with_timeout(&query, timeout)
    }

    /// Close the connection, reporting the driver's close error
    pub fn close(mut self) -> Result<()> {
        Ok(self.release()?)
    }

    fn release(&mut self) -> std::result::Result<(), DriverError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        tracing::debug!("Closing connection to account {}", self.account);
        self.connection.close()
    }
}

impl<C: Connection> Drop for Session<C> {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            tracing::error!("Failed to close connection: {}", err);
        }
    }
}

/// Run the version query on a transient cursor, closing it on every path
fn read_version<C: Connection>(connection: &C) -> Result<String> {
    let mut cursor = connection.cursor()?;
    let version = fetch_version(&mut cursor, connection.version_query());
    cursor.close();
    version
}

fn fetch_version<K: Cursor>(cursor: &mut K, query: &str) -> Result<String> {
    cursor.execute(query, None)?;
    cursor
        .fetchone()?
        .and_then(|row| row.into_iter().next().flatten())
        .ok_or(Error::MissingVersion)
}
