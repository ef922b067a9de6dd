//! Error types for snowq

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Driver error number reported when a statement exceeds its timeout
pub const STATEMENT_TIMEOUT_ERRNO: i32 = 604;

/// Driver error number reported when a closed connection is used
pub const CONNECTION_CLOSED_ERRNO: i32 = 250002;

/// Driver error number reported when a closed cursor is used
pub const CURSOR_CLOSED_ERRNO: i32 = 251006;

/// Failure classification derived from a driver error number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The statement was cancelled because it ran past its timeout
    StatementTimeout,
    /// Any other driver failure
    Other,
}

impl ErrorKind {
    /// Classify a driver error number
    pub fn from_errno(errno: Option<i32>) -> Self {
        match errno {
            Some(STATEMENT_TIMEOUT_ERRNO) => ErrorKind::StatementTimeout,
            _ => ErrorKind::Other,
        }
    }
}

/// Native error value produced by a driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverError {
    errno: Option<i32>,
    sql_state: Option<String>,
    query_id: Option<String>,
    message: String,
}

impl DriverError {
    /// Create an error with only a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            errno: None,
            sql_state: None,
            query_id: None,
            message: message.into(),
        }
    }

    /// Statement cancelled after running past `timeout`
    pub fn statement_timeout(timeout: std::time::Duration) -> Self {
        Self::new(format!(
            "SQL execution canceled: statement reached its timeout of {}s",
            timeout.as_secs_f64()
        ))
        .with_errno(STATEMENT_TIMEOUT_ERRNO)
        .with_sql_state("57014")
    }

    /// Use of a closed connection
    pub fn connection_closed() -> Self {
        Self::new("Connection is closed")
            .with_errno(CONNECTION_CLOSED_ERRNO)
            .with_sql_state("08003")
    }

    /// Use of a closed cursor
    pub fn cursor_closed() -> Self {
        Self::new("Cursor is closed").with_errno(CURSOR_CLOSED_ERRNO)
    }

    /// Set error number
    pub fn with_errno(mut self, errno: i32) -> Self {
        self.errno = Some(errno);
        self
    }

    /// Set SQL State
    pub fn with_sql_state(mut self, sql_state: impl Into<String>) -> Self {
        self.sql_state = Some(sql_state.into());
        self
    }

    /// Set the failed statement's query ID
    pub fn with_query_id(mut self, query_id: impl Into<String>) -> Self {
        self.query_id = Some(query_id.into());
        self
    }

    /// Get error number
    pub fn errno(&self) -> Option<i32> {
        self.errno
    }

    /// Get SQL State
    pub fn sql_state(&self) -> Option<&str> {
        self.sql_state.as_deref()
    }

    /// Get query ID
    pub fn query_id(&self) -> Option<&str> {
        self.query_id.as_deref()
    }

    /// Get message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get failure classification
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::from_errno(self.errno)
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.errno, &self.sql_state) {
            (Some(errno), Some(state)) => write!(f, "{:06} ({}): ", errno, state)?,
            (Some(errno), None) => write!(f, "{:06}: ", errno)?,
            (None, Some(state)) => write!(f, "({}): ", state)?,
            (None, None) => {}
        }
        if let Some(query_id) = &self.query_id {
            write!(f, "{}: ", query_id)?;
        }
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for DriverError {}

/// snowq error
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("Version query returned no value")]
    MissingVersion,

    #[error("SQL file name is empty")]
    EmptyFilename,

    #[error("Failed to read SQL file {path:?}: {source}")]
    ReadQuery {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Driver error carried by this error, if any
    pub fn driver_error(&self) -> Option<&DriverError> {
        match self {
            Error::Driver(err) => Some(err),
            _ => None,
        }
    }

    /// Driver error number, if the failure came from the driver
    pub fn errno(&self) -> Option<i32> {
        self.driver_error().and_then(DriverError::errno)
    }

    /// SQL State reported by the driver, if any
    pub fn sql_state(&self) -> Option<&str> {
        self.driver_error().and_then(DriverError::sql_state)
    }
}
