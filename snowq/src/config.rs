//! Configuration
//!
//! Connection credentials and session settings, loaded from JSON or built
//! by the CLI from its flags and environment.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;

/// Environment variables read by the CLI
pub const USER_ENV: &str = "SNOWFLAKE_USER";
pub const PASSWORD_ENV: &str = "SNOWFLAKE_PASSWORD";
pub const ACCOUNT_ENV: &str = "SNOWFLAKE_ACCOUNT";
pub const TIMEOUT_ENV: &str = "SNOWQ_TIMEOUT";

/// Default statement timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Credentials handed to [`Driver::connect`](crate::Driver::connect)
#[derive(Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
    pub account: String,
}

impl Credentials {
    /// Create credentials
    pub fn new(
        user: impl Into<String>,
        password: impl Into<String>,
        account: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            account: account.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("account", &self.account)
            .finish()
    }
}

/// Session configuration
#[derive(Clone, Deserialize)]
pub struct Config {
    pub user: String,
    pub password: String,
    pub account: String,

    /// Statement timeout used by `sql` and `sqlf`
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Config {
    /// Parse a JSON configuration document
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Credentials handed to the driver
    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.user, &self.password, &self.account)
    }

    /// Default statement timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("account", &self.account)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_from_json_defaults_timeout() {
        let config =
            Config::from_json(r#"{"user": "alice", "password": "pw", "account": "xy12345"}"#)
                .unwrap();
        assert_eq!(config.user, "alice");
        assert_eq!(config.account, "xy12345");
        assert_eq!(config.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_from_json_rejects_missing_account() {
        let err = Config::from_json(r#"{"user": "alice", "password": "pw"}"#).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_from_json_credentials() {
        let config = Config::from_json(
            r#"{"user": "alice", "password": "pw", "account": "xy12345", "timeout_secs": 30}"#,
        )
        .unwrap();

        let credentials = config.credentials();
        assert_eq!(credentials.user, "alice");
        assert_eq!(credentials.password, "pw");
        assert_eq!(credentials.account, "xy12345");
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_config_debug_redacts_password() {
        let config =
            Config::from_json(r#"{"user": "alice", "password": "hunter2", "account": "xy"}"#)
                .unwrap();
        assert!(!format!("{:?}", config).contains("hunter2"));
    }

    #[test]
    fn test_debug_redacts_password() {
        let credentials = Credentials::new("alice", "hunter2", "xy12345");
        let rendered = format!("{:?}", credentials);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("alice"));
    }
}
