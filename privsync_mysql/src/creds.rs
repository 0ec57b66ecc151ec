//! Connection credentials for a MySQL or MariaDB server.

use anyhow::{anyhow, Result};
use serde::Deserialize;

fn default_port() -> u16 {
    3306
}

/// One connection per pool by default, so SHOW WARNINGS observes the
/// statement that preceded it.
fn default_pool_size() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    30
}

/// Credentials for authenticating to a MySQL-compatible server.
///
/// The orchestration layer deserializes these from its connector
/// configuration and hands them to [`crate::MysqlConnector::connect`].
#[derive(Deserialize, Clone)]
pub struct MysqlCredentials {
    /// Server hostname or IP address.
    pub host: String,
    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Account to authenticate as. Needs GRANT OPTION on the objects it
    /// will manage.
    pub user: String,
    /// Account password.
    pub password: String,
    /// Default database for the connection, if any.
    #[serde(default)]
    pub database: Option<String>,
    /// Connection pool size.
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl MysqlCredentials {
    /// Perform simple field validation to catch bad input.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() || self.user.is_empty() {
            return Err(anyhow!(
                "credentials are missing a host or user; check the connector configuration (received: {:?})",
                self
            ));
        }
        if self.pool_size == 0 {
            return Err(anyhow!("pool_size must be at least 1"));
        }
        Ok(())
    }
}

// Keep the password out of logs and error messages.
impl std::fmt::Debug for MysqlCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MysqlCredentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("pool_size", &self.pool_size)
            .finish()
    }
}
