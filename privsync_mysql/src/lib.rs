//! MySQL/MariaDB connector
//!
//! Everything needed for connection and interaction with a MySQL-compatible
//! server: credentials, a `sqlx`-backed pool, the [`SqlExecutor`]
//! implementation the reconciliation engine drives, and server
//! version/dialect discovery.
//!
//! Driver failures that carry a server error number are surfaced as
//! [`ServerError`] so the engine's classifier can recognize conditions such
//! as "non-existing grant" by code.
#![deny(missing_docs)]

mod creds;

pub use creds::MysqlCredentials;

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlDatabaseError, MySqlPool, MySqlPoolOptions};
use sqlx::Row;
use tracing::debug;

use privsync_core::errors::ServerError;
use privsync_core::reconcile::{ServerWarning, SqlExecutor};
use privsync_core::version::ServerInfo;

/// A pooled connection to one MySQL or MariaDB server.
pub struct MysqlConnector {
    pool: MySqlPool,
}

impl MysqlConnector {
    /// Validate the credentials and open a connection pool.
    pub async fn connect(credentials: &MysqlCredentials) -> Result<Self> {
        credentials.validate()?;

        let mut options = MySqlConnectOptions::new()
            .host(&credentials.host)
            .port(credentials.port)
            .username(&credentials.user)
            .password(&credentials.password);
        if let Some(database) = &credentials.database {
            options = options.database(database);
        }

        debug!(
            host = %credentials.host,
            port = credentials.port,
            "opening connection pool"
        );
        let pool = MySqlPoolOptions::new()
            .max_connections(credentials.pool_size)
            .acquire_timeout(Duration::from_secs(credentials.connect_timeout_secs))
            .connect_with(options)
            .await
            .with_context(|| {
                format!(
                    "connecting to {}:{} as {}",
                    credentials.host, credentials.port, credentials.user
                )
            })?;

        Ok(MysqlConnector { pool })
    }

    /// Check if the connector is properly set up and return the connection
    /// status (true for connected, false for not).
    pub async fn check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    /// Resolve the server's version and dialect. Called once per connection;
    /// the result is passed into the engine as an immutable parameter.
    pub async fn server_info(&self) -> Result<ServerInfo> {
        let version: (String,) = sqlx::query_as("SELECT VERSION()")
            .fetch_one(&self.pool)
            .await
            .context("querying server version")?;
        ServerInfo::parse(&version.0)
    }

    fn wrap_error(error: sqlx::Error, statement: &str) -> anyhow::Error {
        if let sqlx::Error::Database(db_error) = &error {
            if let Some(mysql_error) = db_error.try_downcast_ref::<MySqlDatabaseError>() {
                return anyhow::Error::new(ServerError::new(
                    mysql_error.number(),
                    mysql_error.message(),
                    statement,
                ));
            }
        }
        anyhow::Error::new(error).context(format!("executing statement: {statement}"))
    }
}

#[async_trait]
impl SqlExecutor for MysqlConnector {
    async fn query_strings(&self, sql: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Self::wrap_error(e, sql))?;
        rows.iter()
            .map(|row| {
                row.try_get::<String, _>(0)
                    .with_context(|| format!("reading result row of {sql}"))
            })
            .collect()
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map_err(|e| Self::wrap_error(e, sql))?;
        Ok(())
    }

    async fn warnings(&self) -> Result<Vec<ServerWarning>> {
        let rows = sqlx::query("SHOW WARNINGS")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Self::wrap_error(e, "SHOW WARNINGS"))?;
        rows.iter()
            .map(|row| {
                let level: String = row.try_get("Level").context("reading warning level")?;
                let code: u32 = row.try_get("Code").context("reading warning code")?;
                let message: String = row.try_get("Message").context("reading warning text")?;
                Ok(ServerWarning {
                    level,
                    code: u16::try_from(code).unwrap_or(u16::MAX),
                    message,
                })
            })
            .collect()
    }
}
