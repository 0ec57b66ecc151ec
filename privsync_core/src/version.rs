//! Server version and dialect
//!
//! The engine consumes one read-only fact about its environment: the
//! connected server's semantic version and dialect. It is resolved once per
//! connection by the connector and passed in as an immutable parameter,
//! never looked up through global state, since the same process may
//! reconcile against servers of different versions over its lifetime.

use anyhow::{anyhow, Context, Result};
use semver::Version;

/// Role support requires a server version strictly greater than this.
fn role_support_version() -> Version {
    Version::new(8, 0, 0)
}

/// Which flavor of server we are talking to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Stock MySQL.
    MySql,
    /// The MariaDB fork, with reduced role/collation support.
    MariaDb,
}

/// The connected server's version and dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    /// Semantic server version.
    pub version: Version,
    /// Server dialect.
    pub dialect: Dialect,
}

impl ServerInfo {
    /// Parse the string returned by `SELECT VERSION()`, e.g. `8.0.34`,
    /// `5.7.30-log`, or `10.6.12-MariaDB-1:10.6.12+maria~ubu2004`.
    pub fn parse(version_string: &str) -> Result<Self> {
        let dialect = if version_string.to_lowercase().contains("mariadb") {
            Dialect::MariaDb
        } else {
            Dialect::MySql
        };

        let numeric: String = version_string
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        let mut parts = numeric.split('.').filter(|p| !p.is_empty());
        let major = parts.next().ok_or_else(|| {
            anyhow!("could not parse server version from {version_string:?}")
        })?;
        let minor = parts.next().unwrap_or("0");
        let patch = parts.next().unwrap_or("0");
        let version = Version::parse(&format!("{major}.{minor}.{patch}"))
            .with_context(|| format!("could not parse server version from {version_string:?}"))?;

        Ok(ServerInfo { version, dialect })
    }

    /// Whether the server supports role grants: stock MySQL strictly newer
    /// than 8.0.0. MariaDB is treated as the reduced-support fork.
    pub fn supports_roles(&self) -> bool {
        self.dialect == Dialect::MySql && self.version > role_support_version()
    }

    /// Whether a `REQUIRE <option>` clause belongs on the GRANT statement.
    /// MySQL 8 rejects it there (the requirement goes through
    /// `ALTER USER` instead); older MySQL and MariaDB accept it.
    pub fn require_on_grant(&self) -> bool {
        match self.dialect {
            Dialect::MariaDb => true,
            Dialect::MySql => self.version < Version::new(8, 0, 0),
        }
    }

    /// Human-readable form for error messages.
    pub fn describe(&self) -> String {
        match self.dialect {
            Dialect::MySql => format!("MySQL {}", self.version),
            Dialect::MariaDb => format!("MariaDB {}", self.version),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use anyhow::Result;

    #[test]
    fn test_parse_plain_mysql_version() -> Result<()> {
        let info = ServerInfo::parse("8.0.34")?;
        assert_eq!(info.version, Version::new(8, 0, 34));
        assert_eq!(info.dialect, Dialect::MySql);
        Ok(())
    }

    #[test]
    fn test_parse_version_with_suffix() -> Result<()> {
        let info = ServerInfo::parse("5.7.30-log")?;
        assert_eq!(info.version, Version::new(5, 7, 30));
        Ok(())
    }

    #[test]
    fn test_parse_mariadb_version() -> Result<()> {
        let info = ServerInfo::parse("10.6.12-MariaDB-1:10.6.12+maria~ubu2004")?;
        assert_eq!(info.version, Version::new(10, 6, 12));
        assert_eq!(info.dialect, Dialect::MariaDb);
        Ok(())
    }

    #[test]
    fn test_unparseable_version_is_an_error() {
        assert!(ServerInfo::parse("development").is_err());
    }

    #[test]
    fn test_role_support_gate() -> Result<()> {
        assert!(!ServerInfo::parse("5.7.30")?.supports_roles());
        // Strictly greater than 8.0.0.
        assert!(!ServerInfo::parse("8.0.0")?.supports_roles());
        assert!(ServerInfo::parse("8.0.1")?.supports_roles());
        assert!(!ServerInfo::parse("10.6.12-MariaDB")?.supports_roles());
        Ok(())
    }

    #[test]
    fn test_require_clause_placement() -> Result<()> {
        assert!(ServerInfo::parse("5.7.30")?.require_on_grant());
        assert!(!ServerInfo::parse("8.0.34")?.require_on_grant());
        assert!(ServerInfo::parse("10.6.12-MariaDB")?.require_on_grant());
        Ok(())
    }
}
