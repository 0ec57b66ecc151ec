//! Statement rendering
//!
//! Renders the statement shapes the engine depends on (`SHOW GRANTS FOR`,
//! `GRANT`, `REVOKE`, and the `ALTER USER ... REQUIRE` fallback),
//! honoring version-dependent syntax: GRANT vs ADMIN option, REQUIRE-clause
//! placement, and the role-support gate. Version gates are evaluated from
//! the [`ServerInfo`] passed in per call, never cached.

use std::collections::BTreeSet;

use anyhow::{bail, Result};

use crate::object::ObjectReference;
use crate::principal::Principal;
use crate::version::ServerInfo;

/// `SHOW GRANTS FOR <principal>`.
pub fn show_grants(principal: &Principal) -> String {
    format!("SHOW GRANTS FOR {principal}")
}

/// `GRANT <privileges> ON <object> TO <principal>`, with the TLS
/// requirement inlined on dialects that accept it there and
/// ` WITH GRANT OPTION` when requested.
pub fn grant_privileges(
    privileges: &[String],
    object: &ObjectReference,
    principal: &Principal,
    grant_option: bool,
    tls_requirement: Option<&str>,
    server: &ServerInfo,
) -> String {
    let mut statement = format!(
        "GRANT {} ON {object} TO {principal}",
        privileges.join(", ")
    );
    if let Some(tls) = tls_requirement {
        if server.require_on_grant() {
            statement.push_str(&format!(" REQUIRE {tls}"));
        }
    }
    if grant_option {
        statement.push_str(" WITH GRANT OPTION");
    }
    statement
}

/// `REVOKE <privileges> ON <object> FROM <principal>`. When the whole
/// privilege set is being revoked and the grant carried the grant option,
/// `GRANT OPTION` is appended to the revoke list so nothing is left behind.
pub fn revoke_privileges(
    privileges: &[String],
    object: &ObjectReference,
    principal: &Principal,
    revoke_grant_option: bool,
) -> String {
    let mut list = privileges.to_vec();
    if revoke_grant_option {
        list.push("GRANT OPTION".to_owned());
    }
    format!(
        "REVOKE {} ON {object} FROM {principal}",
        list.join(", ")
    )
}

/// `ALTER USER <principal> REQUIRE <option>`, for dialects that reject a
/// REQUIRE clause on GRANT.
pub fn alter_tls_requirement(principal: &Principal, tls_requirement: &str) -> String {
    format!("ALTER USER {principal} REQUIRE {tls_requirement}")
}

/// `GRANT <roles> TO <principal> [WITH ADMIN OPTION]`.
///
/// Fails fast when the server does not support roles, rather than letting
/// the server reject the statement with a less legible error.
pub fn grant_roles(
    roles: &BTreeSet<String>,
    principal: &Principal,
    admin_option: bool,
    server: &ServerInfo,
) -> Result<String> {
    check_role_support(server)?;
    let mut statement = format!("GRANT {} TO {principal}", join_roles(roles));
    if admin_option {
        statement.push_str(" WITH ADMIN OPTION");
    }
    Ok(statement)
}

/// `REVOKE <roles> FROM <principal>`. Admin option is revoked implicitly
/// with the role itself.
pub fn revoke_roles(
    roles: &BTreeSet<String>,
    principal: &Principal,
    server: &ServerInfo,
) -> Result<String> {
    check_role_support(server)?;
    Ok(format!("REVOKE {} FROM {principal}", join_roles(roles)))
}

fn check_role_support(server: &ServerInfo) -> Result<()> {
    if !server.supports_roles() {
        bail!(
            "role grants are not supported on {}; they require MySQL newer than 8.0.0",
            server.describe()
        );
    }
    Ok(())
}

fn join_roles(roles: &BTreeSet<String>) -> String {
    roles
        .iter()
        .map(|r| format!("'{r}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    use anyhow::Result;

    fn mysql8() -> ServerInfo {
        ServerInfo::parse("8.0.34").unwrap()
    }

    fn mysql57() -> ServerInfo {
        ServerInfo::parse("5.7.30").unwrap()
    }

    #[test]
    fn test_show_grants() {
        assert_eq!(
            show_grants(&Principal::user("u", "h")),
            "SHOW GRANTS FOR 'u'@'h'"
        );
    }

    #[test]
    fn test_grant_statement() {
        let statement = grant_privileges(
            &["SELECT".to_owned(), "INSERT(a,b)".to_owned()],
            &ObjectReference::new("db", "tbl"),
            &Principal::user("u", "h"),
            true,
            None,
            &mysql8(),
        );
        assert_eq!(
            statement,
            "GRANT SELECT, INSERT(a,b) ON `db`.`tbl` TO 'u'@'h' WITH GRANT OPTION"
        );
    }

    #[test]
    fn test_require_clause_inline_on_old_mysql() {
        let statement = grant_privileges(
            &["SELECT".to_owned()],
            &ObjectReference::new("db", "*"),
            &Principal::user("u", "h"),
            false,
            Some("SSL"),
            &mysql57(),
        );
        assert_eq!(statement, "GRANT SELECT ON `db`.* TO 'u'@'h' REQUIRE SSL");
    }

    #[test]
    fn test_require_clause_omitted_on_mysql8() {
        let statement = grant_privileges(
            &["SELECT".to_owned()],
            &ObjectReference::new("db", "*"),
            &Principal::user("u", "h"),
            false,
            Some("SSL"),
            &mysql8(),
        );
        assert_eq!(statement, "GRANT SELECT ON `db`.* TO 'u'@'h'");
        assert_eq!(
            alter_tls_requirement(&Principal::user("u", "h"), "SSL"),
            "ALTER USER 'u'@'h' REQUIRE SSL"
        );
    }

    #[test]
    fn test_revoke_appends_grant_option() {
        let statement = revoke_privileges(
            &["SELECT".to_owned(), "INSERT".to_owned()],
            &ObjectReference::new("db", "tbl"),
            &Principal::user("u", "h"),
            true,
        );
        assert_eq!(
            statement,
            "REVOKE SELECT, INSERT, GRANT OPTION ON `db`.`tbl` FROM 'u'@'h'"
        );
    }

    #[test]
    fn test_role_statements() -> Result<()> {
        let roles = std::collections::BTreeSet::from(["r1".to_owned(), "r2".to_owned()]);
        let principal = Principal::user("u", "h");
        assert_eq!(
            grant_roles(&roles, &principal, true, &mysql8())?,
            "GRANT 'r1', 'r2' TO 'u'@'h' WITH ADMIN OPTION"
        );
        assert_eq!(
            revoke_roles(&roles, &principal, &mysql8())?,
            "REVOKE 'r1', 'r2' FROM 'u'@'h'"
        );
        Ok(())
    }

    #[test]
    fn test_role_gate_fails_fast_below_threshold() {
        let roles = std::collections::BTreeSet::from(["r1".to_owned()]);
        let err = grant_roles(&roles, &Principal::user("u", "h"), false, &mysql57()).unwrap_err();
        assert!(err.to_string().contains("8.0.0"));
        assert!(err.to_string().contains("MySQL 5.7.30"));
    }
}
