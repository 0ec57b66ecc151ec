//! Server error classification
//!
//! The driver layer surfaces SQL failures as a [`ServerError`] carrying the
//! numeric error code, the server's raw message, and the statement that
//! triggered it. Classification of those codes is what makes delete and
//! re-apply idempotent: revoking a grant that never existed maps to success,
//! while a missing principal is surfaced distinctly from "no privileges".

use std::fmt::Display;

/// ER_NONEXISTING_GRANT: no such grant defined for this user/host.
pub const ER_NONEXISTING_GRANT: u16 = 1141;
/// ER_NONEXISTING_TABLE_GRANT: no such grant on the named table.
pub const ER_NONEXISTING_TABLE_GRANT: u16 = 1147;
/// ER_NONEXISTING_PROC_GRANT: no such grant on the named routine.
pub const ER_NONEXISTING_PROC_GRANT: u16 = 1403;
/// ER_ROLE_NOT_GRANTED: revoking a role the grantee does not hold.
pub const ER_ROLE_NOT_GRANTED: u16 = 3619;

/// ER_CANNOT_USER: the named principal does not exist (CREATE/DROP/ALTER).
pub const ER_CANNOT_USER: u16 = 1396;
/// ER_NO_SUCH_USER: the named principal does not exist.
pub const ER_NO_SUCH_USER: u16 = 1449;

/// A structured SQL error returned by the driver layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerError {
    /// Server error number.
    pub code: u16,
    /// Raw server error text.
    pub message: String,
    /// The statement that triggered the error.
    pub statement: String,
}

impl ServerError {
    /// Build an error for a failed statement.
    pub fn new(code: u16, message: impl Into<String>, statement: impl Into<String>) -> Self {
        ServerError {
            code,
            message: message.into(),
            statement: statement.into(),
        }
    }

    /// Whether this is the "non-existing grant" condition, observed when
    /// revoking a grant that never existed or was already removed.
    pub fn is_non_existing_grant(&self) -> bool {
        matches!(
            self.code,
            ER_NONEXISTING_GRANT
                | ER_NONEXISTING_TABLE_GRANT
                | ER_NONEXISTING_PROC_GRANT
                | ER_ROLE_NOT_GRANTED
        )
    }

    /// Whether the named principal does not exist at all.
    pub fn is_unknown_principal(&self) -> bool {
        matches!(self.code, ER_CANNOT_USER | ER_NO_SUCH_USER)
    }
}

impl Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "server error {}: {} (statement: {})",
            self.code, self.message, self.statement
        )
    }
}

impl std::error::Error for ServerError {}

/// Whether an error chain bottoms out in a swallowable "non-existing grant"
/// server error. Used by idempotent delete/reconcile paths.
pub fn is_non_existing_grant(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ServerError>()
        .map(ServerError::is_non_existing_grant)
        .unwrap_or(false)
}

/// Whether an error chain bottoms out in an "unknown principal" server error.
pub fn is_unknown_principal(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ServerError>()
        .map(ServerError::is_unknown_principal)
        .unwrap_or(false)
}
