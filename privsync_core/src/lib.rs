//!
//! Declarative grant reconciliation for MySQL-compatible servers
//!
//! Given a desired set of privileges or role memberships for a principal,
//! read the actual state with `SHOW GRANTS`, compute the minimal set of
//! GRANT/REVOKE statements to converge, and apply them idempotently.
//! Connectors implement [`SqlExecutor`] to plug a driver in; everything else
//! lives here.
#![deny(missing_docs)]

pub use principal::Principal;
pub use reconcile::{GrantReconciler, GrantSpec, SqlExecutor};
pub use version::ServerInfo;

pub mod diff;
pub mod errors;
pub mod grants;
pub mod locks;
pub mod logging;
pub mod object;
pub mod principal;
pub mod reconcile;
pub mod statements;
pub mod version;
