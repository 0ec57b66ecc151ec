//! The reconciliation driver
//!
//! Ties the pieces together: read the principal's grants through the
//! executor seam, parse and aggregate them, diff against the declared state,
//! render the corrective statements, execute them, and re-read to confirm
//! convergence. Every sequence holds the per-principal lock for its whole
//! read-diff-write span.
//!
//! The driver performs no retries of its own, and there is no atomicity
//! across the grant and revoke phases of one diff: a failure in between
//! leaves superfluous privileges that the next reconciliation call detects
//! and corrects.

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::diff::{diff_privileges, diff_roles};
use crate::errors::is_non_existing_grant;
use crate::grants::parser::parse_grant_line;
use crate::grants::GrantView;
use crate::locks::KeyedLocks;
use crate::object::ObjectReference;
use crate::principal::Principal;
use crate::statements;
use crate::version::ServerInfo;

/// One row of `SHOW WARNINGS` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerWarning {
    /// Warning level (`Note`, `Warning`, ...).
    pub level: String,
    /// Warning code.
    pub code: u16,
    /// Warning text.
    pub message: String,
}

/// The statement-execution seam the engine depends on. Implementations map
/// driver failures to [`crate::errors::ServerError`] so the classifier can
/// see the error number.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Run a statement returning single-column string rows (`SHOW GRANTS`).
    async fn query_strings(&self, sql: &str) -> Result<Vec<String>>;
    /// Execute a statement with no interesting result set.
    async fn execute(&self, sql: &str) -> Result<()>;
    /// Fetch warnings raised by the previous statement (`SHOW WARNINGS`).
    async fn warnings(&self) -> Result<Vec<ServerWarning>>;
}

/// One declared grant: privileges on an object, or role memberships, for a
/// principal. Mutual exclusivity of the two forms is validated by the
/// configuration layer and re-checked here on entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantSpec {
    /// The grant subject.
    pub principal: Principal,
    /// The grant target. Present iff this is a privilege spec.
    #[serde(default)]
    pub object: Option<ObjectReference>,
    /// Desired privileges, in the caller's spelling.
    #[serde(default)]
    pub privileges: Vec<String>,
    /// Desired role memberships.
    #[serde(default)]
    pub roles: BTreeSet<String>,
    /// GRANT OPTION for privilege specs, ADMIN OPTION for role specs.
    #[serde(default)]
    pub grant_option: bool,
    /// TLS requirement (`SSL`, `X509`, ...) to place on the principal.
    #[serde(default)]
    pub tls_requirement: Option<String>,
}

impl GrantSpec {
    /// Whether this spec declares role memberships rather than privileges.
    pub fn is_role_spec(&self) -> bool {
        !self.roles.is_empty()
    }

    fn validate(&self) -> Result<&Self> {
        match (&self.object, self.roles.is_empty()) {
            (Some(_), true) => Ok(self),
            (None, false) if self.privileges.is_empty() => Ok(self),
            (None, false) => bail!(
                "invalid grant for {}: declares both privileges and roles",
                self.principal
            ),
            (Some(_), false) => bail!(
                "invalid grant for {}: declares both an object and roles",
                self.principal
            ),
            (None, true) => bail!(
                "invalid grant for {}: declares neither an object nor roles",
                self.principal
            ),
        }
    }

    fn object(&self) -> &ObjectReference {
        // Only called on validated privilege specs.
        self.object
            .as_ref()
            .unwrap_or_else(|| unreachable!("validated privilege spec has an object"))
    }
}

/// What a principal actually holds for one spec's key, after a read or a
/// converging write.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObservedGrant {
    /// Privileges: server spelling where an equivalent privilege exists,
    /// declared spelling for net-new ones.
    pub privileges: Vec<String>,
    /// Held roles for the spec's admin-option flag.
    pub roles: BTreeSet<String>,
}

/// Drives grant reconciliation for one server connection.
pub struct GrantReconciler<'a> {
    executor: &'a dyn SqlExecutor,
    server: ServerInfo,
    locks: Arc<KeyedLocks>,
}

impl<'a> GrantReconciler<'a> {
    /// A reconciler over `executor`, for a server whose version and dialect
    /// were resolved once at connection time.
    pub fn new(executor: &'a dyn SqlExecutor, server: ServerInfo, locks: Arc<KeyedLocks>) -> Self {
        GrantReconciler {
            executor,
            server,
            locks,
        }
    }

    /// Read the current state for the spec's key without changing anything.
    pub async fn read(&self, spec: &GrantSpec) -> Result<ObservedGrant> {
        spec.validate()?;
        let _guard = self.locks.acquire(&spec.principal.to_string()).await;
        let view = self.read_view(&spec.principal).await?;
        Ok(self.observe(spec, &view))
    }

    /// Bring a newly-managed grant into existence.
    ///
    /// A pre-existing grant for the same key that is normalize-equal to the
    /// declared set is adopted silently; any other pre-existing privileges
    /// are treated as drift and are fatal, so manually-granted privileges
    /// are never silently overwritten.
    pub async fn create(&self, spec: &GrantSpec) -> Result<ObservedGrant> {
        spec.validate()?;
        self.check_role_gate(spec)?;
        let _guard = self.locks.acquire(&spec.principal.to_string()).await;
        let view = self.read_view(&spec.principal).await?;

        if !spec.is_role_spec() && view.has_privileges_on(spec.object()) {
            let have = view.privileges_for(spec.object(), spec.grant_option);
            let other = view.privileges_for(spec.object(), !spec.grant_option);
            // Adoption requires an exact match of the whole key: the held
            // set normalize-equal to the declared one, under the declared
            // grant-option flag and nothing under the other flag.
            let adoptable = other.is_empty() && diff_privileges(have, &spec.privileges).is_empty();
            if !adoptable {
                let held: Vec<String> = have.iter().chain(other.iter()).cloned().collect();
                bail!(
                    "{} already has an unmanaged grant on {} ({}); reconcile it out-of-band before managing it",
                    spec.principal,
                    spec.object(),
                    held.join(", ")
                );
            }
        }

        self.converge(spec, &view).await
    }

    /// Converge an already-managed grant to the declared state.
    pub async fn apply(&self, spec: &GrantSpec) -> Result<ObservedGrant> {
        spec.validate()?;
        self.check_role_gate(spec)?;
        let _guard = self.locks.acquire(&spec.principal.to_string()).await;
        let view = self.read_view(&spec.principal).await?;
        self.converge(spec, &view).await
    }

    /// Revoke everything the spec declares. Idempotent: revoking a grant
    /// that never existed (or was already removed) is success.
    pub async fn destroy(&self, spec: &GrantSpec) -> Result<()> {
        spec.validate()?;
        self.check_role_gate(spec)?;
        let _guard = self.locks.acquire(&spec.principal.to_string()).await;

        let statement = if spec.is_role_spec() {
            statements::revoke_roles(&spec.roles, &spec.principal, &self.server)?
        } else if spec.privileges.is_empty() && !spec.grant_option {
            return Ok(());
        } else {
            statements::revoke_privileges(
                &spec.privileges,
                spec.object(),
                &spec.principal,
                spec.grant_option,
            )
        };

        match self.execute(&statement).await {
            Ok(()) => Ok(()),
            Err(e) if is_non_existing_grant(&e) => {
                debug!("grant already absent, nothing to revoke: {statement}");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// `SHOW GRANTS`, parse every line, aggregate. Built fresh on every
    /// call; the server is the source of truth.
    async fn read_view(&self, principal: &Principal) -> Result<GrantView> {
        let sql = statements::show_grants(principal);
        let lines = self
            .executor
            .query_strings(&sql)
            .await
            .with_context(|| format!("reading grants for {principal}"))?;
        let mut view = GrantView::default();
        for line in &lines {
            if let Some(fact) = parse_grant_line(line, principal)? {
                view.add(fact);
            }
        }
        Ok(view)
    }

    async fn converge(&self, spec: &GrantSpec, view: &GrantView) -> Result<ObservedGrant> {
        if spec.is_role_spec() {
            self.converge_roles(spec, view).await?;
        } else {
            self.converge_privileges(spec, view).await?;
        }

        // Re-read to confirm the writes landed.
        let after = self.read_view(&spec.principal).await?;
        if !self.converged(spec, &after) {
            bail!(
                "grant for {} did not converge after applying statements",
                spec.principal
            );
        }
        Ok(self.observe(spec, &after))
    }

    async fn converge_privileges(&self, spec: &GrantSpec, view: &GrantView) -> Result<()> {
        let have = view.privileges_for(spec.object(), spec.grant_option);
        let diff = diff_privileges(have, &spec.privileges);
        let tls = spec.tls_requirement.as_deref();

        if !diff.grant.is_empty() {
            self.execute(&statements::grant_privileges(
                &diff.grant,
                spec.object(),
                &spec.principal,
                spec.grant_option,
                tls,
                &self.server,
            ))
            .await?;
        } else if diff.is_empty() && tls.is_none() {
            debug!("{} already converged on {}", spec.principal, spec.object());
        }

        // The requirement cannot ride on a GRANT we did not issue: restate
        // it through USAGE (grants nothing) or ALTER USER, per dialect.
        if let Some(tls) = tls {
            if !self.server.require_on_grant() {
                self.execute(&statements::alter_tls_requirement(&spec.principal, tls))
                    .await?;
            } else if diff.grant.is_empty() {
                self.execute(&statements::grant_privileges(
                    &["USAGE".to_owned()],
                    spec.object(),
                    &spec.principal,
                    false,
                    Some(tls),
                    &self.server,
                ))
                .await?;
            }
        }

        if !diff.revoke.is_empty() {
            self.execute(&statements::revoke_privileges(
                &diff.revoke,
                spec.object(),
                &spec.principal,
                false,
            ))
            .await?;
        }
        Ok(())
    }

    async fn converge_roles(&self, spec: &GrantSpec, view: &GrantView) -> Result<()> {
        let have = view.roles(spec.grant_option);
        let diff = diff_roles(&have, &spec.roles);
        if !diff.grant.is_empty() {
            self.execute(&statements::grant_roles(
                &diff.grant,
                &spec.principal,
                spec.grant_option,
                &self.server,
            )?)
            .await?;
        }
        if !diff.revoke.is_empty() {
            self.execute(&statements::revoke_roles(
                &diff.revoke,
                &spec.principal,
                &self.server,
            )?)
            .await?;
        }
        Ok(())
    }

    fn converged(&self, spec: &GrantSpec, view: &GrantView) -> bool {
        if spec.is_role_spec() {
            diff_roles(&view.roles(spec.grant_option), &spec.roles).is_empty()
        } else {
            diff_privileges(
                view.privileges_for(spec.object(), spec.grant_option),
                &spec.privileges,
            )
            .is_empty()
        }
    }

    fn observe(&self, spec: &GrantSpec, view: &GrantView) -> ObservedGrant {
        if spec.is_role_spec() {
            ObservedGrant {
                privileges: vec![],
                roles: view.roles(spec.grant_option),
            }
        } else {
            let diff = diff_privileges(
                view.privileges_for(spec.object(), spec.grant_option),
                &spec.privileges,
            );
            ObservedGrant {
                privileges: diff.resolved(),
                roles: BTreeSet::new(),
            }
        }
    }

    /// Fail a role spec before any statement is issued when the server
    /// cannot accept role grants at all.
    fn check_role_gate(&self, spec: &GrantSpec) -> Result<()> {
        if spec.is_role_spec() && !self.server.supports_roles() {
            bail!(
                "role grants are not supported on {}; they require MySQL newer than 8.0.0",
                self.server.describe()
            );
        }
        Ok(())
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        debug!("executing: {sql}");
        self.executor.execute(sql).await?;
        for warning in self.executor.warnings().await? {
            warn!(
                "server warning {} ({}) after statement: {}",
                warning.code, warning.level, warning.message
            );
        }
        Ok(())
    }
}
