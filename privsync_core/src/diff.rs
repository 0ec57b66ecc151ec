//! Diff desired grant state against server-reported state
//!
//! The diff prefers the server's original spelling wherever it is
//! semantically equivalent to the desired value: that spelling is guaranteed
//! to already be legal, and reusing it prevents spurious statements when only
//! case or column order differs.

use std::collections::BTreeSet;

use crate::grants::normalize::normalize;

/// The outcome of comparing desired privileges against held privileges.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PrivilegeDiff {
    /// Desired privileges not held: must be granted, in the caller's spelling.
    pub grant: Vec<String>,
    /// Held privileges not desired: must be revoked, in the server's spelling.
    pub revoke: Vec<String>,
    /// Desired privileges already held, in the server's spelling.
    pub keep: Vec<String>,
}

impl PrivilegeDiff {
    /// True when converged: nothing to grant, nothing to revoke.
    pub fn is_empty(&self) -> bool {
        self.grant.is_empty() && self.revoke.is_empty()
    }

    /// The caller-visible view of the privilege set after convergence:
    /// server spelling where an equivalent privilege exists, declared
    /// spelling for net-new privileges.
    pub fn resolved(&self) -> Vec<String> {
        self.keep.iter().chain(self.grant.iter()).cloned().collect()
    }
}

/// Compare privileges held on the server (`have`) against the declared set
/// (`want`). Input order is preserved in each output set.
pub fn diff_privileges(have: &[String], want: &[String]) -> PrivilegeDiff {
    let have_by_key: Vec<(String, &String)> =
        have.iter().map(|p| (normalize(p), p)).collect();
    let want_keys: BTreeSet<String> = want.iter().map(|p| normalize(p)).collect();

    let mut diff = PrivilegeDiff::default();
    for wanted in want {
        let key = normalize(wanted);
        match have_by_key.iter().find(|(k, _)| *k == key) {
            Some((_, held)) => diff.keep.push((*held).clone()),
            None => diff.grant.push(wanted.clone()),
        }
    }
    for (key, held) in &have_by_key {
        if !want_keys.contains(key) {
            diff.revoke.push((*held).clone());
        }
    }
    diff
}

/// The outcome of comparing desired roles against held roles.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoleDiff {
    /// Roles in the declared set but not held.
    pub grant: BTreeSet<String>,
    /// Roles held but not declared.
    pub revoke: BTreeSet<String>,
}

impl RoleDiff {
    /// True when converged.
    pub fn is_empty(&self) -> bool {
        self.grant.is_empty() && self.revoke.is_empty()
    }
}

/// Role names compare literally, so the diff is a plain set difference.
pub fn diff_roles(have: &BTreeSet<String>, want: &BTreeSet<String>) -> RoleDiff {
    RoleDiff {
        grant: want.difference(have).cloned().collect(),
        revoke: have.difference(want).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn test_equal_sets_produce_empty_diff() {
        let have = owned(&["SELECT", "INSERT(a,b)"]);
        let want = owned(&["select", "INSERT (b, a)"]);
        let diff = diff_privileges(&have, &want);
        assert!(diff.is_empty());
        assert_eq!(diff.keep, have);
    }

    #[test]
    fn test_server_spelling_is_preserved() {
        let have = owned(&["SELECT(c1,c2)"]);
        let want = owned(&["select(c2,c1)"]);
        let diff = diff_privileges(&have, &want);
        assert_eq!(diff.keep, owned(&["SELECT(c1,c2)"]));
        assert_eq!(diff.resolved(), owned(&["SELECT(c1,c2)"]));
    }

    #[test]
    fn test_table_privilege_convergence() {
        let have = owned(&["SELECT", "INSERT"]);
        let want = owned(&["SELECT", "UPDATE"]);
        let diff = diff_privileges(&have, &want);
        assert_eq!(diff.grant, owned(&["UPDATE"]));
        assert_eq!(diff.revoke, owned(&["INSERT"]));
        assert_eq!(diff.keep, owned(&["SELECT"]));
    }

    #[test]
    fn test_net_new_uses_caller_spelling() {
        let diff = diff_privileges(&[], &owned(&["Select"]));
        assert_eq!(diff.grant, owned(&["Select"]));
        assert_eq!(diff.resolved(), owned(&["Select"]));
    }

    #[test]
    fn test_role_convergence() {
        let have = BTreeSet::from(["r1".to_owned(), "r2".to_owned()]);
        let want = BTreeSet::from(["r2".to_owned(), "r3".to_owned()]);
        let diff = diff_roles(&have, &want);
        assert_eq!(diff.grant, BTreeSet::from(["r3".to_owned()]));
        assert_eq!(diff.revoke, BTreeSet::from(["r1".to_owned()]));
    }

    #[test]
    fn test_role_names_compare_literally() {
        let have = BTreeSet::from(["Reader".to_owned()]);
        let want = BTreeSet::from(["reader".to_owned()]);
        assert!(!diff_roles(&have, &want).is_empty());
    }
}
