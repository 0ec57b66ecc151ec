//! Parsed grant state
//!
//! A [`GrantFact`] is one parsed unit of server-reported privilege or
//! role-membership information; a [`GrantView`] aggregates every fact for one
//! principal into the shape the diff engine consumes. Views are built fresh
//! on every read; the server is the source of truth and nothing here is
//! cached across reconciliation calls.

pub mod normalize;
pub mod parser;

use std::collections::{BTreeSet, HashMap};

use crate::grants::normalize::normalize;
use crate::object::ObjectReference;

/// One parsed grant line. Never mutated after parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantFact {
    /// Privileges on one object.
    Privileges {
        /// What the privileges apply to.
        object: ObjectReference,
        /// Privilege strings in the server's original spelling.
        privileges: Vec<String>,
        /// Whether the grant carries `WITH GRANT OPTION`.
        grant_option: bool,
    },
    /// Role memberships.
    Roles {
        /// The granted role names.
        roles: BTreeSet<String>,
        /// Whether the membership carries `WITH ADMIN OPTION`.
        admin_option: bool,
    },
}

/// Everything the server reported for one principal, keyed the way the diff
/// engine needs it: privilege facts by `(object, grant_option)`, role facts
/// by `admin_option`.
#[derive(Debug, Default)]
pub struct GrantView {
    privileges: HashMap<(ObjectReference, bool), Vec<String>>,
    roles: HashMap<bool, BTreeSet<String>>,
}

impl GrantView {
    /// Build a view from parsed facts.
    pub fn from_facts(facts: impl IntoIterator<Item = GrantFact>) -> Self {
        let mut view = GrantView::default();
        for fact in facts {
            view.add(fact);
        }
        view
    }

    /// Fold one fact into the view. Privileges are deduplicated by
    /// normalized form, keeping the first spelling the server reported.
    pub fn add(&mut self, fact: GrantFact) {
        match fact {
            GrantFact::Privileges {
                object,
                privileges,
                grant_option,
            } => {
                let existing = self.privileges.entry((object, grant_option)).or_default();
                for privilege in privileges {
                    if !existing.iter().any(|p| normalize(p) == normalize(&privilege)) {
                        existing.push(privilege);
                    }
                }
            }
            GrantFact::Roles {
                roles,
                admin_option,
            } => {
                self.roles.entry(admin_option).or_default().extend(roles);
            }
        }
    }

    /// Privileges held on `object` with the given grant-option flag, in the
    /// server's spelling and order.
    pub fn privileges_for(&self, object: &ObjectReference, grant_option: bool) -> &[String] {
        self.privileges
            .get(&(object.clone(), grant_option))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether any privileges are held on `object` under either
    /// grant-option flag.
    pub fn has_privileges_on(&self, object: &ObjectReference) -> bool {
        [false, true]
            .iter()
            .any(|flag| !self.privileges_for(object, *flag).is_empty())
    }

    /// Roles held with the given admin-option flag.
    pub fn roles(&self, admin_option: bool) -> BTreeSet<String> {
        self.roles.get(&admin_option).cloned().unwrap_or_default()
    }
}
