//! Grant principals
//!
//! A principal is the subject of a grant: a user identity (name plus host
//! pattern) or a role. The canonical textual form is what every generated
//! statement uses, and it also serves as the key for per-principal locking.

use std::fmt::Display;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// The subject of a grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Principal {
    /// A user identity. The host is a pattern (`%`, `10.0.%`, a hostname, ...).
    User {
        /// Account name, without quoting.
        name: String,
        /// Host pattern, without quoting.
        host: String,
    },
    /// A role. Roles have no host component of their own.
    Role {
        /// Role name, without quoting.
        name: String,
    },
}

impl Principal {
    /// Build a user principal, stripping any quoting from the components.
    pub fn user(name: &str, host: &str) -> Self {
        Principal::User {
            name: strip_quotes(name).to_owned(),
            host: strip_quotes(host).to_owned(),
        }
    }

    /// Build a role principal, stripping any quoting from the name.
    pub fn role(name: &str) -> Self {
        Principal::Role {
            name: strip_quotes(name).to_owned(),
        }
    }

    /// The principal's name component.
    pub fn name(&self) -> &str {
        match self {
            Principal::User { name, .. } => name,
            Principal::Role { name } => name,
        }
    }

    /// Parse the grantee fragment of a grant line, e.g. `` `u`@`%` ``,
    /// `'app'@'10.0.%'`, or `` `reader` `` (a role, or a user the server
    /// reported without a host part).
    ///
    /// A fragment without an `@` outside quotes parses as a role; servers
    /// that report roles with an implicit host (`` `r`@`%` ``) parse as a
    /// user, and comparison against a role falls back to the name component
    /// (see [`Principal::matches`]).
    pub fn parse(fragment: &str) -> Result<Self> {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            bail!("empty principal fragment");
        }
        match split_at_unquoted_at(fragment) {
            Some((name, host)) => Ok(Principal::user(name, host)),
            None => Ok(Principal::role(fragment)),
        }
    }

    /// Whether a principal reported by the server refers to the same subject
    /// as this one.
    ///
    /// This is looser than equality in one direction: a role granted on a
    /// MySQL 8 server is reported as `` `role`@`%` ``, so a reported user
    /// with the default host pattern matches a queried role of the same name.
    pub fn matches(&self, reported: &Principal) -> bool {
        if self == reported {
            return true;
        }
        matches!(
            (self, reported),
            (Principal::Role { name }, Principal::User { name: n, host })
                if name == n && host == "%"
        )
    }
}

/// Canonical text: `'name'@'host'` for users, `'name'` for roles.
impl Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Principal::User { name, host } => write!(f, "'{name}'@'{host}'"),
            Principal::Role { name } => write!(f, "'{name}'"),
        }
    }
}

/// Case-preserving, quote-stripped comparison of the components.
impl PartialEq for Principal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Principal::User { name, host },
                Principal::User {
                    name: other_name,
                    host: other_host,
                },
            ) => name == other_name && host == other_host,
            (Principal::Role { name }, Principal::Role { name: other_name }) => name == other_name,
            _ => false,
        }
    }
}

impl Eq for Principal {}

impl std::hash::Hash for Principal {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Principal::User { name, host } => {
                name.hash(state);
                host.hash(state);
            }
            Principal::Role { name } => name.hash(state),
        }
    }
}

/// Strip one layer of matching quotes (backtick, single, or double) from a
/// string. Unmatched or absent quotes leave the string untouched.
pub(crate) fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    let mut chars = s.chars();
    match (chars.next(), chars.next_back()) {
        (Some(first), Some(last)) if first == last && matches!(first, '`' | '\'' | '"') => {
            &s[1..s.len() - 1]
        }
        _ => s,
    }
}

/// Split `name@host` at the first `@` that is not inside a quoted section.
fn split_at_unquoted_at(fragment: &str) -> Option<(&str, &str)> {
    let mut quote: Option<char> = None;
    for (i, c) in fragment.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => (),
            None => match c {
                '`' | '\'' | '"' => quote = Some(c),
                '@' => return Some((&fragment[..i], &fragment[i + 1..])),
                _ => (),
            },
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    use anyhow::Result;

    #[test]
    fn test_user_canonical_form() {
        let p = Principal::user("app", "10.0.%");
        assert_eq!(p.to_string(), "'app'@'10.0.%'");
    }

    #[test]
    fn test_role_canonical_form() {
        let p = Principal::role("reader");
        assert_eq!(p.to_string(), "'reader'");
    }

    #[test]
    fn test_quoted_components_compare_equal() {
        assert_eq!(Principal::user("`app`", "'%'"), Principal::user("app", "%"));
    }

    #[test]
    fn test_comparison_is_case_preserving() {
        assert_ne!(Principal::user("App", "%"), Principal::user("app", "%"));
    }

    #[test]
    fn test_parse_backtick_user() -> Result<()> {
        let p = Principal::parse("`u`@`%`")?;
        assert_eq!(p, Principal::user("u", "%"));
        Ok(())
    }

    #[test]
    fn test_parse_single_quoted_user() -> Result<()> {
        let p = Principal::parse("'app'@'10.0.%'")?;
        assert_eq!(p, Principal::user("app", "10.0.%"));
        Ok(())
    }

    #[test]
    fn test_parse_bare_name_is_role() -> Result<()> {
        let p = Principal::parse("`reader`")?;
        assert_eq!(p, Principal::role("reader"));
        Ok(())
    }

    #[test]
    fn test_at_inside_quotes_does_not_split() -> Result<()> {
        let p = Principal::parse("`strange@name`@`%`")?;
        assert_eq!(p, Principal::user("strange@name", "%"));
        Ok(())
    }

    #[test]
    fn test_role_matches_reported_user_with_default_host() -> Result<()> {
        let queried = Principal::role("reader");
        let reported = Principal::parse("`reader`@`%`")?;
        assert!(queried.matches(&reported));
        assert!(!queried.matches(&Principal::parse("`reader`@`10.%`")?));
        Ok(())
    }
}
