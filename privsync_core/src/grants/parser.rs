//! SHOW GRANTS line parser
//!
//! Each line a server returns for `SHOW GRANTS FOR ...` is semi-structured
//! text. This parser turns one line into zero or one [`GrantFact`],
//! recognizing exactly two shapes:
//!
//! - `GRANT <privs> ON <db>.<table> TO <principal> [WITH GRANT OPTION]`
//! - `GRANT <roles> TO <principal> [WITH ADMIN OPTION]`
//!
//! `REVOKE`-prefixed lines (partial revokes) are skipped with a warning;
//! anything that matches neither shape is a fatal parse error so that
//! unrecognized syntax is never silently dropped.

use anyhow::{anyhow, Result};
use tracing::{debug, warn};

use crate::grants::normalize::normalize;
use crate::grants::GrantFact;
use crate::object::ObjectReference;
use crate::principal::{strip_quotes, Principal};

/// Parse one grant line reported for `principal`.
///
/// Returns `Ok(None)` when the line is legitimately ignorable: a partial
/// revoke, or a grant the server reported for a different (typically
/// broader-host) principal than the one queried.
pub fn parse_grant_line(line: &str, principal: &Principal) -> Result<Option<GrantFact>> {
    let line = line.trim().trim_end_matches(';').trim_end();
    if line.is_empty() {
        return Ok(None);
    }

    // Partial-revoke syntax (MySQL 8 `REVOKE ... ON ...` lines in SHOW
    // GRANTS output) is a known limitation, skipped rather than modeled.
    if keyword_prefix(line, "REVOKE").is_some() {
        warn!("skipping unsupported partial revoke line: {line}");
        return Ok(None);
    }

    let body = keyword_prefix(line, "GRANT")
        .ok_or_else(|| anyhow!("unrecognized grant line syntax: {line}"))?;

    let to_at = rfind_top_level(body, " TO ")
        .ok_or_else(|| anyhow!("unrecognized grant line syntax (no TO clause): {line}"))?;
    let granted = &body[..to_at];
    let grantee_clause = &body[to_at + " TO ".len()..];

    let (grantee_fragment, with_option) = split_grantee_clause(grantee_clause);
    let grantee = Principal::parse(grantee_fragment)?;
    if !principal.matches(&grantee) {
        // Servers may answer with grants held by a broader host pattern
        // than the one queried; those are not this principal's facts.
        debug!("dropping grant for other principal {grantee} (queried {principal})");
        return Ok(None);
    }

    match find_top_level(granted, " ON ") {
        Some(on_at) => {
            let privileges = tokenize_privileges(&granted[..on_at])
                .into_iter()
                // USAGE means "no privileges"; it is never a real permission.
                .filter(|p| normalize(p) != "USAGE")
                .collect();
            let object = parse_object(granted[on_at + " ON ".len()..].trim())
                .ok_or_else(|| anyhow!("unrecognized grant target in line: {line}"))?;
            Ok(Some(GrantFact::Privileges {
                object,
                privileges,
                grant_option: with_option,
            }))
        }
        None => {
            let roles = tokenize_privileges(granted)
                .iter()
                .map(|fragment| Ok(Principal::parse(fragment)?.name().to_owned()))
                .collect::<Result<_>>()?;
            Ok(Some(GrantFact::Roles {
                roles,
                admin_option: with_option,
            }))
        }
    }
}

/// Split a privilege (or role) list on top-level commas only, so a column
/// list such as `INSERT(a,b)` survives as a single token. Tokens are
/// whitespace-trimmed.
pub fn tokenize_privileges(list: &str) -> Vec<String> {
    let mut tokens = vec![];
    let mut current = String::new();
    let mut depth: u32 = 0;
    for c in list.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                if !current.trim().is_empty() {
                    tokens.push(current.trim().to_owned());
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        tokens.push(current.trim().to_owned());
    }
    tokens
}

/// Parse the `<db>.<table>` (or `PROCEDURE <name>` / `FUNCTION <name>`)
/// clause following `ON`, unquoting each component.
fn parse_object(clause: &str) -> Option<ObjectReference> {
    for keyword in ["PROCEDURE", "FUNCTION"] {
        if let Some(name) = keyword_prefix(clause, keyword) {
            let unquoted = name
                .split('.')
                .map(strip_quotes)
                .collect::<Vec<_>>()
                .join(".");
            return Some(ObjectReference::new(
                &format!("{keyword} {unquoted}"),
                "",
            ));
        }
    }
    let dot = rfind_top_level(clause, ".")?;
    Some(ObjectReference::new(&clause[..dot], &clause[dot + 1..]))
}

/// Split the grantee clause into the principal fragment and the
/// `WITH GRANT OPTION` / `WITH ADMIN OPTION` flag, dropping any trailing
/// clauses (`REQUIRE ...`, 5.x `IDENTIFIED BY PASSWORD ...`).
fn split_grantee_clause(clause: &str) -> (&str, bool) {
    let mut fragment = clause.trim();
    let mut with_option = false;
    if let Some(at) = find_top_level(fragment, " WITH ") {
        let tail = &fragment[at..];
        with_option =
            find_top_level(tail, "GRANT OPTION").is_some() || find_top_level(tail, "ADMIN OPTION").is_some();
        fragment = fragment[..at].trim();
    }
    for cut in [" REQUIRE ", " IDENTIFIED "] {
        if let Some(at) = find_top_level(fragment, cut) {
            fragment = fragment[..at].trim();
        }
    }
    (fragment, with_option)
}

/// If `line` starts with `keyword` (ASCII case-insensitive) followed by a
/// space, return the remainder.
fn keyword_prefix<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let line = line.trim_start();
    let bytes = line.as_bytes();
    // Byte-wise comparison: the keyword is ASCII, and a slice at a
    // non-char-boundary would panic on multibyte identifiers.
    if bytes.len() > keyword.len()
        && bytes[..keyword.len()].eq_ignore_ascii_case(keyword.as_bytes())
        && bytes[keyword.len()] == b' '
    {
        Some(line[keyword.len()..].trim_start())
    } else {
        None
    }
}

fn scan_top_level(haystack: &str, needle: &str, want_last: bool) -> Option<usize> {
    let bytes = haystack.as_bytes();
    let mut quote: Option<u8> = None;
    let mut depth: u32 = 0;
    let mut found = None;
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => (),
            None => match c {
                b'`' | b'\'' | b'"' => quote = Some(c),
                b'(' => depth += 1,
                b')' => depth = depth.saturating_sub(1),
                _ => {
                    if depth == 0
                        && i + needle.len() <= bytes.len()
                        && bytes[i..i + needle.len()].eq_ignore_ascii_case(needle.as_bytes())
                    {
                        if !want_last {
                            return Some(i);
                        }
                        found = Some(i);
                    }
                }
            },
        }
        i += 1;
    }
    found
}

/// First occurrence of `needle` (ASCII case-insensitive) outside quotes and
/// parentheses.
fn find_top_level(haystack: &str, needle: &str) -> Option<usize> {
    scan_top_level(haystack, needle, false)
}

/// Last occurrence of `needle` (ASCII case-insensitive) outside quotes and
/// parentheses.
fn rfind_top_level(haystack: &str, needle: &str) -> Option<usize> {
    scan_top_level(haystack, needle, true)
}
