//! Privilege canonicalization
//!
//! Two server dialects (and two humans) rarely spell the same privilege the
//! same way: `all` vs `ALL PRIVILEGES`, `SELECT (b, a)` vs `SELECT(a,b)`.
//! Normalization maps every spelling of one privilege to a single comparison
//! key so the diff engine can treat them as equal.

/// Map a privilege string to its canonical comparison key.
///
/// Case-, whitespace-, and column-order-insensitive: spaces and backticks are
/// stripped, the result is uppercased, the `ALL`/`ALL PRIVILEGES` aliases are
/// folded together, and a parenthesized column list is sorted
/// lexicographically and rejoined as `PRIV(c1, c2, ...)`.
pub fn normalize(privilege: &str) -> String {
    let stripped: String = privilege
        .chars()
        .filter(|c| *c != ' ' && *c != '`')
        .collect::<String>()
        .to_uppercase();

    if stripped == "ALL" || stripped == "ALLPRIVILEGES" {
        return "ALL PRIVILEGES".to_owned();
    }

    // Sort a column list so e.g. SELECT(b,a) and SELECT(a,b) share a key.
    if let Some((name, rest)) = stripped.split_once('(') {
        if let Some(columns) = rest.strip_suffix(')') {
            let mut columns: Vec<&str> = columns.split(',').filter(|c| !c.is_empty()).collect();
            columns.sort_unstable();
            return format!("{name}({})", columns.join(", "));
        }
    }

    stripped
}
