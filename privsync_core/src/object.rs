//! Grant targets
//!
//! An [`ObjectReference`] names what a privilege applies to: a
//! database/table pair (either side may be the `*` wildcard), or a callable
//! object (`PROCEDURE`/`FUNCTION`) encoded in the database component.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::principal::strip_quotes;

/// The object a set of privileges is granted on.
///
/// Invariant: either a plain schema/table pair, or a callable reference
/// (`database` starts with the `PROCEDURE`/`FUNCTION` keyword and `table`
/// plays no part), never both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectReference {
    /// Database name, `*`, or a callable reference such as `PROCEDURE accounting.close_books`.
    pub database: String,
    /// Table name; empty or `*` means all tables.
    pub table: String,
}

impl ObjectReference {
    /// Build a reference from raw (possibly quoted) components.
    pub fn new(database: &str, table: &str) -> Self {
        ObjectReference {
            database: strip_quotes(database).to_owned(),
            table: strip_quotes(table).to_owned(),
        }
    }

    /// If the database component encodes a callable object, return the
    /// keyword (uppercased) and the object name.
    pub fn callable(&self) -> Option<(&'static str, &str)> {
        let (first, rest) = self.database.split_once(' ')?;
        let rest = rest.trim();
        if rest.is_empty() {
            return None;
        }
        match first.to_uppercase().as_str() {
            "PROCEDURE" => Some(("PROCEDURE", rest)),
            "FUNCTION" => Some(("FUNCTION", rest)),
            _ => None,
        }
    }

    fn format_database(&self) -> String {
        if let Some((keyword, name)) = self.callable() {
            return format!("{keyword} {}", quote_qualified(name));
        }
        if self.database == "*" || self.database.starts_with('`') {
            self.database.clone()
        } else {
            format!("`{}`", self.database)
        }
    }

    fn format_table(&self) -> String {
        if self.table.is_empty() || self.table == "*" {
            "*".to_owned()
        } else {
            format!("`{}`", self.table)
        }
    }
}

/// Statement-ready form: `` `db`.`tbl` ``, `*.*`, or
/// `` PROCEDURE `schema`.`name` `` for callables (no table suffix).
impl Display for ObjectReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.callable().is_some() {
            write!(f, "{}", self.format_database())
        } else {
            write!(f, "{}.{}", self.format_database(), self.format_table())
        }
    }
}

/// Backtick-quote each dot-separated component of a possibly
/// schema-qualified name, leaving already-quoted components alone.
fn quote_qualified(name: &str) -> String {
    name.split('.')
        .map(|part| {
            if part == "*" || part.starts_with('`') {
                part.to_owned()
            } else {
                format!("`{part}`")
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}
