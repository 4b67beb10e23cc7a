//! Defines the `Dialect` trait for database-specific SQL syntax.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

pub trait Dialect: Send + Sync {
    /// Wraps an identifier (like a table or column name) in the correct
    /// quotation marks for the dialect, doubling any embedded quote.
    ///
    /// - PostgreSQL uses double quotes: `"my_column"`
    /// - MySQL uses backticks: `` `my_column` ``
    fn quote_identifier(&self, ident: &str) -> String;

    /// Returns the placeholder for a parameterized query.
    ///
    /// - PostgreSQL uses `$1`, `$2`, etc.
    /// - MySQL uses `?`
    fn get_placeholder(&self, index: usize) -> String;

    /// Renders text extraction of `path` from an already quoted JSON column.
    fn json_path(&self, column: &str, path: &[String]) -> String;

    /// Whether `ilike` is understood natively; otherwise it degrades to `like`.
    fn supports_ilike(&self) -> bool;

    /// Returns the name of the dialect (e.g., "PostgreSQL", "MySQL").
    fn name(&self) -> String;
}

fn quote_with(ident: &str, quote: char) -> String {
    let escaped = ident.replace(quote, &format!("{quote}{quote}"));
    format!("{quote}{escaped}{quote}")
}

/// A single-quoted SQL string literal.
fn literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// `$.a.b`, quoted as a SQL literal. Members that are not plain
/// identifiers are double-quoted: `$."a b"`.
fn dollar_path(path: &[String]) -> String {
    let mut text = String::from("$");
    for key in path {
        text.push('.');
        if is_plain_member(key) {
            text.push_str(key);
        } else {
            text.push('"');
            text.push_str(&key.replace('\\', "\\\\").replace('"', "\\\""));
            text.push('"');
        }
    }
    literal(&text)
}

fn is_plain_member(key: &str) -> bool {
    let mut chars = key.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl Dialect for Postgres {
    fn quote_identifier(&self, ident: &str) -> String {
        quote_with(ident, '"')
    }

    fn get_placeholder(&self, index: usize) -> String {
        // PostgreSQL uses $1, $2, etc.
        format!("${}", index + 1)
    }

    fn json_path(&self, column: &str, path: &[String]) -> String {
        let mut sql = column.to_string();
        for (i, key) in path.iter().enumerate() {
            sql.push_str(if i + 1 == path.len() { "->>" } else { "->" });
            sql.push_str(&literal(key));
        }
        sql
    }

    fn supports_ilike(&self) -> bool {
        true
    }

    fn name(&self) -> String {
        "PostgreSQL".into()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MySql;

impl Dialect for MySql {
    fn quote_identifier(&self, ident: &str) -> String {
        quote_with(ident, '`')
    }

    fn get_placeholder(&self, _index: usize) -> String {
        // MySQL uses ?
        "?".into()
    }

    fn json_path(&self, column: &str, path: &[String]) -> String {
        format!("JSON_UNQUOTE(JSON_EXTRACT({column}, {}))", dollar_path(path))
    }

    fn supports_ilike(&self) -> bool {
        false
    }

    fn name(&self) -> String {
        "MySQL".into()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Sqlite;

impl Dialect for Sqlite {
    fn quote_identifier(&self, ident: &str) -> String {
        quote_with(ident, '"')
    }

    fn get_placeholder(&self, _index: usize) -> String {
        "?".into()
    }

    fn json_path(&self, column: &str, path: &[String]) -> String {
        format!("json_extract({column}, {})", dollar_path(path))
    }

    fn supports_ilike(&self) -> bool {
        false
    }

    fn name(&self) -> String {
        "SQLite".into()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    #[default]
    Postgres,
    MySql,
    Sqlite,
}

impl DialectKind {
    pub fn dialect(&self) -> &'static dyn Dialect {
        match self {
            DialectKind::Postgres => &Postgres,
            DialectKind::MySql => &MySql,
            DialectKind::Sqlite => &Sqlite,
        }
    }
}

impl FromStr for DialectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pg" | "postgres" | "postgresql" => Ok(DialectKind::Postgres),
            "mysql" | "mariadb" => Ok(DialectKind::MySql),
            "sqlite" | "sqlite3" => Ok(DialectKind::Sqlite),
            other => Err(format!("Unknown dialect: {other}")),
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dialect().name())
    }
}
