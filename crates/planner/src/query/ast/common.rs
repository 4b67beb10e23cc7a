//! Defines common, reusable AST nodes for building SQL queries.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub schema: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDir {
    Asc,
    Desc,
}

impl OrderDir {
    /// Parses a direction token; anything but `desc` sorts ascending.
    pub fn parse(token: Option<&str>) -> Self {
        match token {
            Some(t) if t.eq_ignore_ascii_case("desc") => OrderDir::Desc,
            _ => OrderDir::Asc,
        }
    }
}
