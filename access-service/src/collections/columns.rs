//! Static column registry for entity collections.
//!
//! Each collection declares its queryable columns once, as data: a
//! name, a role, and an accessor closing over nothing. Lookups resolve
//! against the registry so an unknown column is a typed error, never a
//! panic, and uniqueness claims are verified on every read.

/// Value extracted from a row column for client-side matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnValue {
    Null,
    Text(String),
    Int(i64),
    Bool(bool),
}

impl From<&str> for ColumnValue {
    fn from(value: &str) -> Self {
        ColumnValue::Text(value.to_owned())
    }
}

impl From<String> for ColumnValue {
    fn from(value: String) -> Self {
        ColumnValue::Text(value)
    }
}

impl From<i64> for ColumnValue {
    fn from(value: i64) -> Self {
        ColumnValue::Int(value)
    }
}

impl From<bool> for ColumnValue {
    fn from(value: bool) -> Self {
        ColumnValue::Bool(value)
    }
}

/// How a column may be queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    /// Single row per value, at most one in the whole table.
    Primary,
    /// At most one row per value.
    Unique,
    /// Any number of rows per value.
    Indexed,
}

/// One declared column of a collection row type.
pub struct ColumnSpec<R> {
    pub name: &'static str,
    pub role: ColumnRole,
    pub get: fn(&R) -> ColumnValue,
}

/// Resolve a column by name.
pub fn find<'a, R>(columns: &'a [ColumnSpec<R>], name: &str) -> Option<&'a ColumnSpec<R>> {
    columns.iter().find(|c| c.name == name)
}

/// The primary column of a registry, if declared.
pub fn primary<R>(columns: &[ColumnSpec<R>]) -> Option<&ColumnSpec<R>> {
    columns.iter().find(|c| c.role == ColumnRole::Primary)
}
