//! Static entity descriptors.
//!
//! An [`EntitySchema`] is the only thing the engine needs to know about a
//! table: its name and which columns exist. Schemas are declared as
//! `static` items and bound into specifications by reference:
//!
//! ```ignore
//! static EVENTS: EntitySchema = EntitySchema {
//!     table: "events",
//!     columns: &[Column::uuid("event_id"), Column::text("producer")],
//! };
//! ```

use chrono::{DateTime, NaiveDate};
use sea_query::{Alias, Expr, Value};

/// Storage type of a column, used to coerce raw parameter strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Float,
    Boolean,
    Uuid,
    Timestamp,
    /// JSON document; compared as text.
    Json,
}

impl ColumnKind {
    /// Coerce a raw parameter string into a typed literal.
    ///
    /// Returns `None` when the value does not parse for this kind.
    pub fn coerce(self, raw: &str) -> Option<Value> {
        match self {
            ColumnKind::Text | ColumnKind::Json => Some(Value::from(raw.to_string())),
            ColumnKind::Integer => raw.trim().parse::<i64>().ok().map(Value::from),
            ColumnKind::Float => raw.trim().parse::<f64>().ok().map(Value::from),
            ColumnKind::Boolean => parse_bool(raw).map(Value::from),
            ColumnKind::Uuid => uuid::Uuid::parse_str(raw.trim()).ok().map(Value::from),
            ColumnKind::Timestamp => parse_timestamp(raw),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// RFC 3339 timestamps, or a bare `YYYY-MM-DD` date.
fn parse_timestamp(raw: &str) -> Option<Value> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(Value::from(ts));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(Value::from)
}

/// A named, typed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

impl Column {
    pub const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self { name, kind }
    }

    pub const fn text(name: &'static str) -> Self {
        Self::new(name, ColumnKind::Text)
    }

    pub const fn integer(name: &'static str) -> Self {
        Self::new(name, ColumnKind::Integer)
    }

    pub const fn float(name: &'static str) -> Self {
        Self::new(name, ColumnKind::Float)
    }

    pub const fn boolean(name: &'static str) -> Self {
        Self::new(name, ColumnKind::Boolean)
    }

    pub const fn uuid(name: &'static str) -> Self {
        Self::new(name, ColumnKind::Uuid)
    }

    pub const fn timestamp(name: &'static str) -> Self {
        Self::new(name, ColumnKind::Timestamp)
    }

    pub const fn json(name: &'static str) -> Self {
        Self::new(name, ColumnKind::Json)
    }
}

/// Descriptor of a queryable entity.
#[derive(Debug, PartialEq, Eq)]
pub struct EntitySchema {
    pub table: &'static str,
    pub columns: &'static [Column],
}

impl EntitySchema {
    pub fn has_field(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Resolve a field name to a column handle on this entity.
    pub fn column(&self, name: &str) -> Option<ColumnRef> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|column| ColumnRef {
                table: self.table,
                column: *column,
            })
    }
}

/// Table-qualified handle to a column, as used in predicates and ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRef {
    table: &'static str,
    column: Column,
}

impl ColumnRef {
    pub fn name(&self) -> &'static str {
        self.column.name
    }

    pub fn kind(&self) -> ColumnKind {
        self.column.kind
    }

    /// `"table"."column"`
    pub fn expr(&self) -> Expr {
        Expr::col(self.iden())
    }

    /// The column as text, for pattern matching. Non-text columns render
    /// as `CAST("table"."column" AS text)`.
    pub fn text_expr(&self) -> Expr {
        match self.kind() {
            ColumnKind::Text => self.expr(),
            _ => Expr::expr(self.expr().cast_as(Alias::new("text"))),
        }
    }

    pub fn iden(&self) -> (Alias, Alias) {
        (Alias::new(self.table), Alias::new(self.column.name))
    }
}
