//! Filter operator table.

use sea_query::extension::postgres::PgExpr;
use sea_query::{SimpleExpr, Value};

use crate::schema::ColumnRef;

/// Comparison operators addressable as `<field>__<token>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Exact match.
    Eq,
    /// Not equal.
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Case-sensitive substring match (LIKE %value%).
    Like,
    /// Case-insensitive substring match (ILIKE %value%).
    ILike,
    /// Value in comma-separated list.
    In,
}

impl Operator {
    pub const ALL: [Operator; 9] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Gt,
        Operator::Gte,
        Operator::Lt,
        Operator::Lte,
        Operator::Like,
        Operator::ILike,
        Operator::In,
    ];

    /// Look up an operator by its parameter token.
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.token() == token)
    }

    pub fn token(self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Like => "like",
            Operator::ILike => "ilike",
            Operator::In => "in",
        }
    }

    /// Build the predicate `column <op> value`.
    ///
    /// Returns `None` when the raw value cannot be coerced to the column's
    /// kind; callers drop the clause.
    pub fn predicate(self, column: &ColumnRef, raw: &str) -> Option<SimpleExpr> {
        let col = column.expr();
        let expr = match self {
            Operator::Eq => col.eq(literal(column, raw)?),
            Operator::Ne => col.ne(literal(column, raw)?),
            Operator::Gt => col.gt(literal(column, raw)?),
            Operator::Gte => col.gte(literal(column, raw)?),
            Operator::Lt => col.lt(literal(column, raw)?),
            Operator::Lte => col.lte(literal(column, raw)?),
            Operator::Like => column.text_expr().like(format!("%{raw}%")),
            Operator::ILike => column.text_expr().ilike(format!("%{raw}%")),
            // No escaping: a literal comma cannot be matched.
            Operator::In => {
                let values = raw
                    .split(',')
                    .map(|item| literal(column, item))
                    .collect::<Option<Vec<Value>>>()?;
                col.is_in(values)
            }
        };
        Some(expr)
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

fn literal(column: &ColumnRef, raw: &str) -> Option<Value> {
    let value = column.kind().coerce(raw);
    if value.is_none() {
        tracing::debug!(
            column = column.name(),
            kind = ?column.kind(),
            value = raw,
            "dropping filter value that does not fit the column"
        );
    }
    value
}
