//! Result shaping: sorting and pagination.
//!
//! Both stages run after the feature pipeline and tolerate malformed input:
//! unknown sort fields are skipped and unparseable page numbers leave the
//! query unpaginated.

use sea_query::{Order, SelectStatement};

use crate::params::QueryParams;
use crate::schema::EntitySchema;

pub const DEFAULT_ORDER_PARAM: &str = "order";
pub const DEFAULT_PAGE_PARAM: &str = "page";
pub const DEFAULT_PAGE_SIZE_PARAM: &str = "page_size";
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl From<SortDirection> for Order {
    fn from(direction: SortDirection) -> Self {
        match direction {
            SortDirection::Asc => Order::Asc,
            SortDirection::Desc => Order::Desc,
        }
    }
}

/// Split ordering tokens into `(field, direction)` pairs.
///
/// A leading `-` means descending. Tokens are trimmed; empty names are
/// dropped.
pub fn parse_ordering<'a>(
    tokens: impl IntoIterator<Item = &'a str>,
) -> Vec<(&'a str, SortDirection)> {
    tokens
        .into_iter()
        .map(str::trim)
        .map(|token| match token.strip_prefix('-') {
            Some(name) => (name, SortDirection::Desc),
            None => (token, SortDirection::Asc),
        })
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

/// Applies `ORDER BY` from the ordering parameter or a default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sorting {
    param_name: String,
}

impl Default for Sorting {
    fn default() -> Self {
        Self::new(DEFAULT_ORDER_PARAM)
    }
}

impl Sorting {
    pub fn new(param_name: impl Into<String>) -> Self {
        Self {
            param_name: param_name.into(),
        }
    }

    pub fn param_name(&self) -> &str {
        &self.param_name
    }

    /// The `(field, direction)` pairs that will be applied, in precedence
    /// order, after dropping fields `model` does not have.
    pub fn resolve<'a>(
        &self,
        model: &EntitySchema,
        params: &'a QueryParams,
        default_ordering: &'a [String],
    ) -> Vec<(&'a str, SortDirection)> {
        let tokens: Vec<&str> = match params.get(&self.param_name) {
            Some(raw) if !raw.is_empty() => raw.split(',').collect(),
            _ => default_ordering.iter().map(String::as_str).collect(),
        };

        parse_ordering(tokens)
            .into_iter()
            .filter(|(name, _)| {
                let known = model.has_field(name);
                if !known {
                    tracing::debug!(field = *name, table = model.table, "ignoring unknown sort field");
                }
                known
            })
            .collect()
    }

    pub fn apply(
        &self,
        mut query: SelectStatement,
        model: &EntitySchema,
        params: &QueryParams,
        default_ordering: &[String],
    ) -> SelectStatement {
        for (name, direction) in self.resolve(model, params, default_ordering) {
            if let Some(column) = model.column(name) {
                query.order_by(column.iden(), direction.into());
            }
        }
        query
    }
}

/// OFFSET/LIMIT pair computed from page parameters.
///
/// Signed so that caller-supplied sizes of zero or below reach the
/// database untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: i64,
    pub limit: i64,
}

/// Converts `page` / `page_size` into a [`PageWindow`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    page_param: String,
    size_param: String,
    default_page_size: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_PARAM, DEFAULT_PAGE_SIZE_PARAM)
    }
}

impl Pagination {
    pub fn new(page_param: impl Into<String>, size_param: impl Into<String>) -> Self {
        Self {
            page_param: page_param.into(),
            size_param: size_param.into(),
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Page size used when the request does not name one.
    pub fn with_default_page_size(mut self, size: i64) -> Self {
        self.default_page_size = size;
        self
    }

    pub fn page_param(&self) -> &str {
        &self.page_param
    }

    pub fn size_param(&self) -> &str {
        &self.size_param
    }

    pub fn default_page_size(&self) -> i64 {
        self.default_page_size
    }

    /// Compute the window, or `None` if either parameter is not an integer.
    ///
    /// The requested size is capped at `max_page_size`; it is never raised
    /// to a minimum.
    pub fn window(&self, params: &QueryParams, max_page_size: Option<u64>) -> Option<PageWindow> {
        let page = parse_or(params.get(&self.page_param), 1)?;
        let mut size = parse_or(params.get(&self.size_param), self.default_page_size)?;

        if let Some(max) = max_page_size {
            let max = i64::try_from(max).unwrap_or(i64::MAX);
            if size > max {
                tracing::debug!(requested = size, capped = max, "page size exceeds maximum, capping");
                size = max;
            }
        }

        let offset = page.checked_sub(1)?.checked_mul(size)?;
        Some(PageWindow {
            offset,
            limit: size,
        })
    }
}

fn parse_or(raw: Option<&str>, default: i64) -> Option<i64> {
    match raw {
        None => Some(default),
        Some(raw) => match raw.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::debug!(value = raw, "ignoring non-integer pagination parameter");
                None
            }
        },
    }
}
