//! Query builder: runs a specification's pipeline and shapes the result.
//!
//! Order is fixed: features, then the count query (from the filtered base),
//! then sorting, then pagination. The count never sees ORDER BY or the page
//! window.

use sea_query::{Alias, Asterisk, Expr, PostgresQueryBuilder, Query, SelectStatement};

use super::feature::BuildContext;
use super::processor::{PageWindow, Pagination, Sorting};
use super::spec::QuerySpec;
use crate::error::BuildError;
use crate::params::QueryParams;

/// Alias given to the base query inside the count query.
const COUNT_SUBQUERY_ALIAS: &str = "base";

/// Which shaping stages to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    pub paginate: bool,
    pub sort: bool,
    pub with_counts: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            paginate: true,
            sort: true,
            with_counts: false,
        }
    }
}

impl BuildOptions {
    pub fn with_counts(mut self) -> Self {
        self.with_counts = true;
        self
    }

    pub fn unpaginated(mut self) -> Self {
        self.paginate = false;
        self
    }

    pub fn unsorted(mut self) -> Self {
        self.sort = false;
        self
    }
}

/// The data query: a select statement plus an optional page window.
#[derive(Debug, Clone)]
pub struct DataQuery {
    statement: SelectStatement,
    window: Option<PageWindow>,
}

impl DataQuery {
    pub fn statement(&self) -> &SelectStatement {
        &self.statement
    }

    pub fn window(&self) -> Option<PageWindow> {
        self.window
    }

    /// Replace the page window.
    pub fn with_window(mut self, window: PageWindow) -> Self {
        self.window = Some(window);
        self
    }

    /// Render as PostgreSQL with inlined values.
    pub fn to_sql(&self) -> String {
        let mut sql = self.statement.to_string(PostgresQueryBuilder);
        if let Some(PageWindow { offset, limit }) = self.window {
            sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}"));
        }
        sql
    }
}

/// Output of [`QueryBuilder::build`].
#[derive(Debug, Clone)]
pub struct BuiltQuery {
    pub data: DataQuery,
    pub count: Option<SelectStatement>,
}

impl BuiltQuery {
    pub fn count_sql(&self) -> Option<String> {
        self.count
            .as_ref()
            .map(|count| count.to_string(PostgresQueryBuilder))
    }
}

/// Drives specifications against request parameters.
///
/// Holds the shaping processors, so one instance configured at startup
/// serves every request.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    sorting: Sorting,
    pagination: Pagination,
}

impl QueryBuilder {
    pub fn new(sorting: Sorting, pagination: Pagination) -> Self {
        Self {
            sorting,
            pagination,
        }
    }

    pub fn sorting(&self) -> &Sorting {
        &self.sorting
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    /// Build the data query and, if requested, the matching count query.
    pub fn build(
        &self,
        spec: &QuerySpec,
        params: &QueryParams,
        options: BuildOptions,
    ) -> Result<BuiltQuery, BuildError> {
        let mut ctx = BuildContext::new(params);
        let base = run_pipeline(spec, &mut ctx)?;
        let model = ctx.model("shaping")?;

        let count = options.with_counts.then(|| count_query(&base));

        let statement = if options.sort {
            self.sorting
                .apply(base, model, params, spec.default_ordering())
        } else {
            base
        };

        let window = if options.paginate {
            self.pagination.window(params, spec.max_page_size())
        } else {
            None
        };

        tracing::debug!(
            spec = spec.name(),
            paginated = window.is_some(),
            counted = count.is_some(),
            "built list query"
        );

        Ok(BuiltQuery {
            data: DataQuery { statement, window },
            count,
        })
    }
}

fn run_pipeline(spec: &QuerySpec, ctx: &mut BuildContext<'_>) -> Result<SelectStatement, BuildError> {
    let mut query = None;
    for feature in spec.features() {
        query = Some(feature.apply(query, ctx)?);
    }
    query.ok_or(BuildError::ModelNotBound("pipeline"))
}

/// `SELECT COUNT(*) FROM (<base>) AS "base"`
fn count_query(base: &SelectStatement) -> SelectStatement {
    Query::select()
        .expr(Expr::col(Asterisk).count())
        .from_subquery(base.clone(), Alias::new(COUNT_SUBQUERY_ALIAS))
        .to_owned()
}
