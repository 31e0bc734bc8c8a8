//! List service: executes built queries against PostgreSQL.
//!
//! The data query and the count query run in one read-only
//! `REPEATABLE READ` transaction, so `returned_count` and `total_count`
//! come from the same snapshot.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::engine::{BuildOptions, PageWindow, QueryBuilder, QuerySpec, SpecRegistry};
use crate::params::QueryParams;

/// Counts describing a list response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListMeta {
    /// Rows in this response.
    pub returned_count: u64,
    /// Rows matching the filters across all pages, when requested.
    pub total_count: Option<u64>,
}

/// A page of results with its counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub meta: ListMeta,
    pub results: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn new(results: Vec<T>, total_count: Option<u64>) -> Self {
        Self {
            meta: ListMeta {
                returned_count: results.len() as u64,
                total_count,
            },
            results,
        }
    }
}

/// Executes registered specifications.
#[derive(Clone)]
pub struct ListService {
    pool: PgPool,
    registry: Arc<SpecRegistry>,
    builder: QueryBuilder,
    statement_timeout: Duration,
}

impl ListService {
    pub fn new(
        pool: PgPool,
        registry: Arc<SpecRegistry>,
        builder: QueryBuilder,
        statement_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            registry,
            builder,
            statement_timeout,
        }
    }

    pub fn registry(&self) -> &SpecRegistry {
        &self.registry
    }

    fn spec(&self, name: &str) -> Result<Arc<QuerySpec>> {
        self.registry
            .get(name)
            .with_context(|| format!("unknown query spec '{name}'"))
    }

    /// Run a list query, returning rows as JSON objects.
    pub async fn list(
        &self,
        spec_name: &str,
        params: &QueryParams,
        with_counts: bool,
    ) -> Result<ListResponse<serde_json::Value>> {
        let spec = self.spec(spec_name)?;
        let options = if with_counts {
            BuildOptions::default().with_counts()
        } else {
            BuildOptions::default()
        };
        let built = self
            .builder
            .build(&spec, params, options)
            .with_context(|| format!("failed to build query for '{spec_name}'"))?;

        let data_sql = built.data.to_sql();
        let count_sql = built.count_sql();
        tracing::debug!(spec = spec_name, sql = %data_sql, "executing list query");

        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to begin transaction")?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await
            .context("failed to set transaction mode")?;

        sqlx::query(&format!(
            "SET LOCAL statement_timeout = {}",
            self.statement_timeout.as_millis()
        ))
        .execute(&mut *tx)
        .await
        .context("failed to set statement timeout")?;

        let total = match count_sql {
            Some(count_sql) => {
                let total: i64 = sqlx::query_scalar(&count_sql)
                    .fetch_one(&mut *tx)
                    .await
                    .context("failed to execute count query")?;
                Some(total.max(0) as u64)
            }
            None => None,
        };

        let rows: Vec<serde_json::Value> =
            sqlx::query_scalar(&format!("SELECT row_to_json(t) FROM ({data_sql}) t"))
                .fetch_all(&mut *tx)
                .await
                .context("failed to execute list query")?;

        tx.commit()
            .await
            .context("failed to commit query transaction")?;

        Ok(ListResponse::new(rows, total))
    }

    /// First row matching the filters.
    ///
    /// Ordering follows the request's ordering parameter like [`list`],
    /// falling back to the spec's default ordering. Page parameters are
    /// ignored.
    ///
    /// [`list`]: ListService::list
    pub async fn find_one(
        &self,
        spec_name: &str,
        params: &QueryParams,
    ) -> Result<Option<serde_json::Value>> {
        let spec = self.spec(spec_name)?;
        let built = self
            .builder
            .build(&spec, params, BuildOptions::default().unpaginated())
            .with_context(|| format!("failed to build query for '{spec_name}'"))?;
        let data = built.data.with_window(PageWindow {
            offset: 0,
            limit: 1,
        });

        let row: Option<serde_json::Value> = sqlx::query_scalar(&format!(
            "SELECT row_to_json(t) FROM ({}) t",
            data.to_sql()
        ))
        .fetch_optional(&self.pool)
        .await
        .context("failed to execute lookup query")?;

        Ok(row)
    }
}
