//! Configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::engine::{
    DEFAULT_ORDER_PARAM, DEFAULT_PAGE_PARAM, DEFAULT_PAGE_SIZE, DEFAULT_PAGE_SIZE_PARAM,
    Pagination, QueryBuilder, Sorting,
};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL. Only needed to execute queries.
    pub database_url: Option<String>,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// Parameter holding the ordering tokens (default: "order").
    pub order_param: String,

    /// Parameter holding the 1-based page number (default: "page").
    pub page_param: String,

    /// Parameter holding the page size (default: "page_size").
    pub page_size_param: String,

    /// Page size when the request names none (default: 20).
    pub default_page_size: i64,

    /// Per-statement timeout for list queries (default: 10s).
    pub statement_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = var("DATABASE_URL").filter(|url| !url.is_empty());

        let database_max_connections = var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let order_param =
            var("QUERY_ORDER_PARAM").unwrap_or_else(|| DEFAULT_ORDER_PARAM.to_string());

        let page_param = var("QUERY_PAGE_PARAM").unwrap_or_else(|| DEFAULT_PAGE_PARAM.to_string());

        let page_size_param =
            var("QUERY_PAGE_SIZE_PARAM").unwrap_or_else(|| DEFAULT_PAGE_SIZE_PARAM.to_string());

        let default_page_size = var("QUERY_DEFAULT_PAGE_SIZE")
            .unwrap_or_else(|| DEFAULT_PAGE_SIZE.to_string())
            .parse()
            .context("QUERY_DEFAULT_PAGE_SIZE must be a valid integer")?;

        let statement_timeout_secs: u64 = var("QUERY_STATEMENT_TIMEOUT_SECS")
            .unwrap_or_else(|| "10".to_string())
            .parse()
            .context("QUERY_STATEMENT_TIMEOUT_SECS must be a valid u64")?;

        Ok(Self {
            database_url,
            database_max_connections,
            order_param,
            page_param,
            page_size_param,
            default_page_size,
            statement_timeout: Duration::from_secs(statement_timeout_secs),
        })
    }

    /// A query builder using the configured parameter names and defaults.
    pub fn query_builder(&self) -> QueryBuilder {
        QueryBuilder::new(
            Sorting::new(&self.order_param),
            Pagination::new(&self.page_param, &self.page_size_param)
                .with_default_page_size(self.default_page_size),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[]).unwrap();

        assert!(config.database_url.is_none());
        assert_eq!(config.database_max_connections, 10);
        assert_eq!(config.order_param, "order");
        assert_eq!(config.page_param, "page");
        assert_eq!(config.page_size_param, "page_size");
        assert_eq!(config.default_page_size, 20);
        assert_eq!(config.statement_timeout, Duration::from_secs(10));
    }

    #[test]
    fn overrides() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/flux"),
            ("QUERY_PAGE_SIZE_PARAM", "pageSize"),
            ("QUERY_DEFAULT_PAGE_SIZE", "10"),
        ])
        .unwrap();

        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/flux")
        );
        assert_eq!(config.page_size_param, "pageSize");

        let builder = config.query_builder();
        assert_eq!(builder.pagination().size_param(), "pageSize");
        assert_eq!(builder.pagination().default_page_size(), 10);
        assert_eq!(builder.sorting().param_name(), "order");
    }

    #[test]
    fn empty_database_url_is_unset() {
        let config = load(&[("DATABASE_URL", "")]).unwrap();
        assert!(config.database_url.is_none());
    }

    #[test]
    fn invalid_number_is_an_error() {
        let err = load(&[("QUERY_DEFAULT_PAGE_SIZE", "twenty")]).unwrap_err();
        assert!(err.to_string().contains("QUERY_DEFAULT_PAGE_SIZE"));
    }
}
