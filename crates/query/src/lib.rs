//! Flux Watch query engine.
//!
//! Turns untyped request parameters into a composed list query (filters,
//! search, sorting, pagination) plus a matching count query, built with
//! SeaQuery against statically declared entity schemas.
//!
//! The `flux-query` binary wraps the library for inspecting and running
//! queries from the command line.

pub mod catalog;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod params;
pub mod schema;
pub mod service;

pub use config::Config;
pub use engine::{
    BuildOptions, BuiltQuery, DataQuery, Feature, Operator, PageWindow, Pagination, QueryBuilder,
    QuerySpec, SortDirection, Sorting, SpecRegistry,
};
pub use error::{BuildError, SpecError};
pub use params::QueryParams;
pub use schema::{Column, ColumnKind, ColumnRef, EntitySchema};
pub use service::{ListMeta, ListResponse, ListService};
