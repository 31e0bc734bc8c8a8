//! List query engine.
//!
//! This module provides:
//! - Operator: filter operator table (`field__op=value`)
//! - Feature: model binding, filter and search pipeline steps
//! - QuerySpec: per-entity pipeline plus shaping defaults
//! - Sorting / Pagination: result shaping processors
//! - QueryBuilder: orchestrates the pipeline, shaping and count query
//! - SpecRegistry: named specifications shared across requests

mod builder;
mod feature;
mod operator;
mod processor;
mod registry;
mod spec;

pub use builder::{BuildOptions, BuiltQuery, DataQuery, QueryBuilder};
pub use feature::{
    BuildContext, Feature, FilterFeature, ModelBinding, OPERATOR_SEPARATOR, SearchFeature,
};
pub use operator::Operator;
pub use processor::{
    DEFAULT_ORDER_PARAM, DEFAULT_PAGE_PARAM, DEFAULT_PAGE_SIZE, DEFAULT_PAGE_SIZE_PARAM,
    PageWindow, Pagination, SortDirection, Sorting, parse_ordering,
};
pub use registry::SpecRegistry;
pub use spec::{QuerySpec, QuerySpecBuilder};
