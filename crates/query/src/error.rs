//! Engine error types.
//!
//! Only configuration mistakes are errors. Malformed request parameters are
//! never reported here; the offending clause is dropped instead.

use thiserror::Error;

/// A query specification that cannot be used.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpecError {
    #[error("query spec '{0}' has no features")]
    Empty(String),

    #[error("query spec '{0}' must start with a model binding")]
    MissingModelBinding(String),

    #[error("query spec '{spec}' binds a model again at feature {index}")]
    DuplicateModelBinding { spec: String, index: usize },

    #[error("query spec '{0}' has a max page size of zero")]
    ZeroMaxPageSize(String),
}

/// Failure while running a feature pipeline.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("no model bound before the '{0}' stage")]
    ModelNotBound(&'static str),
}
