//! Query specifications.
//!
//! A [`QuerySpec`] declares how one entity's list endpoint may be queried:
//! the feature pipeline plus shaping defaults. Specs are built once at
//! startup and shared read-only between requests.

use super::feature::Feature;
use super::processor::parse_ordering;
use crate::error::SpecError;
use crate::schema::EntitySchema;

/// Static, per-entity query configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    name: String,
    entity: &'static EntitySchema,
    features: Vec<Feature>,
    default_ordering: Vec<String>,
    max_page_size: Option<u64>,
}

impl QuerySpec {
    /// Start declaring a specification named `name`.
    pub fn builder(name: impl Into<String>) -> QuerySpecBuilder {
        QuerySpecBuilder {
            name: name.into(),
            features: Vec::new(),
            default_ordering: Vec::new(),
            max_page_size: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The entity bound by the leading model binding.
    pub fn entity(&self) -> &'static EntitySchema {
        self.entity
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Ordering tokens used when a request does not name one.
    pub fn default_ordering(&self) -> &[String] {
        &self.default_ordering
    }

    pub fn max_page_size(&self) -> Option<u64> {
        self.max_page_size
    }

    /// Field names that do not exist on the bound entity.
    ///
    /// Such clauses are skipped at request time; this catches typos when
    /// the specification is registered.
    pub fn lint(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        for feature in &self.features {
            match feature {
                Feature::Model(_) => {}
                Feature::Filter(filter) => {
                    if !self.entity.has_field(&filter.field) {
                        warnings.push(format!(
                            "Filter field '{}' does not exist on '{}'",
                            filter.field, self.entity.table
                        ));
                    }
                }
                Feature::Search(search) => {
                    for field in &search.fields {
                        if !self.entity.has_field(field) {
                            warnings.push(format!(
                                "Search field '{}' does not exist on '{}'",
                                field, self.entity.table
                            ));
                        }
                    }
                }
            }
        }

        for (field, _) in parse_ordering(self.default_ordering.iter().map(String::as_str)) {
            if !self.entity.has_field(field) {
                warnings.push(format!(
                    "Default ordering field '{}' does not exist on '{}'",
                    field, self.entity.table
                ));
            }
        }

        warnings
    }
}

/// Builder returned by [`QuerySpec::builder`].
#[derive(Debug, Clone)]
pub struct QuerySpecBuilder {
    name: String,
    features: Vec<Feature>,
    default_ordering: Vec<String>,
    max_page_size: Option<u64>,
}

impl QuerySpecBuilder {
    /// Append a feature to the pipeline.
    pub fn feature(mut self, feature: Feature) -> Self {
        self.features.push(feature);
        self
    }

    pub fn features(mut self, features: impl IntoIterator<Item = Feature>) -> Self {
        self.features.extend(features);
        self
    }

    /// Tokens such as `-created_at` or `name`, highest precedence first.
    pub fn default_ordering<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_ordering = tokens.into_iter().map(Into::into).collect();
        self
    }

    pub fn max_page_size(mut self, max: u64) -> Self {
        self.max_page_size = Some(max);
        self
    }

    /// Validate and freeze the specification.
    pub fn build(self) -> Result<QuerySpec, SpecError> {
        let entity = match self.features.first() {
            None => return Err(SpecError::Empty(self.name)),
            Some(Feature::Model(binding)) => binding.entity,
            Some(_) => return Err(SpecError::MissingModelBinding(self.name)),
        };

        if let Some(index) = self
            .features
            .iter()
            .skip(1)
            .position(|f| matches!(f, Feature::Model(_)))
        {
            return Err(SpecError::DuplicateModelBinding {
                spec: self.name,
                index: index + 1,
            });
        }

        if self.max_page_size == Some(0) {
            return Err(SpecError::ZeroMaxPageSize(self.name));
        }

        Ok(QuerySpec {
            name: self.name,
            entity,
            features: self.features,
            default_ordering: self.default_ordering,
            max_page_size: self.max_page_size,
        })
    }
}
