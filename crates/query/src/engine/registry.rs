//! Named registry of query specifications.
//!
//! Populated at startup; read concurrently by request handlers.

use dashmap::DashMap;
use std::sync::Arc;

use super::spec::QuerySpec;

/// Specifications keyed by name.
#[derive(Debug, Default)]
pub struct SpecRegistry {
    specs: DashMap<String, Arc<QuerySpec>>,
}

impl SpecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a specification, replacing any previous one with the same
    /// name. Lint findings are logged, not rejected.
    pub fn register(&self, spec: QuerySpec) -> Arc<QuerySpec> {
        for warning in spec.lint() {
            tracing::warn!(spec = spec.name(), "{warning}");
        }

        let spec = Arc::new(spec);
        if self
            .specs
            .insert(spec.name().to_string(), spec.clone())
            .is_some()
        {
            tracing::warn!(spec = spec.name(), "replaced existing query spec");
        } else {
            tracing::debug!(
                spec = spec.name(),
                table = spec.entity().table,
                "registered query spec"
            );
        }
        spec
    }

    /// Get a specification by name.
    pub fn get(&self, name: &str) -> Option<Arc<QuerySpec>> {
        self.specs.get(name).map(|v| v.clone())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.specs.iter().map(|v| v.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::feature::Feature;
    use crate::schema::{Column, EntitySchema};

    static NOTES: EntitySchema = EntitySchema {
        table: "notes",
        columns: &[Column::integer("id"), Column::text("body")],
    };

    fn spec(name: &str, max: u64) -> QuerySpec {
        QuerySpec::builder(name)
            .feature(Feature::model(&NOTES))
            .max_page_size(max)
            .build()
            .unwrap()
    }

    #[test]
    fn register_and_get() {
        let registry = SpecRegistry::new();
        assert!(registry.is_empty());

        registry.register(spec("notes", 10));
        registry.register(spec("archived_notes", 10));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("notes").unwrap().name(), "notes");
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.names(), vec!["archived_notes", "notes"]);
    }

    #[test]
    fn register_replaces_same_name() {
        let registry = SpecRegistry::new();
        registry.register(spec("notes", 10));
        registry.register(spec("notes", 25));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("notes").unwrap().max_page_size(), Some(25));
    }

    #[test]
    fn shared_across_threads() {
        let registry = Arc::new(SpecRegistry::new());
        registry.register(spec("notes", 10));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.get("notes").is_some())
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
