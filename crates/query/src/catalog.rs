//! Built-in entity schemas and their list specifications.

use crate::engine::{Feature, QuerySpec, SpecRegistry};
use crate::error::SpecError;
use crate::schema::{Column, EntitySchema};

/// The `events` table.
pub static EVENTS: EntitySchema = EntitySchema {
    table: "events",
    columns: &[
        Column::uuid("event_id"),
        Column::text("entity_type"),
        Column::text("entity_id"),
        Column::text("event_type"),
        Column::integer("event_version"),
        Column::timestamp("occurred_at"),
        Column::text("producer"),
        Column::text("actor_type"),
        Column::text("actor_id"),
        Column::json("context"),
        Column::json("payload"),
    ],
};

/// Page size ceiling for the events listing.
pub const EVENTS_MAX_PAGE_SIZE: u64 = 100;

/// Listing of ingested events, newest first.
pub fn events_spec() -> Result<QuerySpec, SpecError> {
    QuerySpec::builder("events")
        .feature(Feature::model(&EVENTS))
        .feature(Feature::filter("event_id"))
        .feature(Feature::filter("event_type"))
        .feature(Feature::filter("entity_type"))
        .feature(Feature::filter("entity_id"))
        .feature(Feature::filter("producer"))
        .feature(Feature::filter("occurred_at"))
        .feature(Feature::search(
            "search",
            ["event_type", "entity_type", "producer"],
        ))
        .default_ordering(["-occurred_at"])
        .max_page_size(EVENTS_MAX_PAGE_SIZE)
        .build()
}

/// Registry holding every built-in specification.
pub fn builtin_registry() -> Result<SpecRegistry, SpecError> {
    let registry = SpecRegistry::new();
    registry.register(events_spec()?);
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_spec_is_clean() {
        let spec = events_spec().unwrap();
        assert_eq!(spec.entity(), &EVENTS);
        assert!(spec.lint().is_empty(), "{:?}", spec.lint());
    }

    #[test]
    fn builtin_registry_contains_events() {
        let registry = builtin_registry().unwrap();
        assert_eq!(registry.names(), vec!["events"]);
    }
}
