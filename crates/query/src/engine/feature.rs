//! Query features: the composable steps of a specification's pipeline.
//!
//! Each feature receives the running query (none for the first) and the
//! per-build context, and returns the extended query. Features only narrow;
//! successive filters and searches combine with AND.

use sea_query::extension::postgres::PgExpr;
use sea_query::{Asterisk, Cond, Query, SelectStatement, SimpleExpr};

use super::operator::Operator;
use crate::error::BuildError;
use crate::params::QueryParams;
use crate::schema::EntitySchema;

/// Separates a field prefix from its operator in parameter keys.
pub const OPERATOR_SEPARATOR: &str = "__";

/// Per-build scratch state threaded through the pipeline.
#[derive(Debug)]
pub struct BuildContext<'p> {
    params: &'p QueryParams,
    model: Option<&'static EntitySchema>,
}

impl<'p> BuildContext<'p> {
    pub fn new(params: &'p QueryParams) -> Self {
        Self {
            params,
            model: None,
        }
    }

    pub fn params(&self) -> &'p QueryParams {
        self.params
    }

    /// The entity bound by the pipeline's model binding, if it has run.
    pub fn bound_model(&self) -> Option<&'static EntitySchema> {
        self.model
    }

    /// The bound entity, or an error naming the stage that needed it.
    pub fn model(&self, stage: &'static str) -> Result<&'static EntitySchema, BuildError> {
        self.model.ok_or(BuildError::ModelNotBound(stage))
    }

    fn bind(&mut self, model: &'static EntitySchema) {
        self.model = Some(model);
    }
}

/// One step of a query pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feature {
    Model(ModelBinding),
    Filter(FilterFeature),
    Search(SearchFeature),
}

impl Feature {
    /// Seed the pipeline with `SELECT "table".* FROM "table"`.
    pub fn model(entity: &'static EntitySchema) -> Self {
        Feature::Model(ModelBinding { entity })
    }

    /// Filter on `field`, reading parameters keyed by the field name.
    pub fn filter(field: impl Into<String>) -> Self {
        let field = field.into();
        Feature::Filter(FilterFeature {
            param_prefix: field.clone(),
            field,
        })
    }

    /// Filter on `field`, reading parameters keyed by `param_prefix`.
    pub fn filter_as(field: impl Into<String>, param_prefix: impl Into<String>) -> Self {
        Feature::Filter(FilterFeature {
            field: field.into(),
            param_prefix: param_prefix.into(),
        })
    }

    /// Case-insensitive substring search over `fields`, OR-combined.
    pub fn search<I, S>(param_name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Feature::Search(SearchFeature {
            param_name: param_name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        })
    }

    pub fn apply(
        &self,
        query: Option<SelectStatement>,
        ctx: &mut BuildContext<'_>,
    ) -> Result<SelectStatement, BuildError> {
        match self {
            Feature::Model(binding) => Ok(binding.apply(ctx)),
            Feature::Filter(filter) => filter.apply(query, ctx),
            Feature::Search(search) => search.apply(query, ctx),
        }
    }

    /// Short name for logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Feature::Model(_) => "model",
            Feature::Filter(_) => "filter",
            Feature::Search(_) => "search",
        }
    }
}

/// Binds the target entity and seeds the base query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelBinding {
    pub entity: &'static EntitySchema,
}

impl ModelBinding {
    fn apply(&self, ctx: &mut BuildContext<'_>) -> SelectStatement {
        ctx.bind(self.entity);
        let table = sea_query::Alias::new(self.entity.table);
        Query::select()
            .column((table.clone(), Asterisk))
            .from(table)
            .to_owned()
    }
}

/// Per-field filter driven by `<prefix>` and `<prefix>__<op>` parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterFeature {
    pub field: String,
    pub param_prefix: String,
}

impl FilterFeature {
    /// Operator token addressed by `key`, or `None` if the key is not ours.
    ///
    /// Any key starting with the prefix is ours. The operator is the
    /// segment after the first `__`; a key without one means equality.
    fn operator_token<'k>(&self, key: &'k str) -> Option<&'k str> {
        if !key.starts_with(self.param_prefix.as_str()) {
            return None;
        }
        Some(
            key.split(OPERATOR_SEPARATOR)
                .nth(1)
                .unwrap_or(Operator::Eq.token()),
        )
    }

    fn apply(
        &self,
        query: Option<SelectStatement>,
        ctx: &mut BuildContext<'_>,
    ) -> Result<SelectStatement, BuildError> {
        let model = ctx.model("filter")?;
        let mut query = query.ok_or(BuildError::ModelNotBound("filter"))?;

        let Some(column) = model.column(&self.field) else {
            return Ok(query);
        };

        for (key, values) in ctx.params().iter() {
            let Some(token) = self.operator_token(key) else {
                continue;
            };
            let Some(op) = Operator::from_token(token) else {
                tracing::debug!(param = key, operator = token, "ignoring unknown filter operator");
                continue;
            };
            for value in values {
                if let Some(predicate) = op.predicate(&column, value) {
                    query.cond_where(predicate);
                }
            }
        }

        Ok(query)
    }
}

/// OR-combined ILIKE search across several fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFeature {
    pub param_name: String,
    pub fields: Vec<String>,
}

impl SearchFeature {
    fn apply(
        &self,
        query: Option<SelectStatement>,
        ctx: &mut BuildContext<'_>,
    ) -> Result<SelectStatement, BuildError> {
        let model = ctx.model("search")?;
        let mut query = query.ok_or(BuildError::ModelNotBound("search"))?;

        let term = match ctx.params().get(&self.param_name) {
            Some(term) if !term.is_empty() => term,
            _ => return Ok(query),
        };

        let pattern = format!("%{term}%");
        let matches: Vec<SimpleExpr> = self
            .fields
            .iter()
            .filter_map(|field| model.column(field))
            .map(|column| column.text_expr().ilike(pattern.as_str()))
            .collect();

        if matches.is_empty() {
            return Ok(query);
        }

        let any = matches
            .into_iter()
            .fold(Cond::any(), |cond, expr| cond.add(expr));
        query.cond_where(Cond::all().add(any));

        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Column;
    use sea_query::PostgresQueryBuilder;

    static POSTS: EntitySchema = EntitySchema {
        table: "posts",
        columns: &[
            Column::integer("id"),
            Column::text("title"),
            Column::text("body"),
            Column::text("status"),
            Column::text("status_code"),
        ],
    };

    fn run(features: &[Feature], params: &QueryParams) -> Result<String, BuildError> {
        let mut ctx = BuildContext::new(params);
        let mut query = None;
        for feature in features {
            query = Some(feature.apply(query, &mut ctx)?);
        }
        let query = query.ok_or(BuildError::ModelNotBound("test"))?;
        Ok(query.to_string(PostgresQueryBuilder))
    }

    #[test]
    fn model_binding_seeds_query() {
        let params = QueryParams::new();
        let mut ctx = BuildContext::new(&params);
        let query = Feature::model(&POSTS).apply(None, &mut ctx).unwrap();

        assert_eq!(
            query.to_string(PostgresQueryBuilder),
            r#"SELECT "posts".* FROM "posts""#
        );
        assert_eq!(ctx.bound_model(), Some(&POSTS));
    }

    #[test]
    fn model_binding_discards_incoming_query() {
        let params = QueryParams::new().with("status", "draft");
        let sql = run(
            &[
                Feature::model(&POSTS),
                Feature::filter("status"),
                Feature::model(&POSTS),
            ],
            &params,
        )
        .unwrap();
        assert!(!sql.contains("WHERE"), "{sql}");
    }

    #[test]
    fn filter_defaults_to_equality() {
        let params = QueryParams::new().with("status", "draft");
        let sql = run(&[Feature::model(&POSTS), Feature::filter("status")], &params).unwrap();
        assert!(sql.ends_with(r#"WHERE "posts"."status" = 'draft'"#), "{sql}");
    }

    #[test]
    fn filter_with_operator_suffix() {
        let params = QueryParams::new().with("id__gte", "10").with("id__lt", "20");
        let sql = run(&[Feature::model(&POSTS), Feature::filter("id")], &params).unwrap();
        assert!(
            sql.contains(r#""posts"."id" >= 10 AND "posts"."id" < 20"#),
            "{sql}"
        );
    }

    #[test]
    fn filter_matches_any_key_with_prefix() {
        let params = QueryParams::new().with("statusx", "open");
        let sql = run(&[Feature::model(&POSTS), Feature::filter("status")], &params).unwrap();
        assert!(sql.ends_with(r#"WHERE "posts"."status" = 'open'"#), "{sql}");

        let params = QueryParams::new().with("status_code__ne", "500");
        let sql = run(&[Feature::model(&POSTS), Feature::filter("status")], &params).unwrap();
        assert!(sql.ends_with(r#"WHERE "posts"."status" <> '500'"#), "{sql}");
    }

    #[test]
    fn filter_skips_unknown_operator() {
        let params = QueryParams::new()
            .with("status__between", "a")
            .with("status__ne", "spam");
        let sql = run(&[Feature::model(&POSTS), Feature::filter("status")], &params).unwrap();
        assert!(sql.ends_with(r#"WHERE "posts"."status" <> 'spam'"#), "{sql}");
    }

    #[test]
    fn filter_on_missing_field_is_noop() {
        let params = QueryParams::new().with("author", "ann");
        let sql = run(&[Feature::model(&POSTS), Feature::filter("author")], &params).unwrap();
        assert_eq!(sql, r#"SELECT "posts".* FROM "posts""#);
    }

    #[test]
    fn filter_with_custom_prefix() {
        let params = QueryParams::new()
            .with("state", "live")
            .with("status", "ignored");
        let sql = run(
            &[Feature::model(&POSTS), Feature::filter_as("status", "state")],
            &params,
        )
        .unwrap();
        assert!(sql.ends_with(r#"WHERE "posts"."status" = 'live'"#), "{sql}");
    }

    #[test]
    fn filter_repeated_key_adds_each_value() {
        let params = QueryParams::parse("status__ne=spam&status__ne=draft");
        let sql = run(&[Feature::model(&POSTS), Feature::filter("status")], &params).unwrap();
        assert!(sql.contains(r#""posts"."status" <> 'spam'"#), "{sql}");
        assert!(sql.contains(r#""posts"."status" <> 'draft'"#), "{sql}");
    }

    #[test]
    fn search_ors_fields() {
        let params = QueryParams::new().with("q", "rust");
        let sql = run(
            &[
                Feature::model(&POSTS),
                Feature::search("q", ["title", "body", "missing"]),
            ],
            &params,
        )
        .unwrap();
        assert!(sql.contains(r#""posts"."title" ILIKE '%rust%'"#), "{sql}");
        assert!(sql.contains(r#""posts"."body" ILIKE '%rust%'"#), "{sql}");
        assert!(sql.contains(" OR "), "{sql}");
        assert!(!sql.contains("missing"), "{sql}");
    }

    #[test]
    fn search_absent_or_empty_is_noop() {
        let features = [Feature::model(&POSTS), Feature::search("q", ["title"])];
        let base = r#"SELECT "posts".* FROM "posts""#;

        assert_eq!(run(&features, &QueryParams::new()).unwrap(), base);
        assert_eq!(
            run(&features, &QueryParams::new().with("q", "")).unwrap(),
            base
        );
    }

    #[test]
    fn search_without_known_fields_is_noop() {
        let params = QueryParams::new().with("q", "rust");
        let sql = run(
            &[Feature::model(&POSTS), Feature::search("q", ["nope"])],
            &params,
        )
        .unwrap();
        assert_eq!(sql, r#"SELECT "posts".* FROM "posts""#);
    }

    #[test]
    fn search_is_anded_with_filters() {
        let params = QueryParams::new().with("q", "rust").with("status", "live");
        let sql = run(
            &[
                Feature::model(&POSTS),
                Feature::filter("status"),
                Feature::search("q", ["title", "body"]),
            ],
            &params,
        )
        .unwrap();
        assert!(
            sql.ends_with(
                r#"WHERE "posts"."status" = 'live' AND (("posts"."title" ILIKE '%rust%') OR ("posts"."body" ILIKE '%rust%'))"#
            ),
            "{sql}"
        );
    }

    #[test]
    fn search_casts_non_text_fields() {
        let params = QueryParams::new().with("q", "42");
        let sql = run(
            &[Feature::model(&POSTS), Feature::search("q", ["id", "title"])],
            &params,
        )
        .unwrap();
        assert!(
            sql.contains(r#"CAST("posts"."id" AS text) ILIKE '%42%'"#),
            "{sql}"
        );
        assert!(sql.contains(r#""posts"."title" ILIKE '%42%'"#), "{sql}");
    }

    #[test]
    fn filter_before_model_fails() {
        let params = QueryParams::new().with("status", "draft");
        let err = run(&[Feature::filter("status")], &params).unwrap_err();
        assert_eq!(err, BuildError::ModelNotBound("filter"));
    }

    #[test]
    fn search_before_model_fails() {
        let err = run(&[Feature::search("q", ["title"])], &QueryParams::new()).unwrap_err();
        assert_eq!(err, BuildError::ModelNotBound("search"));
    }
}
