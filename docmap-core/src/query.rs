//! Query directives and their translation into backend query state.
//!
//! A query is an ordered stream of [`Directive`]s. Each directive is an
//! immutable description of one query aspect: an equality filter, a sort key,
//! a row limit or a row offset. Directives are backend-neutral; a backend
//! accumulates them into its own native state by implementing [`QueryVisitor`].
//!
//! # Query Building
//!
//! Directives can be passed one by one or composed with the fluent builder:
//!
//! ```ignore
//! use docmap::query::{self, QueryParams, SortDirection};
//!
//! let params = QueryParams::builder()
//!     .filter("name", "Alice")
//!     .sort("age", SortDirection::Desc)
//!     .offset(10)
//!     .limit(10)
//!     .build();
//!
//! let same = vec![
//!     query::filter("name", "Alice"),
//!     query::sort("age", SortDirection::Desc),
//!     query::offset(10),
//!     query::limit(10),
//! ];
//! ```
//!
//! # Semantics
//!
//! Backends combine filters with AND, apply sorts in issue order, then the
//! offset, then the limit. When a query carries several limits or offsets the
//! last one wins.

use serde::{Deserialize, Serialize};

use crate::{
    error::{ModelError, ModelResult},
    value::Value,
};

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

/// One immutable query instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Directive {
    /// Match records whose property `key` equals `value`.
    Filter { key: String, value: Value },
    /// Order results by property `key`.
    Sort { key: String, direction: SortDirection },
    /// Return at most this many records. Zero means no limit, and a later
    /// `Limit(0)` clears an earlier limit.
    Limit(u64),
    /// Skip this many records.
    Offset(u64),
}

impl Directive {
    /// Short name of the directive kind, used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Directive::Filter { .. } => "filter",
            Directive::Sort { .. } => "sort",
            Directive::Limit(_) => "limit",
            Directive::Offset(_) => "offset",
        }
    }
}

/// Creates an equality filter directive.
pub fn filter(key: impl Into<String>, value: impl Into<Value>) -> Directive {
    Directive::Filter {
        key: key.into(),
        value: value.into(),
    }
}

/// Creates a sort directive.
pub fn sort(key: impl Into<String>, direction: SortDirection) -> Directive {
    Directive::Sort {
        key: key.into(),
        direction,
    }
}

/// Creates a limit directive. `limit(0)` leaves the query unlimited.
pub fn limit(n: u64) -> Directive {
    Directive::Limit(n)
}

/// Creates an offset directive.
pub fn offset(n: u64) -> Directive {
    Directive::Offset(n)
}

/// An ordered list of directives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryParams {
    directives: Vec<Directive>,
}

impl QueryParams {
    /// Creates empty query parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new builder for fluent construction.
    pub fn builder() -> QueryParamsBuilder {
        QueryParamsBuilder::new()
    }

    /// Returns the directives in issue order.
    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }
}

impl From<Vec<Directive>> for QueryParams {
    fn from(directives: Vec<Directive>) -> Self {
        Self { directives }
    }
}

impl FromIterator<Directive> for QueryParams {
    fn from_iter<I: IntoIterator<Item = Directive>>(iter: I) -> Self {
        Self {
            directives: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for QueryParams {
    type Item = Directive;
    type IntoIter = std::vec::IntoIter<Directive>;

    fn into_iter(self) -> Self::IntoIter {
        self.directives.into_iter()
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryParamsBuilder {
    params: QueryParams,
}

impl QueryParamsBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality filter.
    ///
    /// # Arguments
    ///
    /// * `key` - The property key to match
    /// * `value` - The value the property must equal
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.directives.push(filter(key, value));
        self
    }

    /// Adds a sort key.
    ///
    /// # Arguments
    ///
    /// * `key` - The property key to sort by
    /// * `direction` - The sort direction (ascending or descending)
    pub fn sort(mut self, key: impl Into<String>, direction: SortDirection) -> Self {
        self.params.directives.push(sort(key, direction));
        self
    }

    /// Sets the maximum number of records to return.
    pub fn limit(mut self, n: u64) -> Self {
        self.params.directives.push(limit(n));
        self
    }

    /// Sets the number of records to skip.
    pub fn offset(mut self, n: u64) -> Self {
        self.params.directives.push(offset(n));
        self
    }

    /// Adds an already constructed directive.
    pub fn directive(mut self, directive: Directive) -> Self {
        self.params.directives.push(directive);
        self
    }

    /// Builds and returns the final parameters.
    pub fn build(self) -> QueryParams {
        self.params
    }
}

/// Accumulates directives into a backend's native query state.
///
/// Every method defaults to rejecting the directive with
/// [`ModelError::UnsupportedDirective`]; a backend overrides the ones it can
/// translate.
pub trait QueryVisitor {
    fn visit_filter(&mut self, key: &str, value: &Value) -> ModelResult<()> {
        let _ = value;
        Err(ModelError::UnsupportedDirective(format!("filter on `{}`", key)))
    }

    fn visit_sort(&mut self, key: &str, direction: SortDirection) -> ModelResult<()> {
        let _ = direction;
        Err(ModelError::UnsupportedDirective(format!("sort on `{}`", key)))
    }

    fn visit_limit(&mut self, n: u64) -> ModelResult<()> {
        Err(ModelError::UnsupportedDirective(format!("limit {}", n)))
    }

    fn visit_offset(&mut self, n: u64) -> ModelResult<()> {
        Err(ModelError::UnsupportedDirective(format!("offset {}", n)))
    }

    fn visit_directive(&mut self, directive: &Directive) -> ModelResult<()> {
        match directive {
            Directive::Filter { key, value } => self.visit_filter(key, value),
            Directive::Sort { key, direction } => self.visit_sort(key, *direction),
            Directive::Limit(n) => self.visit_limit(*n),
            Directive::Offset(n) => self.visit_offset(*n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Recorder {
        filters: Vec<(String, Value)>,
        limit: Option<u64>,
    }

    impl QueryVisitor for Recorder {
        fn visit_filter(&mut self, key: &str, value: &Value) -> ModelResult<()> {
            self.filters.push((key.to_string(), value.clone()));
            Ok(())
        }

        fn visit_limit(&mut self, n: u64) -> ModelResult<()> {
            self.limit = Some(n);
            Ok(())
        }
    }

    #[test]
    fn test_builder_preserves_issue_order() {
        let params = QueryParams::builder()
            .filter("name", "Jon")
            .sort("age", SortDirection::Desc)
            .limit(5)
            .offset(2)
            .build();

        assert_eq!(
            params.directives(),
            &[
                filter("name", "Jon"),
                sort("age", SortDirection::Desc),
                limit(5),
                offset(2),
            ]
        );
    }

    #[test]
    fn test_visitor_dispatch() {
        let mut recorder = Recorder::default();

        for directive in [filter("age", 12i8), limit(3), limit(7)] {
            recorder.visit_directive(&directive).unwrap();
        }

        assert_eq!(recorder.filters, vec![("age".to_string(), Value::I8(12))]);
        assert_eq!(recorder.limit, Some(7));
    }

    #[test]
    fn test_unsupported_directive() {
        let mut recorder = Recorder::default();
        let err = recorder.visit_directive(&sort("age", SortDirection::Asc)).unwrap_err();

        assert!(matches!(err, ModelError::UnsupportedDirective(_)));
    }

    #[test]
    fn test_directive_serialized_shape() {
        let json = serde_json::to_value(limit(5)).unwrap();

        assert_eq!(json, serde_json::json!({ "Limit": 5 }));
    }
}
