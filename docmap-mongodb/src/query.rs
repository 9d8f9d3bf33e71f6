//! Query state translation from docmap directives to MongoDB query syntax.

use bson::{doc, Bson, Document};

use docmap_core::{
    error::ModelResult,
    query::{QueryVisitor, SortDirection},
    value::Value,
};

use crate::convert::filter_to_bson;

/// Accumulated MongoDB query state.
///
/// Filters are kept in issue order and AND-combined; sort keys are kept in
/// issue order with ascending as `1` and descending as `-1`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MongoQuery {
    filters: Vec<(String, Bson)>,
    sort: Document,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl QueryVisitor for MongoQuery {
    fn visit_filter(&mut self, key: &str, value: &Value) -> ModelResult<()> {
        self.filters.push((key.to_string(), filter_to_bson(key, value)?));
        Ok(())
    }

    fn visit_sort(&mut self, key: &str, direction: SortDirection) -> ModelResult<()> {
        self.sort.insert(
            key,
            match direction {
                SortDirection::Asc => 1,
                SortDirection::Desc => -1,
            },
        );
        Ok(())
    }

    fn visit_limit(&mut self, n: u64) -> ModelResult<()> {
        // Zero clears the limit.
        self.limit = (n > 0).then_some(n);
        Ok(())
    }

    fn visit_offset(&mut self, n: u64) -> ModelResult<()> {
        self.offset = Some(n);
        Ok(())
    }
}

impl MongoQuery {
    /// Returns the filter document.
    ///
    /// A single filter is a plain equality document; several filters are
    /// wrapped in `$and` so repeated keys are all honoured.
    pub fn filter(&self) -> Document {
        match self.filters.as_slice() {
            [] => doc! {},
            [(key, value)] => doc! { key: value.clone() },
            filters => doc! {
                "$and": filters
                    .iter()
                    .map(|(key, value)| doc! { key: value.clone() })
                    .collect::<Vec<_>>(),
            },
        }
    }

    /// Returns the sort document, or `None` when no sort was issued.
    pub fn sort(&self) -> Option<Document> {
        (!self.sort.is_empty()).then(|| self.sort.clone())
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn offset(&self) -> Option<u64> {
        self.offset
    }
}
