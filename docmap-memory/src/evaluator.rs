//! Query state and evaluation for in-memory record selection.
//!
//! [`MemoryQuery`] accumulates directives; the comparison helpers below decide
//! which stored Property Models a query selects and in which order.

use std::cmp::Ordering;

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use docmap_core::{
    error::ModelResult,
    property::PropertyModel,
    query::{QueryVisitor, SortDirection},
    value::Value,
};

/// Width-erased, comparable view of a [`Value`].
///
/// Integers of every width compare as one integer kind, and integers compare
/// with floats numerically. An object id equals its hex string.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Integer(i128),
    Float(f64),
    String(&'a str),
    Uuid(&'a Uuid),
    DateTime(&'a DateTime<Utc>),
    ObjectId(&'a ObjectId),
}

impl<'a> From<&'a Value> for Comparable<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Null => Comparable::Null,
            Value::Bool(v) => Comparable::Bool(*v),
            Value::I8(v) => Comparable::Integer(i128::from(*v)),
            Value::I16(v) => Comparable::Integer(i128::from(*v)),
            Value::I32(v) => Comparable::Integer(i128::from(*v)),
            Value::I64(v) => Comparable::Integer(i128::from(*v)),
            Value::U8(v) => Comparable::Integer(i128::from(*v)),
            Value::U16(v) => Comparable::Integer(i128::from(*v)),
            Value::U32(v) => Comparable::Integer(i128::from(*v)),
            Value::U64(v) => Comparable::Integer(i128::from(*v)),
            Value::F32(v) => Comparable::Float(f64::from(*v)),
            Value::F64(v) => Comparable::Float(*v),
            Value::String(v) => Comparable::String(v),
            Value::Uuid(v) => Comparable::Uuid(v),
            Value::DateTime(v) => Comparable::DateTime(v),
            Value::ObjectId(v) => Comparable::ObjectId(v),
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Some(Ordering::Equal),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Integer(a), Comparable::Integer(b)) => a.partial_cmp(b),
            (Comparable::Float(a), Comparable::Float(b)) => a.partial_cmp(b),
            (Comparable::Integer(a), Comparable::Float(b)) => (*a as f64).partial_cmp(b),
            (Comparable::Float(a), Comparable::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::Uuid(a), Comparable::Uuid(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::ObjectId(b))
            | (Comparable::ObjectId(b), Comparable::String(a)) => {
                (*a == b.to_hex()).then_some(Ordering::Equal)
            }
            _ => None,
        }
    }
}

/// Returns `true` if two values are equal once numeric widths are erased.
pub(crate) fn values_equal(left: &Value, right: &Value) -> bool {
    Comparable::from(left) == Comparable::from(right)
}

/// Orders two optional property values for sorting.
///
/// Missing and null values sort before everything else; values of
/// incomparable kinds are treated as equal.
fn sort_order(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    let left = left.map(Comparable::from).unwrap_or(Comparable::Null);
    let right = right.map(Comparable::from).unwrap_or(Comparable::Null);

    match (left, right) {
        (Comparable::Null, Comparable::Null) => Ordering::Equal,
        (Comparable::Null, _) => Ordering::Less,
        (_, Comparable::Null) => Ordering::Greater,
        (left, right) => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
    }
}

/// Accumulated query state of the in-memory backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryQuery {
    filters: Vec<(String, Value)>,
    sorts: Vec<(String, SortDirection)>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl QueryVisitor for MemoryQuery {
    fn visit_filter(&mut self, key: &str, value: &Value) -> ModelResult<()> {
        self.filters.push((key.to_string(), value.clone()));
        Ok(())
    }

    fn visit_sort(&mut self, key: &str, direction: SortDirection) -> ModelResult<()> {
        self.sorts.push((key.to_string(), direction));
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

impl MemoryQuery {
    pub fn filters(&self) -> &[(String, Value)] {
        &self.filters
    }

    pub fn sorts(&self) -> &[(String, SortDirection)] {
        &self.sorts
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    /// Returns `true` if `model` satisfies every filter.
    pub fn matches(&self, model: &PropertyModel) -> bool {
        self.filters.iter().all(|(key, expected)| {
            model
                .value(key)
                .map(|actual| values_equal(actual, expected))
                .unwrap_or(false)
        })
    }

    /// Orders two models by the sort keys, in issue order.
    pub fn compare(&self, left: &PropertyModel, right: &PropertyModel) -> Ordering {
        self.sorts
            .iter()
            .map(|(key, direction)| {
                let ordering = sort_order(left.value(key), right.value(key));

                match direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            })
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }

    /// Positions of the records matching the filters, in storage order.
    pub(crate) fn matching(&self, records: &[PropertyModel]) -> Vec<usize> {
        records
            .iter()
            .enumerate()
            .filter(|(_, model)| self.matches(model))
            .map(|(position, _)| position)
            .collect()
    }

    /// Positions of the matching records after sorting and applying the offset.
    pub(crate) fn ordered(&self, records: &[PropertyModel]) -> Vec<usize> {
        let mut positions = self.matching(records);

        // Stable sort keeps insertion order between equal keys.
        positions.sort_by(|a, b| self.compare(&records[*a], &records[*b]));

        positions
            .into_iter()
            .skip(self.offset.unwrap_or(0) as usize)
            .collect()
    }

    /// Positions of the selected records after sorting, offset and limit.
    pub(crate) fn select(&self, records: &[PropertyModel]) -> Vec<usize> {
        self.ordered(records)
            .into_iter()
            .take(self.limit.map(|n| n as usize).unwrap_or(usize::MAX))
            .collect()
    }
}
