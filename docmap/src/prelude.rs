//! Convenient re-exports of commonly used types from docmap.
//!
//! ```ignore
//! use docmap::prelude::*;
//! ```
//!
//! This provides access to:
//! - The `Record` trait and derive macro
//! - The model contract and the database handle
//! - Store backends and builders
//! - Query directives
//! - Property values and error types

pub use docmap_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    context::Context,
    database::Database,
    error::{ModelError, ModelResult},
    model::{Model, ModelHandle, Query},
    property::{Property, PropertyModel},
    query::{Directive, QueryParams, QueryParamsBuilder, QueryVisitor, SortDirection},
    record::Record,
    schema::IndexSpec,
    value::{FieldValue, Value},
};
pub use docmap_macros::Record;
