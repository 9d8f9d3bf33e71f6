//! Storage backend abstraction for the model layer.
//!
//! This module defines the primitive set a storage adapter implements. A
//! [`ModelHandle`](crate::model::ModelHandle) drives these primitives: it
//! encodes records into Property Models before they reach the backend and
//! decodes the Property Models the backend returns.
//!
//! # Overview
//!
//! A backend owns two things:
//!
//! - the storage itself, behind the async methods of [`StoreBackend`];
//! - a native query state type ([`StoreBackend::State`]) that accumulates
//!   query directives through [`QueryVisitor`](crate::query::QueryVisitor).
//!
//! Implementations are required to be thread-safe (`Send + Sync`) and support
//! concurrent access.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The core trait for storage backends
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::ModelResult,
    property::PropertyModel,
    query::QueryVisitor,
    schema::IndexSpec,
};

/// Abstract interface for storage backends.
///
/// Every method that selects records receives the backend's accumulated query
/// state. Filters restrict the selection of every method. `find_many` applies
/// sorts, offset and limit; `find_one` applies sorts and offset; `count`
/// applies offset and limit. Updates and deletes act on filter matches only,
/// and the single-record variants pick one of them.
///
/// # Error Handling
///
/// Operations return [`ModelResult<T>`](crate::error::ModelResult). Driver
/// failures are reported as [`ModelError::Backend`](crate::error::ModelError::Backend).
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Native accumulated query state.
    type State: QueryVisitor + Default + Debug + Send + Sync;

    /// Creates the given indexes on a collection.
    ///
    /// # Arguments
    ///
    /// * `collection` - The name of the collection
    /// * `indexes` - The indexes to create, in declaration order
    async fn create_indexes(&self, collection: &str, indexes: Vec<IndexSpec>) -> ModelResult<()>;

    /// Inserts one record into a collection.
    ///
    /// If the model carries no identity property the backend assigns one.
    ///
    /// # Arguments
    ///
    /// * `collection` - The name of the collection. Created automatically if it doesn't exist.
    /// * `model` - The encoded record
    async fn insert(&self, collection: &str, model: PropertyModel) -> ModelResult<()>;

    /// Counts the records selected by `state`, honouring its offset and limit.
    async fn count(&self, collection: &str, state: &Self::State) -> ModelResult<u64>;

    /// Returns the first record selected by `state`, or `None`.
    async fn find_one(
        &self,
        collection: &str,
        state: &Self::State,
    ) -> ModelResult<Option<PropertyModel>>;

    /// Returns every record selected by `state`.
    async fn find_many(
        &self,
        collection: &str,
        state: &Self::State,
    ) -> ModelResult<Vec<PropertyModel>>;

    /// Sets the properties of `changes` on the first selected record.
    ///
    /// # Arguments
    ///
    /// * `collection` - The name of the collection
    /// * `state` - The accumulated selection
    /// * `changes` - The properties to set. Properties absent from it are left unchanged.
    async fn update_one(
        &self,
        collection: &str,
        state: &Self::State,
        changes: PropertyModel,
    ) -> ModelResult<()>;

    /// Sets the properties of `changes` on every selected record.
    async fn update_many(
        &self,
        collection: &str,
        state: &Self::State,
        changes: PropertyModel,
    ) -> ModelResult<()>;

    /// Deletes the first selected record.
    async fn delete_one(&self, collection: &str, state: &Self::State) -> ModelResult<()>;

    /// Deletes every selected record.
    async fn delete_many(&self, collection: &str, state: &Self::State) -> ModelResult<()>;

    /// Gracefully shuts down the backend.
    ///
    /// The default implementation does nothing and returns `Ok(())`.
    async fn shutdown(self) -> ModelResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Factory trait for constructing backend instances.
///
/// Builders carry the backend's configuration and perform any connection
/// setup in [`build`](StoreBackendBuilder::build).
///
/// # Example
///
/// ```ignore
/// use docmap::backend::StoreBackendBuilder;
///
/// let store = MongoDbStore::builder("mongodb://localhost:27017", "app")
///     .connect_timeout(Duration::from_secs(2))
///     .build()
///     .await?;
/// ```
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    /// Builds the backend.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Initialization`](crate::error::ModelError::Initialization)
    /// if the backend cannot be set up.
    async fn build(self) -> ModelResult<Self::Backend>;
}
