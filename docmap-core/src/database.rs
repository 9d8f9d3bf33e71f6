//! The database handle: the entry point that owns a backend.
//!
//! # Example
//!
//! ```ignore
//! use docmap::prelude::*;
//!
//! let database = Database::new(InMemoryStore::new());
//! let mut users = database.register::<User>("users").await?;
//! ```

use std::time::Duration;
use tracing::info;

use crate::{
    backend::StoreBackend,
    context::Context,
    error::ModelResult,
    model::ModelHandle,
    record::Record,
    schema::derive_index_specs,
};

/// Deadline for index creation during [`Database::register`].
pub const REGISTER_TIMEOUT: Duration = Duration::from_secs(5);

/// An owned handle to a storage backend.
///
/// # Type Parameters
///
/// * `B` - The backend implementation type
#[derive(Debug)]
pub struct Database<B: StoreBackend> {
    backend: B,
}

impl<B: StoreBackend> Database<B> {
    /// Creates a database over the given backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Binds a record type to a collection and creates its indexes.
    ///
    /// The indexes come from the fields of `T` flagged `index`. Index creation
    /// runs under [`REGISTER_TIMEOUT`].
    ///
    /// # Arguments
    ///
    /// * `collection` - The name of the collection
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Configuration`](crate::error::ModelError::Configuration)
    /// for conflicting tags, or the backend's error if index creation fails.
    pub async fn register<T: Record>(&self, collection: &str) -> ModelResult<ModelHandle<'_, T, B>> {
        let indexes = derive_index_specs::<T>()?;

        if !indexes.is_empty() {
            info!(collection, record = T::descriptor().name, indexes = indexes.len(), "Creating indexes");

            Context::with_timeout(REGISTER_TIMEOUT)
                .run(self.backend.create_indexes(collection, indexes))
                .await?;
        }

        Ok(ModelHandle::new(&self.backend, collection))
    }

    /// Returns a fresh handle for a record type without creating indexes.
    ///
    /// Use one handle per logical query sequence.
    pub fn model<T: Record>(&self, collection: &str) -> ModelHandle<'_, T, B> {
        ModelHandle::new(&self.backend, collection)
    }

    /// Shuts down the backend.
    pub async fn shutdown(self) -> ModelResult<()> {
        self.backend.shutdown().await
    }
}
