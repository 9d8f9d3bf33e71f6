//! In-memory storage implementation.
//!
//! This module provides a simple in-memory backend that stores Property Models
//! per collection, in insertion order, behind an async-safe read-write lock.

use async_trait::async_trait;
use bson::oid::ObjectId;
use mea::rwlock::RwLock;
use std::{collections::HashMap, sync::Arc};
use tracing::debug;

use docmap_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{ModelError, ModelResult},
    parser::IDENTITY_KEY,
    property::{Property, PropertyModel},
    schema::IndexSpec,
    value::Value,
};

use crate::evaluator::{values_equal, MemoryQuery};

#[derive(Debug, Default)]
struct Collection {
    records: Vec<PropertyModel>,
    /// Keys whose values must be unique, besides the identity.
    unique: Vec<String>,
}

impl Collection {
    fn unique_keys(&self) -> impl Iterator<Item = &str> {
        std::iter::once(IDENTITY_KEY).chain(self.unique.iter().map(String::as_str))
    }

    /// Checks that `candidate` would not duplicate a unique key of any record
    /// outside `skip`.
    fn check_unique(
        &self,
        name: &str,
        records: &[PropertyModel],
        candidate: &PropertyModel,
        skip: Option<usize>,
    ) -> ModelResult<()> {
        for key in self.unique_keys() {
            let Some(value) = candidate.value(key).filter(|value| !value.is_null()) else {
                continue;
            };

            let duplicate = records
                .iter()
                .enumerate()
                .filter(|(position, _)| Some(*position) != skip)
                .any(|(_, existing)| {
                    existing
                        .value(key)
                        .map(|other| values_equal(value, other))
                        .unwrap_or(false)
                });

            if duplicate {
                return Err(ModelError::DuplicateKey {
                    key: key.to_string(),
                    collection: name.to_string(),
                });
            }
        }

        Ok(())
    }
}

type StoreMap = HashMap<String, Collection>;

fn apply_changes(model: &mut PropertyModel, changes: &PropertyModel) {
    let mut updated = model
        .iter()
        .map(|property| match changes.get(&property.key) {
            Some(change) => Property {
                value: change.value.clone(),
                ..property.clone()
            },
            None => property.clone(),
        })
        .collect::<Vec<_>>();

    for change in changes {
        if model.get(&change.key).is_none() {
            updated.push(change.clone());
        }
    }

    *model = updated.into();
}

/// Thread-safe in-memory storage backend.
///
/// This struct implements the [`StoreBackend`] trait to provide a fully functional
/// store that operates entirely in memory using async-aware read-write locks.
///
/// # Thread Safety
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing
/// it to be safely shared across async tasks. Multiple clones of the same instance
/// share the same underlying data.
///
/// # Identity and uniqueness
///
/// Records inserted without an `_id` property receive a fresh [`ObjectId`] in
/// hex form. `_id` values are unique per collection, as are the values of every
/// key created with a unique [`IndexSpec`]. Writes violating either fail with
/// [`ModelError::DuplicateKey`] and leave the collection unchanged.
///
/// # Performance
///
/// Queries scan every record in a collection. Non-unique indexes are accepted
/// and ignored.
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// The main storage map: collection name -> records and unique keys
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use docmap_memory::InMemoryStore;
    ///
    /// let store = InMemoryStore::builder().build().await.unwrap();
    /// ```
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    /// Returns every record of a collection in insertion order.
    pub async fn records(&self, collection: &str) -> Vec<PropertyModel> {
        self.store
            .read()
            .await
            .get(collection)
            .map(|collection| collection.records.clone())
            .unwrap_or_default()
    }

    async fn update_positions(
        &self,
        name: &str,
        state: &MemoryQuery,
        changes: PropertyModel,
        single: bool,
    ) -> ModelResult<()> {
        let mut store = self.store.write().await;
        let Some(collection) = store.get_mut(name) else {
            return Ok(());
        };

        let mut positions = state.matching(&collection.records);
        if single {
            positions.truncate(1);
        }

        let mut next = collection.records.clone();
        for position in &positions {
            apply_changes(&mut next[*position], &changes);
        }

        for position in &positions {
            collection.check_unique(name, &next, &next[*position], Some(*position))?;
        }

        debug!(collection = name, updated = positions.len(), "Updated records");

        collection.records = next;

        Ok(())
    }

    async fn delete_positions(&self, name: &str, state: &MemoryQuery, single: bool) -> ModelResult<()> {
        let mut store = self.store.write().await;
        let Some(collection) = store.get_mut(name) else {
            return Ok(());
        };

        let mut positions = state.matching(&collection.records);
        if single {
            positions.truncate(1);
        }

        // Remove back to front so earlier positions stay valid.
        for position in positions.iter().rev() {
            collection.records.remove(*position);
        }

        debug!(collection = name, deleted = positions.len(), "Deleted records");

        Ok(())
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    type State = MemoryQuery;

    async fn create_indexes(&self, collection: &str, indexes: Vec<IndexSpec>) -> ModelResult<()> {
        let mut store = self.store.write().await;
        let collection_entry = store.entry(collection.to_string()).or_default();

        for index in indexes.into_iter().filter(|index| index.unique) {
            if !collection_entry.unique.contains(&index.key) {
                collection_entry.unique.push(index.key);
            }
        }

        debug!(collection, unique = ?collection_entry.unique, "Registered indexes");

        Ok(())
    }

    async fn insert(&self, collection: &str, mut model: PropertyModel) -> ModelResult<()> {
        if model.get(IDENTITY_KEY).is_none() {
            let mut identity = Property::new(IDENTITY_KEY, Value::String(ObjectId::new().to_hex()));
            identity.identity = true;

            let mut properties = vec![identity];
            properties.extend(model);
            model = properties.into();
        }

        let mut store = self.store.write().await;
        let collection_entry = store.entry(collection.to_string()).or_default();

        collection_entry.check_unique(collection, &collection_entry.records, &model, None)?;
        collection_entry.records.push(model);

        Ok(())
    }

    async fn count(&self, collection: &str, state: &MemoryQuery) -> ModelResult<u64> {
        Ok(self
            .store
            .read()
            .await
            .get(collection)
            .map(|collection| state.select(&collection.records).len() as u64)
            .unwrap_or(0))
    }

    async fn find_one(&self, collection: &str, state: &MemoryQuery) -> ModelResult<Option<PropertyModel>> {
        let store = self.store.read().await;
        let Some(collection) = store.get(collection) else {
            return Ok(None);
        };

        Ok(state
            .ordered(&collection.records)
            .first()
            .map(|position| collection.records[*position].clone()))
    }

    async fn find_many(&self, collection: &str, state: &MemoryQuery) -> ModelResult<Vec<PropertyModel>> {
        let store = self.store.read().await;
        let Some(collection) = store.get(collection) else {
            return Ok(vec![]);
        };

        Ok(state
            .select(&collection.records)
            .into_iter()
            .map(|position| collection.records[position].clone())
            .collect())
    }

    async fn update_one(&self, collection: &str, state: &MemoryQuery, changes: PropertyModel) -> ModelResult<()> {
        self.update_positions(collection, state, changes, true).await
    }

    async fn update_many(&self, collection: &str, state: &MemoryQuery, changes: PropertyModel) -> ModelResult<()> {
        self.update_positions(collection, state, changes, false).await
    }

    async fn delete_one(&self, collection: &str, state: &MemoryQuery) -> ModelResult<()> {
        self.delete_positions(collection, state, true).await
    }

    async fn delete_many(&self, collection: &str, state: &MemoryQuery) -> ModelResult<()> {
        self.delete_positions(collection, state, false).await
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
///
/// # Example
///
/// ```ignore
/// use docmap_memory::InMemoryStore;
/// use docmap::backend::StoreBackendBuilder;
///
/// #[tokio::main]
/// async fn main() {
///     let store = InMemoryStore::builder().build().await.unwrap();
/// }
/// ```
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds and returns a new [`InMemoryStore`] instance.
    ///
    /// This always succeeds and returns a freshly initialized store.
    async fn build(self) -> ModelResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}
