use async_trait::async_trait;
use bson::{doc, Document};
use futures::TryStreamExt;
use mongodb::{
    options::{ClientOptions, CountOptions, FindOneOptions, FindOptions, IndexOptions},
    Client, Collection as MongoCollection, IndexModel,
};
use std::time::Duration;
use tracing::{debug, info};

use docmap_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{ModelError, ModelResult},
    property::PropertyModel,
    schema::IndexSpec,
};

use crate::{
    convert::{document_to_model, model_to_document},
    query::MongoQuery,
};

/// Default deadline for connecting to and pinging the server.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }

    async fn set(&self, collection: &str, state: &MongoQuery, changes: PropertyModel, many: bool) -> ModelResult<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let update = doc! { "$set": model_to_document(&changes)? };
        let collection = self.get_collection(collection);

        let result = if many {
            collection.update_many(state.filter(), update).await
        } else {
            collection.update_one(state.filter(), update).await
        }
        .map_err(|e| ModelError::Backend(e.to_string()))?;

        debug!(matched = result.matched_count, modified = result.modified_count, "Updated documents");

        Ok(())
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    type State = MongoQuery;

    async fn create_indexes(&self, collection: &str, indexes: Vec<IndexSpec>) -> ModelResult<()> {
        if indexes.is_empty() {
            return Ok(());
        }

        let models = indexes
            .iter()
            .map(|index| {
                IndexModel::builder()
                    .keys(doc! { index.key.as_str(): 1 })
                    .options(IndexOptions::builder().unique(index.unique).build())
                    .build()
            })
            .collect::<Vec<_>>();

        self.get_collection(collection)
            .create_indexes(models)
            .await
            .map_err(|e| ModelError::Backend(e.to_string()))?;

        info!(collection, indexes = indexes.len(), "Created indexes");

        Ok(())
    }

    async fn insert(&self, collection: &str, model: PropertyModel) -> ModelResult<()> {
        self.get_collection(collection)
            .insert_one(model_to_document(&model)?)
            .await
            .map_err(|e| ModelError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn count(&self, collection: &str, state: &MongoQuery) -> ModelResult<u64> {
        let mut options = CountOptions::default();
        options.limit = state.limit();
        options.skip = state.offset();

        self.get_collection(collection)
            .count_documents(state.filter())
            .with_options(options)
            .await
            .map_err(|e| ModelError::Backend(e.to_string()))
    }

    async fn find_one(&self, collection: &str, state: &MongoQuery) -> ModelResult<Option<PropertyModel>> {
        let mut options = FindOneOptions::default();
        options.sort = state.sort();
        options.skip = state.offset();

        self.get_collection(collection)
            .find_one(state.filter())
            .with_options(options)
            .await
            .map_err(|e| ModelError::Backend(e.to_string()))?
            .map(|document| document_to_model(&document))
            .transpose()
    }

    async fn find_many(&self, collection: &str, state: &MongoQuery) -> ModelResult<Vec<PropertyModel>> {
        let mut options = FindOptions::default();
        options.sort = state.sort();
        options.skip = state.offset();
        if let Some(limit) = state.limit() {
            options.limit = Some(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        self.get_collection(collection)
            .find(state.filter())
            .with_options(options)
            .await
            .map_err(|e| ModelError::Backend(e.to_string()))?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(|e| ModelError::Backend(e.to_string()))?
            .iter()
            .map(document_to_model)
            .collect()
    }

    async fn update_one(&self, collection: &str, state: &MongoQuery, changes: PropertyModel) -> ModelResult<()> {
        self.set(collection, state, changes, false).await
    }

    async fn update_many(&self, collection: &str, state: &MongoQuery, changes: PropertyModel) -> ModelResult<()> {
        self.set(collection, state, changes, true).await
    }

    async fn delete_one(&self, collection: &str, state: &MongoQuery) -> ModelResult<()> {
        self.get_collection(collection)
            .delete_one(state.filter())
            .await
            .map_err(|e| ModelError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn delete_many(&self, collection: &str, state: &MongoQuery) -> ModelResult<()> {
        self.get_collection(collection)
            .delete_many(state.filter())
            .await
            .map_err(|e| ModelError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn shutdown(self) -> ModelResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
    connect_timeout: Duration,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Sets the deadline for connecting to and pinging the server.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    /// Connects to the server and checks it answers a ping.
    async fn build(self) -> ModelResult<Self::Backend> {
        let mut options = ClientOptions::parse(&self.dsn)
            .await
            .map_err(|e| ModelError::Initialization(e.to_string()))?;
        options.connect_timeout = Some(self.connect_timeout);
        options.server_selection_timeout = Some(self.connect_timeout);

        let client = Client::with_options(options)
            .map_err(|e| ModelError::Initialization(e.to_string()))?;

        client
            .database(&self.database)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| ModelError::Initialization(e.to_string()))?;

        info!(database = %self.database, "Connected to MongoDB");

        Ok(MongoDbStore::new(client, self.database))
    }
}
