//! The generic model contract.
//!
//! A model is the typed entry point for one record type in one collection. It
//! is driven in two phases:
//!
//! 1. [`Model::query`] translates directives into the backend's query state.
//!    Calls accumulate until a terminal operation runs.
//! 2. A terminal operation of [`Query`] (`count`, `first`, `all`, `update`,
//!    `update_many`, `delete`, `delete_many`) executes against the accumulated
//!    state and leaves the model with an empty state, whether it succeeds or not.
//!
//! # Example
//!
//! ```ignore
//! use docmap::prelude::*;
//!
//! let mut users = database.register::<User>("users").await?;
//!
//! users.save(vec![user]).await?;
//!
//! let adults = users
//!     .query(QueryParams::builder().filter("active", true).sort("age", SortDirection::Asc).build())?
//!     .all()
//!     .await?;
//! ```

use async_trait::async_trait;
use bson::oid::ObjectId;
use std::{fmt, marker::PhantomData, mem};
use tracing::debug;
use uuid::Uuid;

use crate::{
    backend::StoreBackend,
    context::Context,
    decode::decode,
    encode::encode,
    error::ModelResult,
    property::PropertyModel,
    query::{Directive, QueryVisitor},
    record::Record,
    schema::Schema,
    value::{FieldKind, Value},
};

/// Terminal operations over the accumulated query state.
#[async_trait]
pub trait Query<T: Record>: Send {
    /// Counts the selected records, honouring filter, offset and limit.
    async fn count(&mut self) -> ModelResult<u64>;

    /// Returns the first selected record in sort order, or `None`.
    async fn first(&mut self) -> ModelResult<Option<T>>;

    /// Returns every selected record.
    async fn all(&mut self) -> ModelResult<Vec<T>>;

    /// Sets every property of `record` except its identity on the first
    /// selected record.
    async fn update(&mut self, record: &T) -> ModelResult<()>;

    /// Sets every property of `record` except its identity on every selected record.
    async fn update_many(&mut self, record: &T) -> ModelResult<()>;

    /// Deletes the first selected record.
    async fn delete(&mut self) -> ModelResult<()>;

    /// Deletes every selected record.
    async fn delete_many(&mut self) -> ModelResult<()>;
}

/// Query building and persistence for one record type.
#[async_trait]
pub trait Model<T: Record>: Query<T> {
    /// Attaches a deadline scope to subsequent backend calls.
    fn with_context(&mut self, context: Context) -> &mut Self;

    /// Adds directives to the accumulated query state.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnsupportedDirective`](crate::error::ModelError::UnsupportedDirective)
    /// if the backend cannot translate a directive. The accumulated state is
    /// discarded.
    fn query<I>(&mut self, directives: I) -> ModelResult<&mut Self>
    where
        I: IntoIterator<Item = Directive>,
        Self: Sized;

    /// Persists `records` one by one, in order.
    ///
    /// A failing record aborts the remaining ones; records persisted before it
    /// stay persisted.
    async fn save(&mut self, records: Vec<T>) -> ModelResult<()>;
}

/// A [`Model`] over any [`StoreBackend`].
pub struct ModelHandle<'a, T, B: StoreBackend> {
    backend: &'a B,
    collection: String,
    state: B::State,
    context: Context,
    _record: PhantomData<fn() -> T>,
}

impl<'a, T, B: StoreBackend> fmt::Debug for ModelHandle<'a, T, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("backend", &self.backend)
            .field("collection", &self.collection)
            .field("state", &self.state)
            .field("context", &self.context)
            .finish()
    }
}

impl<'a, T: Record, B: StoreBackend> ModelHandle<'a, T, B> {
    pub(crate) fn new(backend: &'a B, collection: impl Into<String>) -> Self {
        Self {
            backend,
            collection: collection.into(),
            state: B::State::default(),
            context: Context::default(),
            _record: PhantomData,
        }
    }

    /// Returns the name of the collection.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Returns the accumulated query state.
    pub fn pending(&self) -> &B::State {
        &self.state
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    fn take_state(&mut self) -> B::State {
        mem::take(&mut self.state)
    }

    fn changes(record: &T) -> ModelResult<PropertyModel> {
        let mut changes = encode(record)?;
        changes.check_required()?;
        changes.take_identity();
        Ok(changes)
    }
}

fn materialize<T: Record>(model: &PropertyModel) -> ModelResult<T> {
    let mut record = T::default();
    decode(&mut record, model)?;
    Ok(record)
}

/// Generates an identity for kinds a backend cannot assign.
///
/// String identities are left to the backend.
fn generated_identity<T: Record>() -> ModelResult<Option<Value>> {
    Ok(match Schema::of::<T>()?.identity().and_then(|field| field.kind) {
        Some(FieldKind::ObjectId) => Some(Value::ObjectId(ObjectId::new())),
        Some(FieldKind::Uuid) => Some(Value::Uuid(Uuid::new_v4())),
        _ => None,
    })
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

#[async_trait]
impl<'a, T: Record, B: StoreBackend> Query<T> for ModelHandle<'a, T, B> {
    async fn count(&mut self) -> ModelResult<u64> {
        let state = self.take_state();

        self.context
            .run(self.backend.count(&self.collection, &state))
            .await
    }

    async fn first(&mut self) -> ModelResult<Option<T>> {
        let state = self.take_state();

        self.context
            .run(self.backend.find_one(&self.collection, &state))
            .await?
            .map(|model| materialize::<T>(&model))
            .transpose()
    }

    async fn all(&mut self) -> ModelResult<Vec<T>> {
        let state = self.take_state();

        self.context
            .run(self.backend.find_many(&self.collection, &state))
            .await?
            .iter()
            .map(materialize::<T>)
            .collect()
    }

    async fn update(&mut self, record: &T) -> ModelResult<()> {
        let state = self.take_state();
        let changes = Self::changes(record)?;

        self.context
            .run(self.backend.update_one(&self.collection, &state, changes))
            .await
    }

    async fn update_many(&mut self, record: &T) -> ModelResult<()> {
        let state = self.take_state();
        let changes = Self::changes(record)?;

        self.context
            .run(self.backend.update_many(&self.collection, &state, changes))
            .await
    }

    async fn delete(&mut self) -> ModelResult<()> {
        let state = self.take_state();

        self.context
            .run(self.backend.delete_one(&self.collection, &state))
            .await
    }

    async fn delete_many(&mut self) -> ModelResult<()> {
        let state = self.take_state();

        self.context
            .run(self.backend.delete_many(&self.collection, &state))
            .await
    }
}

#[async_trait]
impl<'a, T: Record, B: StoreBackend> Model<T> for ModelHandle<'a, T, B> {
    fn with_context(&mut self, context: Context) -> &mut Self {
        self.context = context;
        self
    }

    fn query<I>(&mut self, directives: I) -> ModelResult<&mut Self>
    where
        I: IntoIterator<Item = Directive>,
    {
        for directive in directives {
            debug!(collection = %self.collection, directive = directive.name(), "Applying query directive");

            if let Err(err) = self.state.visit_directive(&directive) {
                self.state = B::State::default();
                return Err(err);
            }
        }

        Ok(self)
    }

    async fn save(&mut self, records: Vec<T>) -> ModelResult<()> {
        for record in records {
            let mut model = encode(&record)?;

            if model.identity().map(|p| is_blank(&p.value)).unwrap_or(false) {
                match generated_identity::<T>()? {
                    Some(value) => {
                        if let Some(identity) = model.identity_mut() {
                            identity.value = value;
                        }
                    }
                    None => {
                        model.take_identity();
                    }
                }
            }

            model.check_required()?;

            self.context
                .run(self.backend.insert(&self.collection, model))
                .await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        database::Database,
        error::ModelError,
        parser::tests::{account, Account},
        query::{filter, limit, offset, sort, SortDirection},
        schema::IndexSpec,
    };
    use parking_lot::Mutex;
    use std::time::Duration;

    /// Filters and limits only; sorting is unsupported.
    #[derive(Debug, Default, PartialEq)]
    struct FilterState {
        filters: Vec<(String, Value)>,
        limit: Option<u64>,
        offset: Option<u64>,
    }

    impl QueryVisitor for FilterState {
        fn visit_filter(&mut self, key: &str, value: &Value) -> ModelResult<()> {
            self.filters.push((key.to_string(), value.clone()));
            Ok(())
        }

        fn visit_limit(&mut self, n: u64) -> ModelResult<()> {
            self.limit = Some(n);
            Ok(())
        }

        fn visit_offset(&mut self, n: u64) -> ModelResult<()> {
            self.offset = Some(n);
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct Recording {
        inserted: Mutex<Vec<PropertyModel>>,
        updates: Mutex<Vec<PropertyModel>>,
        stall: bool,
    }

    #[async_trait]
    impl StoreBackend for Recording {
        type State = FilterState;

        async fn create_indexes(&self, _collection: &str, _indexes: Vec<IndexSpec>) -> ModelResult<()> {
            Ok(())
        }

        async fn insert(&self, _collection: &str, model: PropertyModel) -> ModelResult<()> {
            if self.stall {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            self.inserted.lock().push(model);
            Ok(())
        }

        async fn count(&self, _collection: &str, state: &FilterState) -> ModelResult<u64> {
            Ok(state.filters.len() as u64)
        }

        async fn find_one(&self, _collection: &str, _state: &FilterState) -> ModelResult<Option<PropertyModel>> {
            Ok(self.inserted.lock().first().cloned())
        }

        async fn find_many(&self, _collection: &str, _state: &FilterState) -> ModelResult<Vec<PropertyModel>> {
            Ok(self.inserted.lock().clone())
        }

        async fn update_one(&self, _collection: &str, _state: &FilterState, changes: PropertyModel) -> ModelResult<()> {
            self.updates.lock().push(changes);
            Ok(())
        }

        async fn update_many(&self, collection: &str, state: &FilterState, changes: PropertyModel) -> ModelResult<()> {
            self.update_one(collection, state, changes).await
        }

        async fn delete_one(&self, _collection: &str, _state: &FilterState) -> ModelResult<()> {
            Err(ModelError::Backend("delete refused".into()))
        }

        async fn delete_many(&self, _collection: &str, _state: &FilterState) -> ModelResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_query_accumulates_until_terminal() {
        let database = Database::new(Recording::default());
        let mut accounts = database.model::<Account>("accounts");

        accounts.query(vec![filter("name", "Jon"), limit(5)]).unwrap();
        accounts.query(vec![offset(2), limit(10)]).unwrap();

        assert_eq!(
            accounts.pending(),
            &FilterState {
                filters: vec![("name".into(), Value::String("Jon".into()))],
                limit: Some(10),
                offset: Some(2),
            }
        );

        assert_eq!(accounts.count().await.unwrap(), 1);
        assert_eq!(accounts.pending(), &FilterState::default());
    }

    #[tokio::test]
    async fn test_state_resets_after_failed_terminal() {
        let database = Database::new(Recording::default());
        let mut accounts = database.model::<Account>("accounts");

        let err = accounts.query(vec![filter("age", 12i8)]).unwrap().delete().await.unwrap_err();

        assert_eq!(err, ModelError::Backend("delete refused".into()));
        assert_eq!(accounts.pending(), &FilterState::default());
    }

    #[tokio::test]
    async fn test_unsupported_directive_resets_handle() {
        let database = Database::new(Recording::default());
        let mut accounts = database.model::<Account>("accounts");

        let err = accounts
            .query(vec![filter("age", 12i8), sort("age", SortDirection::Asc)])
            .unwrap_err();

        assert!(matches!(err, ModelError::UnsupportedDirective(_)));
        assert_eq!(accounts.pending(), &FilterState::default());
    }

    #[tokio::test]
    async fn test_save_omits_blank_identity() {
        let database = Database::new(Recording::default());
        let mut accounts = database.model::<Account>("accounts");

        accounts
            .save(vec![account(), Account { id: String::new(), name: "Ann".into(), ..Default::default() }])
            .await
            .unwrap();

        let inserted = database.backend().inserted.lock().clone();
        assert_eq!(inserted.len(), 2);
        assert!(inserted[0].get("_id").is_some());
        assert!(inserted[1].get("_id").is_none());
    }

    #[tokio::test]
    async fn test_update_strips_identity() {
        let database = Database::new(Recording::default());
        let mut accounts = database.model::<Account>("accounts");

        accounts.query(vec![filter("name", "Jon")]).unwrap().update(&account()).await.unwrap();

        let updates = database.backend().updates.lock().clone();
        assert_eq!(updates[0].keys().collect::<Vec<_>>(), vec!["name", "age", "balance"]);
    }

    #[tokio::test]
    async fn test_first_and_all_decode_results() {
        let database = Database::new(Recording::default());
        let mut accounts = database.model::<Account>("accounts");

        accounts.save(vec![account()]).await.unwrap();

        let first = accounts.first().await.unwrap().unwrap();
        assert_eq!(first.name, "Jon");
        assert_eq!(first.secret, "");
        assert_eq!(accounts.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_save_deadline_exceeded() {
        let database = Database::new(Recording { stall: true, ..Default::default() });
        let mut accounts = database.model::<Account>("accounts");

        let err = accounts
            .with_context(Context::with_timeout(Duration::from_millis(10)))
            .save(vec![account()])
            .await
            .unwrap_err();

        assert_eq!(err, ModelError::DeadlineExceeded);
        assert!(database.backend().inserted.lock().is_empty());
    }
}
