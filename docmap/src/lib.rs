//! Main docmap crate providing a unified interface for record mapping and storage.
//!
//! This crate is the primary entry point for users of the docmap framework.
//! It re-exports the core types and functionality from the sub-crates and provides
//! convenient access to the storage backends.
//!
//! # Features
//!
//! - **Tag-driven mapping** - Describe how fields map to stored properties with `#[tag(db = "...")]`
//! - **Checked coercion** - Stored numbers decode into any integer width that fits, never truncated
//! - **Multiple backends** - In-memory and MongoDB storage behind one backend trait
//! - **Composable queries** - Filter, sort, offset and limit directives in issue order
//!
//! # Quick Start
//!
//! ```ignore
//! use docmap::{prelude::*, memory::InMemoryStore};
//!
//! #[derive(Debug, Clone, Default, PartialEq, Record)]
//! pub struct User {
//!     #[tag(db = "mongoid")]
//!     pub id: String,
//!     #[tag(db = "email,required,index,unique")]
//!     pub email: String,
//!     #[tag(db = "age")]
//!     pub age: i8,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let database = Database::new(InMemoryStore::builder().build().await?);
//!
//!     // Registering creates the indexes derived from the tags
//!     let mut users = database.register::<User>("users").await?;
//!
//!     users
//!         .save(vec![User { email: "alice@example.com".into(), age: 30, ..Default::default() }])
//!         .await?;
//!
//!     let alice = users
//!         .query(QueryParams::builder().filter("email", "alice@example.com").build())?
//!         .first()
//!         .await?;
//!
//!     println!("Found: {:?}", alice);
//!
//!     database.shutdown().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Mapping without a backend
//!
//! The encoder and decoder work on their own:
//!
//! ```ignore
//! use docmap::{encode, decode};
//!
//! let model = encode(&user)?;
//! assert_eq!(model.value("age"), Some(&Value::I8(30)));
//!
//! let mut copy = User::default();
//! decode(&mut copy, &model)?;
//! ```
//!
//! # Backends
//!
//! - [`memory`] - Fast in-memory storage for development and testing
//! - [`mongodb`] - Persistent MongoDB backend (requires `mongodb` feature)

pub mod prelude;

pub use docmap_core::{
    backend, context, database, decode, encode, error, model, parser, property, query, record, schema,
    value,
};

pub use docmap_core::{
    decode::decode,
    encode::encode,
    record::Record,
    schema::derive_index_specs,
};
pub use docmap_macros::Record;

// Re-export the crates of the structured value kinds for convenience
pub use bson;
pub use chrono;
pub use uuid;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docmap_memory::{InMemoryStore, InMemoryStoreBuilder, MemoryQuery};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docmap_mongodb::{MongoDbStore, MongoDbStoreBuilder, MongoQuery};
}
