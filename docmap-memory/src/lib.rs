//! In-memory storage backend for docmap.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is ideal for development
//! and testing.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Property Model storage** - Records are kept in their encoded, backend-neutral form
//! - **Full query support** - Supports equality filters, multi-key sorting, offset and limit
//! - **Uniqueness** - Enforces `_id` and unique index keys per collection
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
//!     #[tag(db = "name,required")]
//!     pub name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let database = Database::new(InMemoryStore::builder().build().await?);
//!     let mut users = database.register::<User>("users").await?;
//!
//!     users.save(vec![User { name: "Alice".to_string(), ..Default::default() }]).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmap_memory;

pub mod evaluator;
pub mod store;

pub use evaluator::MemoryQuery;
pub use store::{InMemoryStore, InMemoryStoreBuilder};
