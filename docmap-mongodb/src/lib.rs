//! MongoDB backend implementation for docmap.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait,
//! translating query directives into MongoDB filter, sort, skip and limit options.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docmap = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Features
//!
//! - **Persistent storage** - Data is persisted to MongoDB Atlas or self-hosted MongoDB
//! - **Identity mapping** - Hex string identities are stored as native `ObjectId`s
//! - **Async/await** - Fully asynchronous API built on MongoDB's async driver
//! - **Indexing** - Indexes derived from record tags are created on registration
//!
//! # Connection
//!
//! The builder parses the connection string, creates the client and pings the
//! database before returning. The connection is an explicit handle; drop it or
//! call `shutdown` to close it.
//!
//! # Example
//!
//! ```ignore
//! use docmap::{backend::StoreBackendBuilder, mongodb::MongoDbStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MongoDbStore::builder("mongodb://localhost:27017", "my_database")
//!         .connect_timeout(std::time::Duration::from_secs(2))
//!         .build()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmap_mongodb;

pub mod convert;
pub mod query;
pub mod store;

pub use query::MongoQuery;
pub use store::{MongoDbStore, MongoDbStoreBuilder};
