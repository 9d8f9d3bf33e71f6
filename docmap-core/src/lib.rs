//! A tag-driven record to document mapping layer with pluggable storage backends.
//!
//! This crate is the core of the docmap project and provides:
//!
//! - **Record descriptors** ([`record`]) - The static description of a mappable type
//! - **Tag parsing** ([`parser`]) - Splitting field tags into keys and constraint flags
//! - **Property Model** ([`property`], [`value`]) - The backend-neutral intermediate form
//! - **Encoding and decoding** ([`encode`], [`decode`]) - Record to model and back, with checked coercion
//! - **Schemas** ([`schema`]) - Cached per-type mappings and index derivation
//! - **Query directives** ([`query`]) - Backend-neutral filter, sort, limit and offset
//! - **Model contract** ([`model`]) - Typed query building and persistence over any backend
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing storage backends
//! - **Database handle** ([`database`]) - The owned entry point to a backend
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! # Example
//!
//! ```ignore
//! use docmap::{encode, decode, Record};
//!
//! #[derive(Debug, Clone, Default, PartialEq, Record)]
//! pub struct User {
//!     #[tag(db = "mongoid")]
//!     pub id: String,
//!     #[tag(db = "name,required")]
//!     pub name: String,
//! }
//!
//! let model = encode(&user)?;
//! let mut copy = User::default();
//! decode(&mut copy, &model)?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmap_core;

pub mod backend;
pub mod context;
pub mod database;
pub mod decode;
pub mod encode;
pub mod error;
pub mod model;
pub mod parser;
pub mod property;
pub mod query;
pub mod record;
pub mod schema;
pub mod value;
