//! Error types and result types for mapping and model operations.
//!
//! Every fallible operation in the mapping engine and in the model contract returns
//! [`ModelResult<T>`]. All variants are recoverable by the caller; nothing in this
//! crate panics on bad input.

use thiserror::Error;

use crate::value::{Coercion, FieldKind};

/// Represents all possible errors raised while mapping records or talking to a backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// A record field has no tag under the governing tag name.
    #[error("field `{field}` of `{record}` has no `{tag}` tag")]
    MissingTag {
        /// Name of the record type.
        record: String,
        /// Declared name of the offending field.
        field: String,
        /// The tag name that was looked up.
        tag: String,
    },
    /// The input is not a struct with named fields.
    #[error("invalid type received: expected a struct with named fields, got {0}")]
    Type(String),
    /// A value kind has no counterpart in the property model.
    #[error("unsupported value kind: {0}")]
    UnsupportedKind(String),
    /// The decode destination cannot have its fields assigned.
    #[error("destination `{0}` is not an addressable record")]
    NotAddressable(String),
    /// A stored value does not match the kind of the destination field.
    #[error("type mismatch for `{key}`: expected {expected}, found {found}")]
    TypeMismatch {
        /// Property key being decoded.
        key: String,
        /// Kind of the destination field.
        expected: FieldKind,
        /// Kind of the stored value.
        found: FieldKind,
    },
    /// A stored number does not fit the destination width.
    #[error("value {value} for `{key}` overflows {target}")]
    NumericOverflow {
        /// Property key being decoded.
        key: String,
        /// The stored value, rendered.
        value: String,
        /// Kind of the destination field.
        target: FieldKind,
    },
    /// The record's tags describe an invalid mapping.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A required property holds no value.
    #[error("field `{0}` is required but not provided")]
    RequiredField(String),
    /// The backend cannot translate a query directive.
    #[error("unsupported query directive: {0}")]
    UnsupportedDirective(String),
    /// A write would duplicate a unique key.
    #[error("duplicate value for unique key `{key}` in collection {collection}")]
    DuplicateKey {
        /// The key whose uniqueness is violated.
        key: String,
        /// The collection written to.
        collection: String,
    },
    /// The deadline attached to the handle's context passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,
    /// Conversion between the property model and a backend format failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during backend initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl ModelError {
    /// Attaches a property key to a value coercion failure.
    pub fn from_coercion(key: &str, coercion: Coercion) -> Self {
        match coercion {
            Coercion::Mismatch { expected, found } => ModelError::TypeMismatch {
                key: key.to_string(),
                expected,
                found,
            },
            Coercion::Overflow { value, target } => ModelError::NumericOverflow {
                key: key.to_string(),
                value,
                target,
            },
        }
    }
}

/// A specialized `Result` type for mapping and model operations.
pub type ModelResult<T> = Result<T, ModelError>;
