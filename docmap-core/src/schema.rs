//! Resolved per-type mappings.
//!
//! A [`Schema`] is what the tag tokens of a record type resolve to: the property
//! key and constraint flags of every mapped field. It depends only on the type,
//! so it is built once per (type, tag name) and cached for the life of the
//! process.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::{
    any::TypeId,
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tracing::{debug, warn};

use crate::{
    error::{ModelError, ModelResult},
    parser::{self, TagParser, DB_TAG},
    record::Record,
    value::FieldKind,
};

static SCHEMAS: Lazy<RwLock<HashMap<(TypeId, String), Arc<Schema>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Constraint flags of one field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFlags {
    pub required: bool,
    pub unique: bool,
    pub index: bool,
    pub identity: bool,
}

impl FieldFlags {
    /// Reads the flags present in a field's tag tokens.
    pub fn from_tokens(tokens: &[&str]) -> Self {
        Self {
            required: tokens.contains(&parser::REQUIRED),
            unique: tokens.contains(&parser::UNIQUE),
            index: tokens.contains(&parser::INDEX),
            identity: tokens.contains(&parser::IDENTITY),
        }
    }
}

/// The resolved mapping of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Position of the field in the record's declaration.
    pub index: usize,
    /// Declared field identifier.
    pub name: &'static str,
    /// Property key the field maps to.
    pub key: String,
    pub flags: FieldFlags,
    /// Value kind of the field, when the record reports it.
    pub kind: Option<FieldKind>,
    /// Whether the decoder may assign the field.
    pub settable: bool,
}

/// An index the backend should create for a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexSpec {
    pub key: String,
    pub unique: bool,
}

/// Validates field mappings as they are resolved.
///
/// Rejects a field flagged both identity and index, a second identity field,
/// an identity of a kind other than string, object id or uuid, and two fields
/// resolving to the same key.
#[derive(Debug)]
struct MappingCheck<'a> {
    record: &'a str,
    identity: Option<&'static str>,
    keys: HashSet<String>,
}

impl<'a> MappingCheck<'a> {
    fn new(record: &'a str) -> Self {
        Self {
            record,
            identity: None,
            keys: HashSet::new(),
        }
    }

    fn admit(
        &mut self,
        name: &'static str,
        key: &str,
        flags: FieldFlags,
        kind: Option<FieldKind>,
    ) -> ModelResult<()> {
        if flags.identity && flags.index {
            return Err(ModelError::Configuration(format!(
                "field `{}` of `{}` cannot be both the identity and indexed",
                name, self.record
            )));
        }

        if flags.identity {
            if let Some(previous) = self.identity {
                return Err(ModelError::Configuration(format!(
                    "`{}` declares more than one identity field: `{}` and `{}`",
                    self.record, previous, name
                )));
            }
            self.identity = Some(name);

            if let Some(kind) = kind.filter(|kind| !is_identity_kind(*kind)) {
                return Err(ModelError::Configuration(format!(
                    "identity field `{}` of `{}` is {}; expected string, object id or uuid",
                    name, self.record, kind
                )));
            }
        }

        if !self.keys.insert(key.to_string()) {
            return Err(ModelError::Configuration(format!(
                "key `{}` is mapped by more than one field of `{}`",
                key, self.record
            )));
        }

        Ok(())
    }
}

fn is_identity_kind(kind: FieldKind) -> bool {
    matches!(kind, FieldKind::String | FieldKind::ObjectId | FieldKind::Uuid)
}

/// The resolved mapping of a record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    record: &'static str,
    fields: Vec<FieldSpec>,
}

impl Schema {
    /// Returns the cached schema of `R` under the `db` tag.
    ///
    /// # Errors
    ///
    /// Returns the parser's errors for malformed records and
    /// [`ModelError::Configuration`] for conflicting tags. Failures are not cached.
    pub fn of<R: Record>() -> ModelResult<Arc<Schema>> {
        Self::for_tag::<R>(DB_TAG)
    }

    /// Returns the cached schema of `R` under the tag named `tag`.
    pub fn for_tag<R: Record>(tag: &str) -> ModelResult<Arc<Schema>> {
        let cache_key = (TypeId::of::<R>(), tag.to_string());

        if let Some(schema) = SCHEMAS.read().get(&cache_key) {
            return Ok(Arc::clone(schema));
        }

        let schema = Arc::new(Self::build::<R>(tag)?);

        Ok(Arc::clone(
            SCHEMAS.write().entry(cache_key).or_insert(schema),
        ))
    }

    fn build<R: Record>(tag: &str) -> ModelResult<Self> {
        let descriptor = R::descriptor();
        let parsed = TagParser::new(tag).parse_descriptor(descriptor)?;

        let mut check = MappingCheck::new(descriptor.name);
        let mut fields = Vec::with_capacity(parsed.len());

        for field in parsed {
            let key = parser::resolve_key(&field.tags, field.name);
            let flags = FieldFlags::from_tokens(&field.tags);

            let key_token = parser::key_position(&field.tags);

            for (position, token) in field.tags.iter().enumerate() {
                if Some(position) != key_token && !parser::is_flag(token) && !token.is_empty() {
                    warn!(record = descriptor.name, field = field.name, token = %token, "Ignoring unknown tag token");
                }
            }

            let kind = R::field_kind(field.index);

            check.admit(field.name, &key, flags, kind)?;

            fields.push(FieldSpec {
                index: field.index,
                name: field.name,
                key,
                flags,
                kind,
                settable: field.settable,
            });
        }

        debug!(record = descriptor.name, tag, fields = fields.len(), "Built record schema");

        Ok(Self {
            record: descriptor.name,
            fields,
        })
    }

    /// Name of the record type.
    pub fn record(&self) -> &'static str {
        self.record
    }

    /// Mapped fields in declaration order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Returns the field mapped to `key`.
    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.key == key)
    }

    /// Returns the identity field, if any.
    pub fn identity(&self) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.flags.identity)
    }

    /// Returns an index spec for every field flagged `index`, in declaration order.
    pub fn index_specs(&self) -> Vec<IndexSpec> {
        self.fields
            .iter()
            .filter(|field| field.flags.index)
            .map(|field| IndexSpec {
                key: field.key.clone(),
                unique: field.flags.unique,
            })
            .collect()
    }
}

/// Derives the indexes a backend should create for `R`.
///
/// Only fields flagged `index` produce a spec; `unique` alone does not.
///
/// # Errors
///
/// Returns [`ModelError::Configuration`] if a field is flagged both identity
/// and index.
pub fn derive_index_specs<R: Record>() -> ModelResult<Vec<IndexSpec>> {
    Ok(Schema::of::<R>()?.index_specs())
}
