//! Record to Property Model conversion.

use tracing::debug;

use crate::{
    error::ModelResult,
    parser::{TagParser, DB_TAG},
    property::{Property, PropertyModel},
    record::Record,
    schema::Schema,
};

/// Encodes records under a given tag name.
#[derive(Debug, Clone, Copy)]
pub struct Encoder<'t> {
    parser: TagParser<'t>,
}

impl Default for Encoder<'static> {
    fn default() -> Self {
        Self::with_tag(DB_TAG)
    }
}

impl<'t> Encoder<'t> {
    /// Creates an encoder reading the tag named `tag`.
    pub fn with_tag(tag: &'t str) -> Self {
        Self {
            parser: TagParser::new(tag),
        }
    }

    /// Converts `record` into a Property Model.
    ///
    /// Properties appear in the declaration order of the record's mapped fields.
    /// The key of each property is the first name token of its tag, or `_id`
    /// for the identity field.
    ///
    /// # Errors
    ///
    /// - [`ModelError::Type`](crate::error::ModelError::Type) and
    ///   [`ModelError::MissingTag`](crate::error::ModelError::MissingTag) from the parser.
    /// - [`ModelError::Configuration`](crate::error::ModelError::Configuration) for
    ///   conflicting tags. No partial model is returned.
    pub fn encode<R: Record>(&self, record: &R) -> ModelResult<PropertyModel> {
        let schema = Schema::for_tag::<R>(self.parser.tag())?;
        let fields = self.parser.parse(record)?;

        let mut model = PropertyModel::with_capacity(fields.len());

        // Both walk the same descriptor under the same tag, so they line up.
        for (spec, field) in schema.fields().iter().zip(fields.iter()) {
            model.push(Property {
                key: spec.key.clone(),
                value: field.value.clone(),
                required: spec.flags.required,
                unique: spec.flags.unique,
                index: spec.flags.index,
                identity: spec.flags.identity,
            });
        }

        debug!(record = schema.record(), properties = model.len(), "Encoded record");

        Ok(model)
    }
}

/// Converts `record` into a Property Model using the `db` tag.
pub fn encode<R: Record>(record: &R) -> ModelResult<PropertyModel> {
    Encoder::default().encode(record)
}
