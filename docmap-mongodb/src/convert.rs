//! Conversion between Property Models and BSON documents.
//!
//! String identities are written as [`ObjectId`]s parsed from their hex form.
//! Stored object ids are read back as [`Value::ObjectId`]; the decoder turns
//! them into hex strings for string identity fields.
//!
//! Integers keep their width where BSON allows it: 8, 16 and 32-bit integers
//! become `Int32`, `u32` and 64-bit integers become `Int64`.

use bson::{oid::ObjectId, spec::BinarySubtype, Binary, Bson, Document};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use docmap_core::{
    error::{ModelError, ModelResult},
    parser::IDENTITY_KEY,
    property::{Property, PropertyModel},
    value::{FieldKind, Value},
};

/// Converts one property value into BSON.
///
/// # Errors
///
/// Returns [`ModelError::NumericOverflow`] for a `u64` above `i64::MAX`.
pub fn value_to_bson(key: &str, value: &Value) -> ModelResult<Bson> {
    Ok(match value {
        Value::Null => Bson::Null,
        Value::Bool(v) => Bson::Boolean(*v),
        Value::I8(v) => Bson::Int32(i32::from(*v)),
        Value::I16(v) => Bson::Int32(i32::from(*v)),
        Value::I32(v) => Bson::Int32(*v),
        Value::I64(v) => Bson::Int64(*v),
        Value::U8(v) => Bson::Int32(i32::from(*v)),
        Value::U16(v) => Bson::Int32(i32::from(*v)),
        Value::U32(v) => Bson::Int64(i64::from(*v)),
        Value::U64(v) => Bson::Int64(i64::try_from(*v).map_err(|_| ModelError::NumericOverflow {
            key: key.to_string(),
            value: v.to_string(),
            target: FieldKind::I64,
        })?),
        Value::F32(v) => Bson::Double(f64::from(*v)),
        Value::F64(v) => Bson::Double(*v),
        Value::String(v) => Bson::String(v.clone()),
        Value::Uuid(v) => Bson::Binary(Binary {
            subtype: BinarySubtype::Uuid,
            bytes: v.as_bytes().to_vec(),
        }),
        Value::DateTime(v) => Bson::DateTime(bson::DateTime::from_millis(v.timestamp_millis())),
        Value::ObjectId(v) => Bson::ObjectId(*v),
    })
}

/// Converts an identity value into BSON, parsing hex strings as [`ObjectId`]s.
///
/// # Errors
///
/// Returns [`ModelError::Serialization`] if a string identity is not valid hex.
pub fn identity_to_bson(value: &Value) -> ModelResult<Bson> {
    match value {
        Value::String(hex) => ObjectId::parse_str(hex)
            .map(Bson::ObjectId)
            .map_err(|e| ModelError::Serialization(format!("invalid identity `{}`: {}", hex, e))),
        other => value_to_bson(IDENTITY_KEY, other),
    }
}

/// Converts a filter value into BSON.
///
/// A filter on the identity key with a valid hex string matches the stored
/// [`ObjectId`]; any other string is compared as is.
pub fn filter_to_bson(key: &str, value: &Value) -> ModelResult<Bson> {
    match value {
        Value::String(hex) if key == IDENTITY_KEY => Ok(ObjectId::parse_str(hex)
            .map(Bson::ObjectId)
            .unwrap_or_else(|_| Bson::String(hex.clone()))),
        other => value_to_bson(key, other),
    }
}

/// Converts a Property Model into a BSON document, preserving property order.
pub fn model_to_document(model: &PropertyModel) -> ModelResult<Document> {
    let mut document = Document::new();

    for property in model {
        let value = if property.identity || property.key == IDENTITY_KEY {
            identity_to_bson(&property.value)?
        } else {
            value_to_bson(&property.key, &property.value)?
        };

        document.insert(property.key.clone(), value);
    }

    Ok(document)
}

/// Converts one stored BSON value into a property value.
///
/// # Errors
///
/// - [`ModelError::UnsupportedKind`] for BSON types with no [`Value`] counterpart.
/// - [`ModelError::Serialization`] for malformed UUID binaries or out of range dates.
pub fn bson_to_value(key: &str, bson: &Bson) -> ModelResult<Value> {
    Ok(match bson {
        Bson::Null => Value::Null,
        Bson::Boolean(v) => Value::Bool(*v),
        Bson::Int32(v) => Value::I32(*v),
        Bson::Int64(v) => Value::I64(*v),
        Bson::Double(v) => Value::F64(*v),
        Bson::String(v) => Value::String(v.clone()),
        Bson::ObjectId(v) => Value::ObjectId(*v),
        Bson::DateTime(v) => Value::DateTime(
            DateTime::<Utc>::from_timestamp_millis(v.timestamp_millis()).ok_or_else(|| {
                ModelError::Serialization(format!("date out of range for `{}`", key))
            })?,
        ),
        Bson::Binary(binary) if binary.subtype == BinarySubtype::Uuid => Value::Uuid(
            Uuid::from_slice(&binary.bytes)
                .map_err(|e| ModelError::Serialization(format!("invalid uuid for `{}`: {}", key, e)))?,
        ),
        other => {
            return Err(ModelError::UnsupportedKind(format!(
                "{:?} for `{}`",
                other.element_type(),
                key
            )));
        }
    })
}

/// Converts a stored BSON document into a Property Model.
///
/// The `_id` property is marked as the identity.
pub fn document_to_model(document: &Document) -> ModelResult<PropertyModel> {
    document
        .iter()
        .map(|(key, bson)| {
            let mut property = Property::new(key.clone(), bson_to_value(key, bson)?);
            property.identity = key == IDENTITY_KEY;
            Ok(property)
        })
        .collect::<ModelResult<Vec<_>>>()
        .map(PropertyModel::from)
}
