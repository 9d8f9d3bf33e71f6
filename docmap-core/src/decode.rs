//! Property Model to record conversion.

use tracing::debug;

use bson::oid::ObjectId;

use crate::{
    error::{ModelError, ModelResult},
    parser::DB_TAG,
    property::PropertyModel,
    record::{Record, RecordKind},
    schema::Schema,
    value::{Coercion, FieldKind, Value},
};

/// Decodes Property Models under a given tag name.
#[derive(Debug, Clone, Copy)]
pub struct Decoder<'t> {
    tag: &'t str,
}

impl Default for Decoder<'static> {
    fn default() -> Self {
        Self::with_tag(DB_TAG)
    }
}

impl<'t> Decoder<'t> {
    pub fn with_tag(tag: &'t str) -> Self {
        Self { tag }
    }

    /// Assigns the fields of `record` from `model`.
    ///
    /// Each mapped field is looked up by the key the encoder would give it. A
    /// key absent from `model` leaves the field as it is. Read-only fields are
    /// never assigned.
    ///
    /// Decoding stops at the first failing field; fields assigned before it
    /// keep their new values.
    ///
    /// # Errors
    ///
    /// - [`ModelError::NotAddressable`] if `R` is not a struct with named fields.
    /// - [`ModelError::TypeMismatch`] if a stored kind cannot be assigned to its field.
    /// - [`ModelError::NumericOverflow`] if a stored number does not fit its field.
    pub fn decode<R: Record>(&self, record: &mut R, model: &PropertyModel) -> ModelResult<()> {
        let descriptor = R::descriptor();

        if descriptor.kind != RecordKind::Struct {
            return Err(ModelError::NotAddressable(format!(
                "{} `{}`",
                descriptor.kind.as_str(),
                descriptor.name
            )));
        }

        let schema = Schema::for_tag::<R>(self.tag)?;

        for field in schema.fields().iter().filter(|field| field.settable) {
            let Some(value) = model.value(&field.key) else {
                continue;
            };

            let assigned = match record.set_field(field.index, value.clone()) {
                Err(Coercion::Mismatch { expected, found }) if field.flags.identity => {
                    match identity_as(expected, value) {
                        Some(bridged) => record.set_field(field.index, bridged),
                        None => Err(Coercion::Mismatch { expected, found }),
                    }
                }
                other => other,
            };

            assigned.map_err(|coercion| ModelError::from_coercion(&field.key, coercion))?;
        }

        debug!(record = descriptor.name, properties = model.len(), "Decoded record");

        Ok(())
    }
}

/// Converts a stored identity between its hex string and object id forms.
///
/// Backends may hand an identity back in either form.
fn identity_as(expected: FieldKind, value: &Value) -> Option<Value> {
    match (expected, value) {
        (FieldKind::String, Value::ObjectId(id)) => Some(Value::String(id.to_hex())),
        (FieldKind::ObjectId, Value::String(hex)) => ObjectId::parse_str(hex).ok().map(Value::ObjectId),
        _ => None,
    }
}

/// Assigns the fields of `record` from `model` using the `db` tag.
pub fn decode<R: Record>(record: &mut R, model: &PropertyModel) -> ModelResult<()> {
    Decoder::default().decode(record, model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        encode::encode,
        parser::tests::{account, Account},
        property::Property,
        record::{FieldDef, RecordDescriptor, Tag},
        value::{Coercion, FieldKind, FieldValue, Value},
    };

    #[test]
    fn test_round_trip() {
        let original = account();
        let mut decoded = Account::default();

        decode(&mut decoded, &encode(&original).unwrap()).unwrap();

        assert_eq!(decoded, Account { secret: String::new(), ..original });
    }

    #[test]
    fn test_missing_keys_leave_fields_untouched() {
        let mut record = account();
        let model = PropertyModel::from(vec![Property::new("age", 30i64)]);

        decode(&mut record, &model).unwrap();

        assert_eq!(record.age, 30);
        assert_eq!(record.name, "Jon");
    }

    #[test]
    fn test_integer_width_conversion() {
        let mut record = Account::default();

        decode(&mut record, &vec![Property::new("age", 12i32)].into()).unwrap();
        assert_eq!(record.age, 12);

        let err = decode(&mut record, &vec![Property::new("age", 200i32)].into()).unwrap_err();
        assert_eq!(
            err,
            ModelError::NumericOverflow { key: "age".into(), value: "200".into(), target: FieldKind::I8 }
        );
        assert_eq!(record.age, 12);
    }

    #[test]
    fn test_type_mismatch() {
        let mut record = Account::default();
        let err = decode(&mut record, &vec![Property::new("name", 5i32)].into()).unwrap_err();

        assert_eq!(
            err,
            ModelError::TypeMismatch { key: "name".into(), expected: FieldKind::String, found: FieldKind::I32 }
        );
    }

    #[test]
    fn test_decode_stops_at_first_error() {
        let mut record = Account::default();
        let model = PropertyModel::from(vec![
            Property::new("_id", "abc"),
            Property::new("age", "twelve"),
            Property::new("balance", 3.5f64),
        ]);

        assert!(decode(&mut record, &model).is_err());
        assert_eq!(record.id, "abc");
        assert_eq!(record.balance, 0.0);
    }

    #[test]
    fn test_identity_accepts_object_id() {
        let id = ObjectId::parse_str("677904ef31ac7ccf730d4e39").unwrap();
        let mut record = Account::default();

        decode(&mut record, &vec![Property::new("_id", Value::ObjectId(id))].into()).unwrap();
        assert_eq!(record.id, "677904ef31ac7ccf730d4e39");

        let err = decode(&mut record, &vec![Property::new("name", Value::ObjectId(id))].into()).unwrap_err();
        assert!(matches!(err, ModelError::TypeMismatch { found: FieldKind::ObjectId, .. }));
    }

    #[test]
    fn test_skipped_field_is_never_decoded() {
        let mut record = Account::default();
        decode(&mut record, &vec![Property::new("secret", "leaked")].into()).unwrap();

        assert_eq!(record.secret, "");
    }

    #[derive(Debug, Default, PartialEq)]
    struct Audit {
        created_by: String,
        note: Option<String>,
    }

    static AUDIT: RecordDescriptor = RecordDescriptor {
        name: "Audit",
        kind: RecordKind::Struct,
        fields: &[
            FieldDef { name: "created_by", tags: &[Tag { name: "db", value: "created_by" }], settable: false },
            FieldDef { name: "note", tags: &[Tag { name: "db", value: "note" }], settable: true },
        ],
    };

    impl Record for Audit {
        fn descriptor() -> &'static RecordDescriptor {
            &AUDIT
        }

        fn field_value(&self, index: usize) -> Option<Value> {
            match index {
                0 => Some(self.created_by.to_value()),
                1 => Some(self.note.to_value()),
                _ => None,
            }
        }

        fn set_field(&mut self, index: usize, value: Value) -> Result<(), Coercion> {
            match index {
                0 => self.created_by = FieldValue::from_value(value)?,
                1 => self.note = FieldValue::from_value(value)?,
                _ => {}
            }
            Ok(())
        }
    }

    #[test]
    fn test_readonly_fields_are_skipped() {
        let mut audit = Audit { created_by: "system".into(), note: None };
        let model = PropertyModel::from(vec![Property::new("created_by", "intruder"), Property::new("note", "hi")]);

        decode(&mut audit, &model).unwrap();

        assert_eq!(audit, Audit { created_by: "system".into(), note: Some("hi".into()) });
    }

    #[test]
    fn test_null_into_option() {
        let mut audit = Audit { created_by: String::new(), note: Some("old".into()) };
        decode(&mut audit, &vec![Property::new("note", Value::Null)].into()).unwrap();

        assert_eq!(audit.note, None);
    }

    #[derive(Debug, Default)]
    enum Shape {
        #[default]
        Circle,
    }

    static SHAPE: RecordDescriptor = RecordDescriptor { name: "Shape", kind: RecordKind::Enum, fields: &[] };

    impl Record for Shape {
        fn descriptor() -> &'static RecordDescriptor {
            &SHAPE
        }

        fn field_value(&self, _index: usize) -> Option<Value> {
            None
        }

        fn set_field(&mut self, _index: usize, _value: Value) -> Result<(), Coercion> {
            Ok(())
        }
    }

    #[test]
    fn test_non_struct_destination() {
        let mut shape = Shape::Circle;
        let err = decode(&mut shape, &PropertyModel::new()).unwrap_err();

        assert!(matches!(err, ModelError::NotAddressable(_)));
    }
}
