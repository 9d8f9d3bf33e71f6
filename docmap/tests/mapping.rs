use chrono::{DateTime, Utc};
use docmap::{
    bson::oid::ObjectId,
    decode, derive_index_specs, encode,
    encode::Encoder,
    error::ModelError,
    property::{Property, PropertyModel},
    record::RecordKind,
    schema::IndexSpec,
    uuid::Uuid,
    value::{FieldKind, Value},
    Record,
};

#[derive(Debug, Clone, Default, PartialEq, Record)]
struct User {
    #[tag(db = "mongoid")]
    id: String,
    #[tag(db = "name,required,unique,index")]
    name: String,
    #[tag(db = "age")]
    age: i8,
    #[tag(db = "score", json = "score")]
    score: f32,
    #[tag(db = "visits")]
    visits: u64,
    #[tag(db = "active")]
    active: bool,
    #[tag(db = "token")]
    token: Uuid,
    #[tag(db = "joined")]
    joined: Option<DateTime<Utc>>,
    #[tag(db = "ref")]
    reference: Option<ObjectId>,
    #[tag(db = "-")]
    cache: String,
}

fn user() -> User {
    User {
        id: "677904ef31ac7ccf730d4e39".into(),
        name: "Jon".into(),
        age: 12,
        score: 4.5,
        visits: 9_000_000_000,
        active: true,
        token: Uuid::new_v4(),
        joined: DateTime::<Utc>::from_timestamp(1_735_000_000, 0),
        reference: Some(ObjectId::new()),
        cache: String::new(),
    }
}

#[derive(Debug, Default, PartialEq, Record)]
struct Named {
    #[tag(db = "name,required,unique,index")]
    name: String,
}

#[derive(Debug, Default, Record)]
struct IndexedIdentity {
    #[tag(db = "id,index,mongoid")]
    id: String,
}

#[derive(Debug, Default, Record)]
struct Untagged {
    #[tag(db = "name")]
    name: String,
    age: i32,
}

#[derive(Debug, Default, PartialEq, Record)]
struct Audited {
    #[tag(db = "note")]
    note: String,
    #[tag(db = "created_by", readonly)]
    created_by: String,
}

#[derive(Debug, Default, Record)]
struct Point(i32, i32);

#[derive(Debug, Default, PartialEq, Record)]
struct Wrapper<T: docmap::value::FieldValue + Default + Send + Sync + 'static> {
    #[tag(db = "inner")]
    inner: T,
}

#[test]
fn test_round_trip() {
    let original = user();
    let mut decoded = User::default();

    decode(&mut decoded, &encode(&original).unwrap()).unwrap();

    assert_eq!(decoded, original);
}

#[test]
fn test_property_order_follows_declaration() {
    let model = encode(&user()).unwrap();

    assert_eq!(
        model.keys().collect::<Vec<_>>(),
        vec!["_id", "name", "age", "score", "visits", "active", "token", "joined", "ref"]
    );
}

#[test]
fn test_identity_precedence() {
    #[derive(Debug, Default, Record)]
    struct Legacy {
        #[tag(db = "legacy_id,mongoid")]
        id: String,
    }

    let model = encode(&Legacy { id: "abc".into() }).unwrap();

    assert_eq!(model.keys().collect::<Vec<_>>(), vec!["_id"]);
    assert!(model.get("legacy_id").is_none());
    assert!(model.identity().is_some());
}

#[test]
fn test_identity_with_index_is_a_configuration_error() {
    let err = encode(&IndexedIdentity::default()).unwrap_err();

    assert!(matches!(err, ModelError::Configuration(_)));
    assert!(matches!(derive_index_specs::<IndexedIdentity>(), Err(ModelError::Configuration(_))));
}

#[test]
fn test_missing_tag() {
    let err = encode(&Untagged::default()).unwrap_err();

    assert_eq!(
        err,
        ModelError::MissingTag { record: "Untagged".into(), field: "age".into(), tag: "db".into() }
    );
}

#[test]
fn test_skip_token() {
    let model = encode(&user()).unwrap();
    assert!(model.get("cache").is_none());
    assert!(model.get("-").is_none());

    let mut decoded = User { cache: "kept".into(), ..Default::default() };
    decode(&mut decoded, &encode(&user()).unwrap()).unwrap();
    assert_eq!(decoded.cache, "kept");
}

#[test]
fn test_flags_example() {
    let model = encode(&Named { name: "Jon".into() }).unwrap();

    assert_eq!(
        model,
        PropertyModel::from(vec![Property {
            key: "name".into(),
            value: Value::String("Jon".into()),
            required: true,
            unique: true,
            index: true,
            identity: false,
        }])
    );
}

#[test]
fn test_narrow_integer_decode() {
    let mut decoded = User::default();

    decode(&mut decoded, &vec![Property::new("age", 12i32)].into()).unwrap();
    assert_eq!(decoded.age, 12);

    let err = decode(&mut decoded, &vec![Property::new("age", 200i32)].into()).unwrap_err();
    assert_eq!(
        err,
        ModelError::NumericOverflow { key: "age".into(), value: "200".into(), target: FieldKind::I8 }
    );
    assert_eq!(decoded.age, 12);
}

#[test]
fn test_integer_widening_and_float_narrowing() {
    let mut decoded = User::default();
    let model = PropertyModel::from(vec![
        Property::new("visits", 42i32),
        Property::new("score", 2.25f64),
    ]);

    decode(&mut decoded, &model).unwrap();

    assert_eq!(decoded.visits, 42);
    assert_eq!(decoded.score, 2.25);

    let err = decode(&mut decoded, &vec![Property::new("visits", -1i64)].into()).unwrap_err();
    assert!(matches!(err, ModelError::NumericOverflow { target: FieldKind::U64, .. }));
}

#[test]
fn test_structured_mismatch_is_an_error() {
    let mut decoded = User::default();
    let err = decode(&mut decoded, &vec![Property::new("token", "not-a-uuid")].into()).unwrap_err();

    assert_eq!(
        err,
        ModelError::TypeMismatch { key: "token".into(), expected: FieldKind::Uuid, found: FieldKind::String }
    );
}

#[test]
fn test_null_into_optional_and_required_fields() {
    let mut decoded = user();

    decode(&mut decoded, &vec![Property::new("joined", Value::Null)].into()).unwrap();
    assert_eq!(decoded.joined, None);

    let err = decode(&mut decoded, &vec![Property::new("age", Value::Null)].into()).unwrap_err();
    assert!(matches!(err, ModelError::TypeMismatch { found: FieldKind::Null, .. }));
}

#[test]
fn test_readonly_field_is_encoded_but_not_decoded() {
    let model = encode(&Audited { note: "hi".into(), created_by: "system".into() }).unwrap();
    assert_eq!(model.value("created_by"), Some(&Value::String("system".into())));

    let mut decoded = Audited::default();
    decode(&mut decoded, &model).unwrap();
    assert_eq!(decoded, Audited { note: "hi".into(), created_by: String::new() });
}

#[test]
fn test_non_struct_records() {
    assert_eq!(Point::descriptor().kind, RecordKind::Tuple);
    assert!(matches!(encode(&Point(1, 2)), Err(ModelError::Type(_))));
    assert!(matches!(decode(&mut Point::default(), &PropertyModel::new()), Err(ModelError::NotAddressable(_))));
}

#[test]
fn test_generic_record() {
    let model = encode(&Wrapper { inner: 7u16 }).unwrap();
    assert_eq!(model.value("inner"), Some(&Value::U16(7)));

    let mut decoded = Wrapper::<u16>::default();
    decode(&mut decoded, &model).unwrap();
    assert_eq!(decoded.inner, 7);
}

#[test]
fn test_other_tag_name() {
    let err = Encoder::with_tag("json").encode(&user()).unwrap_err();

    assert!(matches!(err, ModelError::MissingTag { ref field, .. } if field == "id"));
}

#[test]
fn test_index_specs() {
    assert_eq!(
        derive_index_specs::<User>().unwrap(),
        vec![IndexSpec { key: "name".into(), unique: true }]
    );
}

#[test]
fn test_serialized_model_shape() {
    let json = serde_json::to_value(encode(&Named { name: "Jon".into() }).unwrap()).unwrap();

    assert_eq!(
        json,
        serde_json::json!([{
            "key": "name",
            "value": { "String": "Jon" },
            "required": true,
            "unique": true,
            "index": true,
            "identity": false
        }])
    );
}
