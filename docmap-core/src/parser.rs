//! Struct-tag parsing.
//!
//! The parser walks a record's fields in declaration order and produces one
//! [`FieldDescriptor`] per mapped field: the field's current value, its declared
//! name and the tokens of its tag value split on [`DELIMITER`].
//!
//! Every field must carry the governing tag. An empty tag value is accepted, a
//! missing tag is a [`ModelError::MissingTag`]. A field whose tokens include the
//! skip sentinel [`SKIP`] is left out.
//!
//! Descriptor buffers are pooled process-wide. A buffer is owned by exactly one
//! [`ParsedFields`] at a time and every descriptor in it is reset before the
//! buffer goes back to the pool.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::{mem, ops::Deref};

use crate::{
    error::{ModelError, ModelResult},
    record::{FieldDef, Record, RecordDescriptor, RecordKind},
    value::Value,
};

/// The tag name read by the default encoder and decoder.
pub const DB_TAG: &str = "db";
/// Separator between tag tokens.
pub const DELIMITER: char = ',';
/// Tag token that excludes a field from mapping.
pub const SKIP: &str = "-";
/// Flag: the property must hold a value on write.
pub const REQUIRED: &str = "required";
/// Flag: the backend should index the property.
pub const INDEX: &str = "index";
/// Flag: the backend should enforce uniqueness of the property.
pub const UNIQUE: &str = "unique";
/// Flag: the property is the record's identity.
pub const IDENTITY: &str = "mongoid";
/// Property key used for the identity field.
pub const IDENTITY_KEY: &str = "_id";

const MAX_POOLED_BUFFERS: usize = 64;

/// Returns `true` if `token` is one of the flag tokens.
pub fn is_flag(token: &str) -> bool {
    matches!(token, REQUIRED | INDEX | UNIQUE | IDENTITY)
}

/// Returns the position of the name token: the first non-empty token that is
/// not a flag.
pub fn key_position(tokens: &[&str]) -> Option<usize> {
    tokens
        .iter()
        .position(|token| !token.is_empty() && !is_flag(token))
}

/// Resolves the property key for a field from its tag tokens.
///
/// The identity flag wins over any name token. Otherwise the name token is the
/// key, falling back to the declared field name when the tag names no key.
pub fn resolve_key(tokens: &[&str], field_name: &str) -> String {
    if tokens.contains(&IDENTITY) {
        return IDENTITY_KEY.to_string();
    }

    key_position(tokens)
        .map(|position| tokens[position].to_string())
        .unwrap_or_else(|| field_name.to_string())
}

/// One parsed field of a record instance.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Position of the field in the record's declaration.
    pub index: usize,
    /// Declared field identifier.
    pub name: &'static str,
    /// Current value of the field.
    pub value: Value,
    /// Tag tokens in declaration order.
    pub tags: Vec<&'static str>,
}

impl Default for FieldDescriptor {
    fn default() -> Self {
        Self {
            index: 0,
            name: "",
            value: Value::Null,
            tags: Vec::new(),
        }
    }
}

impl FieldDescriptor {
    /// Returns `true` if the tag tokens contain `flag`.
    pub fn has_flag(&self, flag: &str) -> bool {
        self.tags.contains(&flag)
    }

    /// Returns the property key this field maps to.
    pub fn key(&self) -> String {
        resolve_key(&self.tags, self.name)
    }

    fn reset(&mut self) {
        self.index = 0;
        self.name = "";
        self.value = Value::Null;
        self.tags.clear();
    }
}

/// Tag tokens of one field, without a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTag {
    pub index: usize,
    pub name: &'static str,
    pub tags: Vec<&'static str>,
    pub settable: bool,
}

struct DescriptorPool {
    free: Mutex<Vec<Vec<FieldDescriptor>>>,
}

impl DescriptorPool {
    fn acquire(&self) -> Vec<FieldDescriptor> {
        self.free.lock().pop().unwrap_or_default()
    }

    fn release(&self, buffer: Vec<FieldDescriptor>) {
        let mut free = self.free.lock();

        if free.len() < MAX_POOLED_BUFFERS {
            free.push(buffer);
        }
    }
}

static POOL: Lazy<DescriptorPool> = Lazy::new(|| DescriptorPool {
    free: Mutex::new(Vec::new()),
});

/// The descriptors produced by one [`TagParser::parse`] call.
///
/// Dereferences to the parsed descriptors. Dropping it resets every descriptor
/// and returns the storage to the pool.
#[derive(Debug)]
pub struct ParsedFields {
    slots: Vec<FieldDescriptor>,
    len: usize,
}

impl ParsedFields {
    fn acquire() -> Self {
        Self { slots: POOL.acquire(), len: 0 }
    }

    fn next_slot(&mut self) -> &mut FieldDescriptor {
        if self.len == self.slots.len() {
            self.slots.push(FieldDescriptor::default());
        }

        let slot = &mut self.slots[self.len];
        slot.reset();
        self.len += 1;
        slot
    }
}

impl Deref for ParsedFields {
    type Target = [FieldDescriptor];

    fn deref(&self) -> &Self::Target {
        &self.slots[..self.len]
    }
}

impl Drop for ParsedFields {
    fn drop(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.reset();
        }

        POOL.release(mem::take(&mut self.slots));
    }
}

/// Parses record tags under one tag name.
#[derive(Debug, Clone, Copy)]
pub struct TagParser<'t> {
    tag: &'t str,
}

impl Default for TagParser<'static> {
    fn default() -> Self {
        Self::new(DB_TAG)
    }
}

impl<'t> TagParser<'t> {
    /// Creates a parser reading the tag named `tag`.
    pub fn new(tag: &'t str) -> Self {
        Self { tag }
    }

    /// Returns the governing tag name.
    pub fn tag(&self) -> &str {
        self.tag
    }

    /// Parses a record instance into field descriptors.
    ///
    /// # Errors
    ///
    /// - [`ModelError::Type`] if the record is not a struct with named fields.
    /// - [`ModelError::MissingTag`] if a field has no tag under this parser's tag name.
    pub fn parse<R: Record>(&self, record: &R) -> ModelResult<ParsedFields> {
        let descriptor = R::descriptor();
        let mut parsed = ParsedFields::acquire();

        self.walk(descriptor, |index, field, tokens| {
            let slot = parsed.next_slot();
            slot.index = index;
            slot.name = field.name;
            slot.value = record.field_value(index).unwrap_or(Value::Null);
            slot.tags.extend(tokens);
        })?;

        Ok(parsed)
    }

    /// Parses the tags of a descriptor without reading any values.
    pub fn parse_descriptor(&self, descriptor: &RecordDescriptor) -> ModelResult<Vec<ParsedTag>> {
        let mut parsed = Vec::with_capacity(descriptor.fields.len());

        self.walk(descriptor, |index, field, tokens| {
            parsed.push(ParsedTag {
                index,
                name: field.name,
                tags: tokens.collect(),
                settable: field.settable,
            });
        })?;

        Ok(parsed)
    }

    fn walk<F>(&self, descriptor: &RecordDescriptor, mut visit: F) -> ModelResult<()>
    where
        F: FnMut(usize, &FieldDef, std::str::Split<'static, char>),
    {
        if descriptor.kind != RecordKind::Struct {
            return Err(ModelError::Type(format!(
                "{} `{}`",
                descriptor.kind.as_str(),
                descriptor.name
            )));
        }

        for (index, field) in descriptor.fields.iter().enumerate() {
            let value = field
                .lookup(self.tag)
                .ok_or_else(|| ModelError::MissingTag {
                    record: descriptor.name.to_string(),
                    field: field.name.to_string(),
                    tag: self.tag.to_string(),
                })?;

            if value.split(DELIMITER).any(|token| token == SKIP) {
                continue;
            }

            visit(index, field, value.split(DELIMITER));
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        record::{Tag, RecordDescriptor},
        value::{Coercion, FieldKind, FieldValue},
    };

    /// Hand-written record used across the crate's unit tests.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub(crate) struct Account {
        pub id: String,
        pub name: String,
        pub age: i8,
        pub balance: f64,
        pub secret: String,
    }

    static ACCOUNT: RecordDescriptor = RecordDescriptor {
        name: "Account",
        kind: RecordKind::Struct,
        fields: &[
            FieldDef { name: "id", tags: &[Tag { name: "db", value: "mongoid" }], settable: true },
            FieldDef {
                name: "name",
                tags: &[Tag { name: "db", value: "name,required,unique,index" }, Tag { name: "attr", value: "min=2" }],
                settable: true,
            },
            FieldDef { name: "age", tags: &[Tag { name: "db", value: "age" }], settable: true },
            FieldDef { name: "balance", tags: &[Tag { name: "db", value: "" }], settable: true },
            FieldDef { name: "secret", tags: &[Tag { name: "db", value: "-" }], settable: true },
        ],
    };

    impl Record for Account {
        fn descriptor() -> &'static RecordDescriptor {
            &ACCOUNT
        }

        fn field_kind(index: usize) -> Option<FieldKind> {
            match index {
                0 | 1 | 4 => Some(String::KIND),
                2 => Some(i8::KIND),
                3 => Some(f64::KIND),
                _ => None,
            }
        }

        fn field_value(&self, index: usize) -> Option<Value> {
            match index {
                0 => Some(self.id.to_value()),
                1 => Some(self.name.to_value()),
                2 => Some(self.age.to_value()),
                3 => Some(self.balance.to_value()),
                4 => Some(self.secret.to_value()),
                _ => None,
            }
        }

        fn set_field(&mut self, index: usize, value: Value) -> Result<(), Coercion> {
            match index {
                0 => self.id = FieldValue::from_value(value)?,
                1 => self.name = FieldValue::from_value(value)?,
                2 => self.age = FieldValue::from_value(value)?,
                3 => self.balance = FieldValue::from_value(value)?,
                4 => self.secret = FieldValue::from_value(value)?,
                _ => {}
            }
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct Untagged {
        name: String,
    }

    static UNTAGGED: RecordDescriptor = RecordDescriptor {
        name: "Untagged",
        kind: RecordKind::Struct,
        fields: &[FieldDef { name: "name", tags: &[Tag { name: "tag", value: "name" }], settable: true }],
    };

    impl Record for Untagged {
        fn descriptor() -> &'static RecordDescriptor {
            &UNTAGGED
        }

        fn field_value(&self, index: usize) -> Option<Value> {
            (index == 0).then(|| self.name.to_value())
        }

        fn set_field(&mut self, _index: usize, _value: Value) -> Result<(), Coercion> {
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct Pair(i32, i32);

    static PAIR: RecordDescriptor = RecordDescriptor { name: "Pair", kind: RecordKind::Tuple, fields: &[] };

    impl Record for Pair {
        fn descriptor() -> &'static RecordDescriptor {
            &PAIR
        }

        fn field_value(&self, _index: usize) -> Option<Value> {
            None
        }

        fn set_field(&mut self, _index: usize, _value: Value) -> Result<(), Coercion> {
            Ok(())
        }
    }

    pub(crate) fn account() -> Account {
        Account {
            id: "677904ef31ac7ccf730d4e39".to_string(),
            name: "Jon".to_string(),
            age: 12,
            balance: 10.5,
            secret: "hunter2".to_string(),
        }
    }

    #[test]
    fn test_parse_preserves_declaration_order() {
        let fields = TagParser::default().parse(&account()).unwrap();

        let names = fields.iter().map(|f| f.name).collect::<Vec<_>>();
        assert_eq!(names, vec!["id", "name", "age", "balance"]);
        assert_eq!(fields[1].tags, vec!["name", "required", "unique", "index"]);
        assert_eq!(fields[1].value, Value::String("Jon".into()));
        assert_eq!(fields[2].index, 2);
    }

    #[test]
    fn test_parse_skips_sentinel() {
        let fields = TagParser::default().parse(&account()).unwrap();

        assert!(fields.iter().all(|f| f.name != "secret"));
    }

    #[test]
    fn test_parse_accepts_empty_tag_value() {
        let fields = TagParser::default().parse(&account()).unwrap();

        assert_eq!(fields[3].tags, vec![""]);
        assert_eq!(fields[3].key(), "balance");
    }

    #[test]
    fn test_parse_other_tag_name() {
        let err = TagParser::new("attr").parse(&account()).unwrap_err();

        assert_eq!(
            err,
            ModelError::MissingTag { record: "Account".into(), field: "id".into(), tag: "attr".into() }
        );
    }

    #[test]
    fn test_parse_missing_tag() {
        let err = TagParser::default().parse(&Untagged::default()).unwrap_err();

        assert!(matches!(err, ModelError::MissingTag { ref field, .. } if field == "name"));
    }

    #[test]
    fn test_parse_rejects_non_struct() {
        let err = TagParser::default().parse(&Pair(1, 2)).unwrap_err();

        assert!(matches!(err, ModelError::Type(_)));
    }

    #[test]
    fn test_resolve_key() {
        assert_eq!(resolve_key(&["name", "required"], "Name"), "name");
        assert_eq!(resolve_key(&["required", "name"], "Name"), "name");
        assert_eq!(resolve_key(&["name", "mongoid"], "Name"), IDENTITY_KEY);
        assert_eq!(resolve_key(&["index", "unique"], "Name"), "Name");
        assert_eq!(resolve_key(&[""], "Name"), "Name");
        assert_eq!(resolve_key(&["", "name"], "Name"), "name");
        assert_eq!(key_position(&["required", "", "name", "extra"]), Some(2));
        assert_eq!(key_position(&["index", ""]), None);
    }

    #[test]
    fn test_pooled_buffers_are_reset() {
        let first = TagParser::default().parse(&account()).unwrap();
        drop(first);

        let second = TagParser::default().parse(&Account { name: "Ann".into(), ..Default::default() }).unwrap();

        assert_eq!(second.len(), 4);
        assert_eq!(second[1].value, Value::String("Ann".into()));
        assert_eq!(second[1].tags, vec!["name", "required", "unique", "index"]);
    }

    #[test]
    fn test_parse_descriptor() {
        let tags = TagParser::default().parse_descriptor(Account::descriptor()).unwrap();

        assert_eq!(tags.len(), 4);
        assert_eq!(tags[0].tags, vec!["mongoid"]);
        assert!(tags.iter().all(|t| t.settable));
    }
}
