//! Record descriptors: the static description of a mappable type.
//!
//! A record is a struct with named fields. Each field carries zero or more tags
//! (a tag name such as `db` mapped to a comma-separated tag value), mirroring
//! struct tags. The descriptor is produced once per type, normally by
//! `#[derive(Record)]`, and everything else in the mapping engine reads it
//! instead of inspecting values at runtime.
//!
//! # Example
//!
//! ```ignore
//! use docmap::Record;
//!
//! #[derive(Debug, Clone, Default, PartialEq, Record)]
//! pub struct User {
//!     #[tag(db = "mongoid")]
//!     pub id: String,
//!     #[tag(db = "email,required,index,unique")]
//!     pub email: String,
//!     #[tag(db = "age")]
//!     pub age: i8,
//! }
//! ```

use crate::value::{Coercion, FieldKind, Value};

/// Shape of the type a descriptor was produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// A struct with named fields. The only shape that can be mapped.
    Struct,
    /// A tuple struct.
    Tuple,
    /// A unit struct.
    Unit,
    /// An enum.
    Enum,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Struct => "struct",
            RecordKind::Tuple => "tuple struct",
            RecordKind::Unit => "unit struct",
            RecordKind::Enum => "enum",
        }
    }
}

/// One `name = "value"` tag attached to a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    pub name: &'static str,
    pub value: &'static str,
}

/// Static description of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    /// Declared field identifier.
    pub name: &'static str,
    /// All tags declared on the field.
    pub tags: &'static [Tag],
    /// Whether the decoder may assign this field.
    pub settable: bool,
}

impl FieldDef {
    /// Looks up the value of the tag named `name`.
    ///
    /// Returns `None` when the tag is absent; an empty tag value is `Some("")`.
    pub fn lookup(&self, name: &str) -> Option<&'static str> {
        self.tags
            .iter()
            .find(|tag| tag.name == name)
            .map(|tag| tag.value)
    }
}

/// Static description of a record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordDescriptor {
    /// Type name.
    pub name: &'static str,
    pub kind: RecordKind,
    /// Fields in declaration order. Empty for non-struct kinds.
    pub fields: &'static [FieldDef],
}

/// A type that can be mapped to and from a property model.
///
/// Field indices passed to [`Record::field_value`] and [`Record::set_field`] are
/// positions in [`RecordDescriptor::fields`].
pub trait Record: Default + Send + Sync + 'static {
    /// Returns the static descriptor of this type.
    fn descriptor() -> &'static RecordDescriptor;

    /// Returns the value kind of the field at `index`.
    ///
    /// `None` means the kind is unknown. The derive always knows it.
    fn field_kind(index: usize) -> Option<FieldKind> {
        let _ = index;
        None
    }

    /// Returns the value of the field at `index`, or `None` if there is no such field.
    fn field_value(&self, index: usize) -> Option<Value>;

    /// Assigns the field at `index` from `value`.
    ///
    /// Indices outside the field list are ignored.
    fn set_field(&mut self, index: usize, value: Value) -> Result<(), Coercion>;
}
