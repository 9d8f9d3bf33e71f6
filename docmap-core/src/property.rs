//! The Property Model: the backend-neutral intermediate form of a record.

use serde::{Deserialize, Serialize};

use crate::{
    error::{ModelError, ModelResult},
    value::Value,
};

/// One mapped field: its key, value and constraint flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub key: String,
    pub value: Value,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub index: bool,
    #[serde(default)]
    pub identity: bool,
}

impl Property {
    /// Creates a property with no flags set.
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            required: false,
            unique: false,
            index: false,
            identity: false,
        }
    }
}

/// An ordered sequence of properties.
///
/// Order is the declaration order of the record's mapped fields. Lookups are
/// linear; models are as small as the records they come from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyModel(Vec<Property>);

impl PropertyModel {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    /// Appends a property.
    pub fn push(&mut self, property: Property) {
        self.0.push(property);
    }

    /// Returns the property stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Property> {
        self.0.iter().find(|property| property.key == key)
    }

    /// Returns the value stored under `key`.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.get(key).map(|property| &property.value)
    }

    /// Returns the identity property, if any.
    pub fn identity(&self) -> Option<&Property> {
        self.0.iter().find(|property| property.identity)
    }

    pub fn identity_mut(&mut self) -> Option<&mut Property> {
        self.0.iter_mut().find(|property| property.identity)
    }

    /// Removes and returns the property stored under `key`.
    pub fn remove(&mut self, key: &str) -> Option<Property> {
        let position = self.0.iter().position(|property| property.key == key)?;
        Some(self.0.remove(position))
    }

    /// Removes the identity property and returns it.
    pub fn take_identity(&mut self) -> Option<Property> {
        let position = self.0.iter().position(|property| property.identity)?;
        Some(self.0.remove(position))
    }

    /// Checks that every required property holds a value.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::RequiredField`] naming the first required property
    /// whose value is [`Value::Null`].
    pub fn check_required(&self) -> ModelResult<()> {
        match self
            .0
            .iter()
            .find(|property| property.required && property.value.is_null())
        {
            Some(property) => Err(ModelError::RequiredField(property.key.clone())),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Property> {
        self.0.iter()
    }

    /// Returns the property keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|property| property.key.as_str())
    }

    pub fn into_inner(self) -> Vec<Property> {
        self.0
    }
}

impl From<Vec<Property>> for PropertyModel {
    fn from(properties: Vec<Property>) -> Self {
        Self(properties)
    }
}

impl FromIterator<Property> for PropertyModel {
    fn from_iter<I: IntoIterator<Item = Property>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for PropertyModel {
    type Item = Property;
    type IntoIter = std::vec::IntoIter<Property>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a PropertyModel {
    type Item = &'a Property;
    type IntoIter = std::slice::Iter<'a, Property>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
