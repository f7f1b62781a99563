use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

use crate::row::CellValue;

/// Platform identity of a business object (the object guid).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ObjectKey(String);

impl ObjectKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for ObjectKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl Borrow<str> for ObjectKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Raw attribute value as the platform hands it over.
///
/// Dates arrive already formatted by the platform parser; the widget never
/// formats dates itself.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AttributeValue {
    String(String),
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    Enum { value: String, caption: String },
    Date { display: String },
    Empty,
}

impl AttributeValue {
    /// Display form used in table cells.
    pub fn formatted(&self) -> CellValue {
        match self {
            AttributeValue::String(text) => CellValue::Text(text.clone()),
            AttributeValue::Integer(number) => CellValue::Number(*number as f64),
            AttributeValue::Decimal(number) => CellValue::Number(*number),
            AttributeValue::Boolean(flag) => {
                CellValue::Text(if *flag { "True" } else { "False" }.to_string())
            }
            AttributeValue::Enum { caption, .. } => CellValue::Text(caption.clone()),
            AttributeValue::Date { display } => CellValue::Text(display.clone()),
            AttributeValue::Empty => CellValue::Text(String::new()),
        }
    }

    /// Truthiness of a "has children" style attribute.
    pub fn is_truthy(&self) -> bool {
        match self {
            AttributeValue::String(text) => !text.is_empty(),
            AttributeValue::Integer(number) => *number != 0,
            AttributeValue::Decimal(number) => *number != 0.0,
            AttributeValue::Boolean(flag) => *flag,
            AttributeValue::Enum { value, .. } => !value.is_empty(),
            AttributeValue::Date { display } => !display.is_empty(),
            AttributeValue::Empty => false,
        }
    }

    /// Plain string content, if the value carries one.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::String(text) => Some(text),
            AttributeValue::Enum { value, .. } => Some(value),
            _ => None,
        }
    }
}

/// Snapshot of one platform object: attributes plus reference sets.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BusinessObject {
    pub key: ObjectKey,
    pub entity: String,
    #[serde(default)]
    pub attributes: IndexMap<String, AttributeValue>,
    #[serde(default)]
    pub references: IndexMap<String, Vec<ObjectKey>>,
}

impl BusinessObject {
    pub fn new(key: impl Into<ObjectKey>, entity: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            entity: entity.into(),
            attributes: IndexMap::new(),
            references: IndexMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn with_references<K: Into<ObjectKey>>(
        mut self,
        name: impl Into<String>,
        keys: impl IntoIterator<Item = K>,
    ) -> Self {
        self.references
            .insert(name.into(), keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name) || self.references.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    pub fn formatted(&self, name: &str) -> Option<CellValue> {
        self.get(name).map(AttributeValue::formatted)
    }

    pub fn references(&self, name: &str) -> &[ObjectKey] {
        self.references.get(name).map(Vec::as_slice).unwrap_or_default()
    }
}
