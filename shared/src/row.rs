use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::object::ObjectKey;

/// Displayable cell content.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum CellValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Bool(flag) => write!(f, "{}", flag),
            CellValue::Number(number) => write!(f, "{}", number),
            CellValue::Text(text) => f.write_str(text),
        }
    }
}

impl From<&str> for CellValue {
    fn from(text: &str) -> Self {
        CellValue::Text(text.to_string())
    }
}

/// Flat view record of one row, as handed to the tree builder and the table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RowRecord {
    pub key: ObjectKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_key: Option<ObjectKey>,
    /// Column id -> formatted value, in column order.
    #[serde(default)]
    pub fields: IndexMap<String, CellValue>,
    /// Keys of referenced children, loaded or not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_ref_keys: Option<Vec<ObjectKey>>,
    #[serde(default)]
    pub has_lazy_children: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
}

impl RowRecord {
    pub fn new(key: impl Into<ObjectKey>) -> Self {
        Self {
            key: key.into(),
            parent_key: None,
            fields: IndexMap::new(),
            child_ref_keys: None,
            has_lazy_children: false,
            icon: None,
            class_name: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<ObjectKey>) -> Self {
        self.parent_key = Some(parent.into());
        self
    }

    pub fn with_field(mut self, column_id: impl Into<String>, value: CellValue) -> Self {
        self.fields.insert(column_id.into(), value);
        self
    }

    pub fn with_child_refs<K: Into<ObjectKey>>(mut self, keys: impl IntoIterator<Item = K>) -> Self {
        self.child_ref_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_lazy_children(mut self) -> Self {
        self.has_lazy_children = true;
        self
    }

    /// Referenced child keys, empty when children do not come from a reference set.
    pub fn child_refs(&self) -> &[ObjectKey] {
        self.child_ref_keys.as_deref().unwrap_or_default()
    }

    /// A leaf by construction: no referenced children and nothing to load lazily.
    pub fn is_leaf(&self) -> bool {
        self.child_refs().is_empty() && !self.has_lazy_children
    }
}
