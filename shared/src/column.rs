use serde::{Deserialize, Serialize};

use crate::config::ColumnConfig;
use crate::object::ObjectKey;

/// One active table column.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub id: String,
    pub label: String,
    pub source_attribute: String,
    #[serde(default)]
    pub width: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
    /// Metadata object the column was built from (dynamic columns only).
    #[serde(default)]
    pub metadata_key: Option<ObjectKey>,
}

impl ColumnDef {
    pub fn new(attribute: impl Into<String>, label: impl Into<String>) -> Self {
        let source_attribute = attribute.into();
        Self {
            id: column_id(&source_attribute),
            label: label.into(),
            source_attribute,
            width: None,
            class_name: None,
            metadata_key: None,
        }
    }

    pub fn with_width(mut self, width: impl Into<String>) -> Self {
        self.width = non_empty(width.into());
        self
    }

    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = non_empty(class_name.into());
        self
    }

    pub fn with_metadata_key(mut self, key: impl Into<ObjectKey>) -> Self {
        self.metadata_key = Some(key.into());
        self
    }
}

/// Column width as the table expects it: plain integers (negative ones
/// included) are pixels, anything else (`"30%"`, `"12em"`) is passed
/// through as CSS.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum ColumnWidth {
    Pixels(i64),
    Css(String),
}

impl ColumnWidth {
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<i64>() {
            Ok(pixels) if pixels.to_string() == raw => ColumnWidth::Pixels(pixels),
            _ => ColumnWidth::Css(raw.to_string()),
        }
    }
}

/// Render descriptor handed to the table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TableColumn {
    pub key: String,
    pub data_index: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<ColumnWidth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
}

pub fn table_columns(columns: &[ColumnDef]) -> Vec<TableColumn> {
    columns
        .iter()
        .map(|column| TableColumn {
            key: column.id.clone(),
            data_index: column.id.clone(),
            title: column.label.clone(),
            width: column
                .width
                .as_deref()
                .filter(|width| !width.is_empty())
                .map(ColumnWidth::parse),
            class_name: column.class_name.clone().filter(|class| !class.is_empty()),
        })
        .collect()
}

/// Columns for the static column method; the dynamic method starts empty and
/// is filled from metadata objects at load time.
pub fn static_columns(configs: &[ColumnConfig], is_static: bool) -> Vec<ColumnDef> {
    if !is_static {
        return Vec::new();
    }
    configs
        .iter()
        .map(|config| {
            let mut column = ColumnDef::new(config.attribute.clone(), config.header.clone());
            if let Some(width) = &config.width {
                column = column.with_width(width.clone());
            }
            if let Some(class_name) = &config.class_name {
                column = column.with_class_name(class_name.clone());
            }
            column
        })
        .collect()
}

/// Row field ids clash with the table's own `id` and `key` properties, so
/// those two are renamed.
pub fn column_id(attribute: &str) -> String {
    let id = camel_case(attribute);
    match id.as_str() {
        "id" => "idId".to_string(),
        "key" => "keyId".to_string(),
        _ => id,
    }
}

/// Lower-cases the input and turns every `-x` into `X`.
fn camel_case(input: &str) -> String {
    let lower = input.to_lowercase();
    let mut output = String::with_capacity(lower.len());
    let mut chars = lower.chars().peekable();

    while let Some(current) = chars.next() {
        if current != '-' {
            output.push(current);
            continue;
        }
        let mut dashes = 1;
        while chars.peek() == Some(&'-') {
            chars.next();
            dashes += 1;
        }
        match chars.peek().copied() {
            Some(next) if next.is_alphanumeric() || next == '_' => {
                chars.next();
                output.extend(next.to_uppercase());
            }
            _ => output.extend(std::iter::repeat_n('-', dashes)),
        }
    }
    output
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferencePart {
    ReferenceAttribute,
    Entity,
}

/// Splits a `Module.Reference/Module.Entity` path.
pub fn reference_part(reference: &str, part: ReferencePart) -> &str {
    let index = match part {
        ReferencePart::ReferenceAttribute => 0,
        ReferencePart::Entity => 1,
    };
    if reference.is_empty() {
        return "";
    }
    reference.split('/').nth(index).unwrap_or("")
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}
