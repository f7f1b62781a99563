//! Widget configuration, read from TOML.
//!
//! Every choice the widget offers between mutually exclusive behaviors (data
//! source, child source, column method, action kind) is a tagged enum, so a
//! configuration can never name a microflow and a nanoflow for the same slot.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::column::{ColumnDef, ReferencePart, reference_part, static_columns};

pub const DEFAULT_ICON_PREFIX: &str = "glyphicon glyphicon-";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse widget configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize widget configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct WidgetConfig {
    pub node_entity: String,
    pub data: DataSourceConfig,
    pub children: ChildSourceConfig,
    pub columns: ColumnsConfig,
    pub events: EventsConfig,
    pub selection: SelectionConfig,
    pub ui: UiConfig,
    pub helper: HelperConfig,
}

impl WidgetConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn has_static_columns(&self) -> bool {
        matches!(self.columns, ColumnsConfig::Static { .. })
    }

    /// Dynamic columns can only be loaded when the metadata mapping is complete.
    pub fn dynamic_columns_valid(&self) -> bool {
        match &self.columns {
            ColumnsConfig::Static { .. } => true,
            ColumnsConfig::Microflow {
                microflow,
                entity,
                label_attr,
                attribute_attr,
                ..
            } => {
                !microflow.is_empty()
                    && !entity.is_empty()
                    && !label_attr.is_empty()
                    && !attribute_attr.is_empty()
            }
        }
    }

    pub fn static_columns(&self) -> Vec<ColumnDef> {
        match &self.columns {
            ColumnsConfig::Static { list } => static_columns(list, true),
            ColumnsConfig::Microflow { .. } => Vec::new(),
        }
    }

    /// Source attribute -> nanoflow that formats it.
    pub fn transform_nanoflows(&self) -> HashMap<String, String> {
        match &self.columns {
            ColumnsConfig::Static { list } => list
                .iter()
                .filter_map(|column| {
                    column
                        .transform_nanoflow
                        .as_ref()
                        .filter(|nanoflow| !nanoflow.is_empty())
                        .map(|nanoflow| (column.attribute.clone(), nanoflow.clone()))
                })
                .collect(),
            ColumnsConfig::Microflow { .. } => HashMap::new(),
        }
    }

    pub fn select_first_on_single(&self) -> bool {
        self.selection.select_first_on_single && self.selection.mode == SelectionMode::Single
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum DataSourceConfig {
    #[serde(rename = "xpath")]
    XPath {
        #[serde(default)]
        constraint: String,
    },
    Microflow {
        microflow: String,
    },
    Nanoflow {
        nanoflow: String,
    },
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        DataSourceConfig::XPath {
            constraint: String::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum ChildSourceConfig {
    #[default]
    Disabled,
    /// Children are the objects of a reference set, `Module.Ref/Module.Entity`.
    Reference {
        reference: String,
    },
    /// Children come from a microflow; `has_children_attr` marks rows that have any.
    Microflow {
        microflow: String,
        #[serde(default)]
        has_children_attr: String,
    },
    Nanoflow {
        nanoflow: String,
        #[serde(default)]
        has_children_attr: String,
    },
}

impl ChildSourceConfig {
    pub fn reference_attribute(&self) -> Option<&str> {
        match self {
            ChildSourceConfig::Reference { reference } if !reference.is_empty() => {
                Some(reference_part(reference, ReferencePart::ReferenceAttribute))
            }
            _ => None,
        }
    }

    pub fn has_children_attribute(&self) -> Option<&str> {
        match self {
            ChildSourceConfig::Microflow {
                has_children_attr, ..
            }
            | ChildSourceConfig::Nanoflow {
                has_children_attr, ..
            } if !has_children_attr.is_empty() => Some(has_children_attr.as_str()),
            _ => None,
        }
    }

    /// Action that returns the children of one node.
    pub fn child_action(&self) -> Option<ActionSpec> {
        match self {
            ChildSourceConfig::Microflow { microflow, .. } if !microflow.is_empty() => {
                Some(ActionSpec::Microflow {
                    microflow: microflow.clone(),
                })
            }
            ChildSourceConfig::Nanoflow { nanoflow, .. } if !nanoflow.is_empty() => {
                Some(ActionSpec::Nanoflow {
                    nanoflow: nanoflow.clone(),
                })
            }
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum ColumnsConfig {
    Static {
        #[serde(default)]
        list: Vec<ColumnConfig>,
    },
    /// Columns built from metadata objects returned by a microflow.
    Microflow {
        microflow: String,
        entity: String,
        label_attr: String,
        attribute_attr: String,
        #[serde(default)]
        class_attr: Option<String>,
    },
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        ColumnsConfig::Static { list: Vec::new() }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ColumnConfig {
    pub header: String,
    pub attribute: String,
    #[serde(default)]
    pub transform_nanoflow: Option<String>,
    #[serde(default)]
    pub width: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
}

/// The closed set of things a configured action can do.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ActionSpec {
    Microflow {
        microflow: String,
    },
    Nanoflow {
        nanoflow: String,
    },
    Page {
        page: String,
        #[serde(default)]
        open_as: OpenPageAs,
    },
}

impl ActionSpec {
    pub fn target(&self) -> &str {
        match self {
            ActionSpec::Microflow { microflow } => microflow,
            ActionSpec::Nanoflow { nanoflow } => nanoflow,
            ActionSpec::Page { page, .. } => page,
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self {
            ActionSpec::Microflow { .. } => "microflow",
            ActionSpec::Nanoflow { .. } => "nanoflow",
            ActionSpec::Page { .. } => "page",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OpenPageAs {
    #[default]
    Content,
    Popup,
    Modal,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct EventsConfig {
    pub click: Option<ActionSpec>,
    pub double_click: Option<ActionSpec>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    #[default]
    None,
    Single,
    Multi,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SelectionConfig {
    pub mode: SelectionMode,
    pub click_to_select: bool,
    pub hide_checkboxes: bool,
    pub select_first_on_single: bool,
    pub on_change: Option<ActionSpec>,
    pub buttons: Vec<ButtonConfig>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ButtonConfig {
    pub label: String,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub hide_when_not_applicable: bool,
    #[serde(default)]
    pub action: Option<ActionSpec>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct UiConfig {
    pub show_header: bool,
    pub row_class_attr: Option<String>,
    pub row_icon_attr: Option<String>,
    pub icon_prefix: Option<String>,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            show_header: true,
            row_class_attr: None,
            row_icon_attr: None,
            icon_prefix: None,
        }
    }
}

impl UiConfig {
    pub fn icon_prefix(&self) -> &str {
        self.icon_prefix
            .as_deref()
            .filter(|prefix| !prefix.is_empty())
            .unwrap_or(DEFAULT_ICON_PREFIX)
    }
}

/// Non-persistent helper entity linking a selection to the context object.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct HelperConfig {
    pub entity: String,
    pub context_reference: String,
    pub node_reference: String,
}
