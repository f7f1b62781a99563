//! Configuration checks shown to the page designer as alerts.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::{
    ActionSpec, ChildSourceConfig, ColumnsConfig, DataSourceConfig, SelectionMode, WidgetConfig,
};

static NEXT_MESSAGE_ID: AtomicUsize = AtomicUsize::new(1);

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ValidationMessage {
    pub id: String,
    pub message: String,
    /// Fatal messages suppress the table; the others can be dismissed.
    pub fatal: bool,
}

impl ValidationMessage {
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::with_severity(message.into(), true)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::with_severity(message.into(), false)
    }

    pub fn dismissable(&self) -> bool {
        !self.fatal
    }

    fn with_severity(message: String, fatal: bool) -> Self {
        let id = NEXT_MESSAGE_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            id: format!("validation_{}", id),
            message,
            fatal,
        }
    }
}

/// Checks that need the platform's entity metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetadataChecks {
    pub helper_entity_persistable: bool,
}

pub fn validate_config(config: &WidgetConfig, metadata: MetadataChecks) -> Vec<ValidationMessage> {
    let mut messages = Vec::new();
    let mut check = |condition: bool, category: &str, message: &str| {
        if condition {
            messages.push(ValidationMessage::fatal(format!("{} :: {}", category, message)));
        }
    };

    match &config.children {
        ChildSourceConfig::Microflow {
            microflow,
            has_children_attr,
        } => {
            check(
                has_children_attr.is_empty(),
                "Children",
                "When using a microflow/nanoflow as Child data source, please set get child attribute",
            );
            check(
                microflow.is_empty(),
                "Children",
                "When using a microflow as Child data source, child microflow is required",
            );
        }
        ChildSourceConfig::Nanoflow {
            nanoflow,
            has_children_attr,
        } => {
            check(
                has_children_attr.is_empty(),
                "Children",
                "When using a microflow/nanoflow as Child data source, please set get child attribute",
            );
            check(
                nanoflow.is_empty(),
                "Children",
                "When using a nanoflow as Child data source, child nanoflow is required",
            );
        }
        ChildSourceConfig::Reference { reference } => check(
            reference.is_empty(),
            "Children",
            "When using a reference as Child data source, child reference attribute is required",
        ),
        ChildSourceConfig::Disabled => {}
    }

    match &config.data {
        DataSourceConfig::XPath { .. } => check(
            config.node_entity.is_empty(),
            "Data",
            "For the data source 'XPath', the node entity is required",
        ),
        DataSourceConfig::Microflow { microflow } => check(
            microflow.is_empty(),
            "Data",
            "For data source option 'microflow', a data source microflow is required",
        ),
        DataSourceConfig::Nanoflow { nanoflow } => check(
            nanoflow.is_empty(),
            "Data",
            "For data source option 'nanoflow', a data source nanoflow is required",
        ),
    }

    for (action, event) in [
        (&config.events.click, "On click"),
        (&config.events.double_click, "On double click"),
    ] {
        if let Some(action) = action {
            check(
                action.target().is_empty(),
                "Events",
                &format!("{} {} missing", event, action.kind_label()),
            );
        }
    }

    if let ColumnsConfig::Microflow {
        microflow,
        entity,
        label_attr,
        attribute_attr,
        ..
    } = &config.columns
    {
        check(
            entity.is_empty(),
            "Dynamic columns",
            "When using dynamic columns, please define the column entity",
        );
        check(label_attr.is_empty(), "Dynamic columns", "Column label attribute is not defined!");
        check(
            attribute_attr.is_empty(),
            "Dynamic columns",
            "Column Attribute attribute is not defined!",
        );
        check(microflow.is_empty(), "Dynamic columns", "Column microflow is not defined!");
    }

    let runs_node_action = |action: &Option<ActionSpec>| {
        matches!(action, Some(ActionSpec::Microflow { .. } | ActionSpec::Nanoflow { .. }))
    };
    let needs_helper = runs_node_action(&config.events.click)
        || runs_node_action(&config.events.double_click)
        || (config.selection.mode != SelectionMode::None && !config.selection.buttons.is_empty())
        || config.selection.on_change.is_some();
    if needs_helper {
        check(
            config.helper.entity.is_empty(),
            "Helper",
            "For click/double click/selections a helper object needs to be configured",
        );
    }
    if !config.helper.entity.is_empty() {
        check(
            config.helper.context_reference.is_empty(),
            "Helper",
            "Helper object needs a reference to your context object",
        );
        check(
            config.helper.node_reference.is_empty(),
            "Helper",
            "Helper object needs a reference set to your node objects",
        );
    }

    for button in &config.selection.buttons {
        let problem = match &button.action {
            None => Some("an action"),
            Some(ActionSpec::Microflow { microflow }) if microflow.is_empty() => Some("a microflow"),
            Some(ActionSpec::Nanoflow { nanoflow }) if nanoflow.is_empty() => Some("a nanoflow"),
            Some(ActionSpec::Page { .. }) => Some("a microflow or nanoflow instead of a page"),
            Some(_) => None,
        };
        if let Some(problem) = problem {
            messages.push(ValidationMessage::fatal(format!(
                "Selection -> Buttonbar -> Button with label '{}' should have {} configured",
                button.label, problem
            )));
        }
    }

    if metadata.helper_entity_persistable {
        messages.push(ValidationMessage::fatal("Helper object cannot be a persistent entity!"));
    }

    messages
}
