//! Running configured microflows, nanoflows and pages.

use log::debug;
use shared::{ActionSpec, BusinessObject, CellValue, ObjectKey};

use crate::api::DataApi;
use crate::error::WidgetError;

/// Objects an action runs against, plus the widget's context object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionContext {
    pub objects: Vec<ObjectKey>,
    pub context: Option<ObjectKey>,
}

impl ActionContext {
    pub fn for_object(object: &ObjectKey, context: Option<&ObjectKey>) -> Self {
        Self {
            objects: vec![object.clone()],
            context: context.cloned(),
        }
    }

    pub fn for_selection(objects: Vec<ObjectKey>, context: Option<&ObjectKey>) -> Self {
        Self {
            objects,
            context: context.cloned(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.context.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum ActionOutput {
    #[default]
    Nothing,
    Value(CellValue),
    Objects(Vec<BusinessObject>),
}

impl ActionOutput {
    pub fn describe(&self) -> &'static str {
        match self {
            ActionOutput::Nothing => "nothing",
            ActionOutput::Value(_) => "a value",
            ActionOutput::Objects(_) => "objects",
        }
    }
}

/// The single entry point for every configured action.
pub async fn dispatch<A: DataApi>(
    api: &A,
    action: &ActionSpec,
    context: &ActionContext,
) -> Result<ActionOutput, WidgetError> {
    let kind = action.kind_label();
    let target = action.target();
    debug!("dispatch {} '{}' with {:?}", kind, target, context.objects);

    if target.is_empty() {
        return Err(WidgetError::MissingTarget { kind });
    }
    if let ActionSpec::Page { page, .. } = action {
        if context.is_empty() {
            return Err(WidgetError::PageWithoutObject(page.clone()));
        }
    }

    api.run_action(action, context)
        .await
        .map_err(|source| WidgetError::Action {
            kind,
            target: target.to_string(),
            source,
        })
}

/// Runs an action that must hand back a list of objects (data sources, child
/// loaders, column loaders). Returning nothing counts as an empty list.
pub async fn dispatch_for_objects<A: DataApi>(
    api: &A,
    action: &ActionSpec,
    context: &ActionContext,
) -> Result<Vec<BusinessObject>, WidgetError> {
    match dispatch(api, action, context).await? {
        ActionOutput::Objects(objects) => Ok(objects),
        ActionOutput::Nothing => Ok(Vec::new()),
        other => Err(WidgetError::UnexpectedOutput {
            kind: action.kind_label(),
            target: action.target().to_string(),
            found: other.describe(),
            expected: "a list of objects",
        }),
    }
}

/// Runs a formatting nanoflow for one cell.
pub async fn dispatch_for_value<A: DataApi>(
    api: &A,
    action: &ActionSpec,
    context: &ActionContext,
) -> Result<CellValue, WidgetError> {
    match dispatch(api, action, context).await? {
        ActionOutput::Value(value) => Ok(value),
        ActionOutput::Nothing => Ok(CellValue::Text(String::new())),
        other => Err(WidgetError::UnexpectedOutput {
            kind: action.kind_label(),
            target: action.target().to_string(),
            found: other.describe(),
            expected: "a value",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeApi;
    use shared::OpenPageAs;

    #[tokio::test]
    async fn dispatches_each_action_kind_to_the_platform() {
        let api = FakeApi::new();
        let context = ActionContext::for_object(&ObjectKey::from("1"), None);

        for action in [
            ActionSpec::Microflow {
                microflow: "Tree.ACT_Open".to_string(),
            },
            ActionSpec::Nanoflow {
                nanoflow: "Tree.NF_Open".to_string(),
            },
            ActionSpec::Page {
                page: "Tree/Edit.page.xml".to_string(),
                open_as: OpenPageAs::Modal,
            },
        ] {
            dispatch(&api, &action, &context).await.unwrap();
        }

        let calls = api.action_calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2].0.kind_label(), "page");
        assert_eq!(calls[0].1, context);
    }

    #[tokio::test]
    async fn empty_target_is_rejected_before_reaching_the_platform() {
        let api = FakeApi::new();
        let action = ActionSpec::Microflow {
            microflow: String::new(),
        };

        let error = dispatch(&api, &action, &ActionContext::default())
            .await
            .unwrap_err();

        assert_eq!(error, WidgetError::MissingTarget { kind: "microflow" });
        assert!(api.action_calls().is_empty());
    }

    #[tokio::test]
    async fn page_needs_an_object() {
        let api = FakeApi::new();
        let action = ActionSpec::Page {
            page: "Tree/Edit.page.xml".to_string(),
            open_as: OpenPageAs::Content,
        };

        let error = dispatch(&api, &action, &ActionContext::default())
            .await
            .unwrap_err();

        assert!(matches!(error, WidgetError::PageWithoutObject(_)));
    }

    #[tokio::test]
    async fn object_loaders_reject_plain_values() {
        let api = FakeApi::new();
        let action = ActionSpec::Nanoflow {
            nanoflow: "Tree.NF_Title".to_string(),
        };
        api.set_action_output("Tree.NF_Title", ActionOutput::Value(CellValue::from("x")));

        let error = dispatch_for_objects(&api, &action, &ActionContext::default())
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            WidgetError::UnexpectedOutput {
                found: "a value",
                ..
            }
        ));
    }
}
