//! User gestures on the table: clicks, selection, expansion and the button bar.

use log::debug;
use shared::{
    ActionSpec, ButtonConfig, ObjectKey, RowRecord, SelectionMode, TreeNode, ValidationMessage,
};
use std::collections::HashSet;

use crate::actions::{ActionContext, dispatch};
use crate::api::DataApi;
use crate::store::MergeLevel;
use crate::widget::TreeTable;

/// Render state of one button bar entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonState {
    /// Position in the configured button list.
    pub index: usize,
    pub caption: String,
    pub class_name: Option<String>,
    pub disabled: bool,
    pub hidden: bool,
}

/// A row as drawn: visible because every ancestor is expanded. Selection is
/// not part of it, so selecting never reshapes the table.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleRow {
    pub record: RowRecord,
    pub depth: usize,
    pub expandable: bool,
    pub expanded: bool,
}

impl VisibleRow {
    pub fn class_name(&self) -> String {
        match &self.record.class_name {
            Some(class_name) => format!("treetable-treelevel-{} {}", self.depth, class_name),
            None => format!("treetable-treelevel-{}", self.depth),
        }
    }
}

impl<A: DataApi + 'static> TreeTable<A> {
    /// The configured mode, unless nothing would ever use a selection.
    pub fn selection_mode(&self) -> SelectionMode {
        let selection = &self.config.selection;
        let unused = self.buttons().next().is_none()
            && !(selection.click_to_select && selection.mode == SelectionMode::Single)
            && selection.on_change.is_none();
        if selection.mode != SelectionMode::None && unused {
            SelectionMode::None
        } else {
            selection.mode
        }
    }

    pub async fn on_row_click(&self, key: &ObjectKey) {
        if let Some(action) = &self.config.events.click {
            self.run_row_action(action, key).await;
        }

        let mode = self.selection_mode();
        if mode == SelectionMode::None || !self.config.selection.click_to_select {
            return;
        }
        let mut selected = self.store.borrow().selected_keys();
        let position = selected.iter().position(|selected| selected == key);
        let next = match (mode, position) {
            (SelectionMode::Single, Some(_)) => Vec::new(),
            (SelectionMode::Single, None) => vec![key.clone()],
            (SelectionMode::Multi, Some(index)) => {
                selected.remove(index);
                selected
            }
            (SelectionMode::Multi, None) => {
                selected.push(key.clone());
                selected
            }
            (SelectionMode::None, _) => return,
        };
        self.set_selection(next).await;
    }

    pub async fn on_row_double_click(&self, key: &ObjectKey) {
        if let Some(action) = &self.config.events.double_click {
            self.run_row_action(action, key).await;
        }
    }

    /// A row checkbox was toggled.
    pub async fn on_checkbox(&self, key: &ObjectKey, checked: bool) {
        let mut selected = self.store.borrow().selected_keys();
        let next = match (self.selection_mode(), checked) {
            (SelectionMode::None, _) => return,
            (SelectionMode::Single, true) => vec![key.clone()],
            (_, false) => {
                selected.retain(|selected| selected != key);
                selected
            }
            (SelectionMode::Multi, true) => {
                if !selected.contains(key) {
                    selected.push(key.clone());
                }
                selected
            }
        };
        self.set_selection(next).await;
    }

    /// The header checkbox. In single mode it can only clear.
    pub async fn on_select_all(&self, checked: bool) {
        let next = {
            let store = self.store.borrow();
            match self.selection_mode() {
                SelectionMode::None => return,
                SelectionMode::Single => {
                    if store.selected_keys().is_empty() {
                        return;
                    }
                    Vec::new()
                }
                SelectionMode::Multi if checked => store.table_keys().rows,
                SelectionMode::Multi => Vec::new(),
            }
        };
        self.set_selection(next).await;
    }

    pub async fn set_selection(&self, keys: Vec<ObjectKey>) {
        self.store.borrow_mut().set_selected(&keys);
        self.selection_changed().await;
    }

    /// Runs the on-change action with the current selection.
    pub(crate) async fn selection_changed(&self) {
        let Some(action) = &self.config.selection.on_change else {
            return;
        };
        let selected = self.store.borrow().selected_keys();
        let context = self.context();
        debug!("selection changed: {:?}", selected);
        if let Err(error) = dispatch(
            &*self.api,
            action,
            &ActionContext::for_selection(selected, context.as_ref()),
        )
        .await
        {
            self.report(error.to_string());
        }
    }

    /// Expander toggled. Expanding a row whose children were never loaded
    /// starts loading them.
    pub async fn on_expand(&self, key: &ObjectKey, expanded: bool) {
        let needs_children = {
            let mut store = self.store.borrow_mut();
            let mut keys = store.expanded_keys();
            if expanded {
                if !keys.contains(key) {
                    keys.push(key.clone());
                }
            } else {
                keys.retain(|expanded| expanded != key);
            }
            store.set_expanded(&keys);

            expanded
                && !store.has_children(key)
                && store
                    .find_row(key)
                    .is_some_and(|row| !row.record().is_leaf())
        };
        if needs_children {
            self.expand(key, MergeLevel::Depth(0)).await;
        }
    }

    /// Buttons with a label and a runnable action, with their positions.
    fn buttons(&self) -> impl Iterator<Item = (usize, &ButtonConfig)> {
        self.config
            .selection
            .buttons
            .iter()
            .enumerate()
            .filter(|(_, button)| is_runnable(button))
    }

    pub fn button_bar(&self) -> Vec<ButtonState> {
        let disabled = self.store.borrow().selected_keys().is_empty();
        self.buttons()
            .map(|(index, button)| ButtonState {
                index,
                caption: button.label.clone(),
                class_name: button.class_name.clone().filter(|class| !class.is_empty()),
                disabled,
                hidden: button.hide_when_not_applicable && disabled,
            })
            .collect()
    }

    /// Runs a button's action with the selected rows.
    pub async fn press_button(&self, index: usize) {
        let Some(action) = self
            .buttons()
            .find(|(position, _)| *position == index)
            .and_then(|(_, button)| button.action.clone())
        else {
            return;
        };
        let selected = self.store.borrow().selected_keys();
        if selected.is_empty() {
            return;
        }
        let context = self.context();
        if let Err(error) = dispatch(
            &*self.api,
            &action,
            &ActionContext::for_selection(selected, context.as_ref()),
        )
        .await
        {
            self.report(error.to_string());
        }
    }

    /// After a new load from the context: collapse everything and, when
    /// configured, select the first root.
    pub(crate) fn sync_after_load(&self) {
        let mode = self.selection_mode();
        let mut store = self.store.borrow_mut();
        let last_load = store.last_load();
        if last_load == self.seen_last_load.get() {
            return;
        }
        self.seen_last_load.set(last_load);
        store.set_expanded(&[]);

        if store.select_first_on_single() && mode == SelectionMode::Single {
            let first = store.displayed_tree().first().map(|node| node.key().clone());
            if let Some(first) = first {
                store.set_selected(&[first]);
            }
        }
    }

    pub fn visible_rows(&self) -> Vec<VisibleRow> {
        let store = self.store.borrow();
        let expanded: HashSet<ObjectKey> = store.expanded_keys().into_iter().collect();
        let mut rows = Vec::new();
        collect_visible(&store.displayed_tree(), 0, &expanded, &mut rows);
        rows
    }

    /// Only alerts are shown while the columns are unusable or a fatal
    /// configuration message is pending.
    pub fn should_render_table(&self) -> bool {
        let store = self.store.borrow();
        store.valid_columns() && !store.messages().iter().any(|message| message.fatal)
    }

    pub fn fatal_messages(&self) -> Vec<ValidationMessage> {
        self.store
            .borrow()
            .messages()
            .iter()
            .filter(|message| message.fatal)
            .cloned()
            .collect()
    }

    pub fn remove_message(&self, id: &str) {
        self.store.borrow_mut().remove_validation_message(id);
    }

    async fn run_row_action(&self, action: &ActionSpec, key: &ObjectKey) {
        let context = self.context();
        if let Err(error) = dispatch(
            &*self.api,
            action,
            &ActionContext::for_object(key, context.as_ref()),
        )
        .await
        {
            self.report(error.to_string());
        }
    }
}

fn collect_visible(
    nodes: &[TreeNode],
    depth: usize,
    expanded: &HashSet<ObjectKey>,
    rows: &mut Vec<VisibleRow>,
) {
    for node in nodes {
        let is_expanded = expanded.contains(node.key());
        rows.push(VisibleRow {
            record: node.record.clone(),
            depth,
            expandable: node.is_expandable(),
            expanded: is_expanded,
        });
        if is_expanded {
            collect_visible(&node.children, depth + 1, expanded, rows);
        }
    }
}

fn is_runnable(button: &ButtonConfig) -> bool {
    !button.label.is_empty()
        && match &button.action {
            Some(ActionSpec::Microflow { microflow }) => !microflow.is_empty(),
            Some(ActionSpec::Nanoflow { nanoflow }) => !nanoflow.is_empty(),
            _ => false,
        }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeApi;
    use shared::{
        AttributeValue, BusinessObject, ChildSourceConfig, SelectionConfig, WidgetConfig,
    };
    use std::rc::Rc;

    fn key(value: &str) -> ObjectKey {
        ObjectKey::from(value)
    }

    fn archive_button() -> ButtonConfig {
        ButtonConfig {
            label: "Archive".to_string(),
            class_name: Some("btn-danger".to_string()),
            hide_when_not_applicable: true,
            action: Some(ActionSpec::Microflow {
                microflow: "Tree.ACT_Archive".to_string(),
            }),
        }
    }

    fn config(selection: SelectionConfig) -> WidgetConfig {
        WidgetConfig {
            node_entity: "Tree.Node".to_string(),
            children: ChildSourceConfig::Reference {
                reference: "Tree.Node_Children/Tree.Node".to_string(),
            },
            selection,
            ..WidgetConfig::default()
        }
    }

    async fn loaded_widget(config: WidgetConfig) -> (TreeTable<FakeApi>, Rc<FakeApi>) {
        let api = Rc::new(FakeApi::new());
        api.insert(
            BusinessObject::new("A", "Tree.Node")
                .with_references("Tree.Node_Children", ["A1"]),
        );
        api.insert(BusinessObject::new("A1", "Tree.Node"));
        api.insert(BusinessObject::new("B", "Tree.Node"));
        api.set_xpath_roots(&["A", "B"]);
        let widget = TreeTable::new(config, api.clone());
        widget.set_context(Some(key("ctx"))).await;
        (widget, api)
    }

    #[test]
    fn unused_selection_is_downgraded() {
        let api = Rc::new(FakeApi::new());
        let downgraded = TreeTable::new(
            config(SelectionConfig {
                mode: SelectionMode::Multi,
                ..SelectionConfig::default()
            }),
            api.clone(),
        );
        assert_eq!(downgraded.selection_mode(), SelectionMode::None);

        let click_single = TreeTable::new(
            config(SelectionConfig {
                mode: SelectionMode::Single,
                click_to_select: true,
                ..SelectionConfig::default()
            }),
            api.clone(),
        );
        assert_eq!(click_single.selection_mode(), SelectionMode::Single);

        let with_buttons = TreeTable::new(
            config(SelectionConfig {
                mode: SelectionMode::Multi,
                buttons: vec![archive_button()],
                ..SelectionConfig::default()
            }),
            api,
        );
        assert_eq!(with_buttons.selection_mode(), SelectionMode::Multi);
    }

    #[tokio::test]
    async fn single_click_toggles_between_empty_and_one() {
        let (widget, _api) = loaded_widget(config(SelectionConfig {
            mode: SelectionMode::Single,
            click_to_select: true,
            ..SelectionConfig::default()
        }))
        .await;
        let store = widget.store();

        widget.on_row_click(&key("A")).await;
        assert_eq!(store.borrow().selected_keys(), vec![key("A")]);

        widget.on_row_click(&key("B")).await;
        assert_eq!(store.borrow().selected_keys(), vec![key("B")]);

        widget.on_row_click(&key("B")).await;
        assert!(store.borrow().selected_keys().is_empty());
    }

    #[tokio::test]
    async fn multi_click_adds_and_removes() {
        let (widget, _api) = loaded_widget(config(SelectionConfig {
            mode: SelectionMode::Multi,
            click_to_select: true,
            buttons: vec![archive_button()],
            ..SelectionConfig::default()
        }))
        .await;
        let store = widget.store();

        widget.on_row_click(&key("A")).await;
        widget.on_row_click(&key("B")).await;
        assert_eq!(store.borrow().selected_keys(), vec![key("A"), key("B")]);

        widget.on_row_click(&key("A")).await;
        assert_eq!(store.borrow().selected_keys(), vec![key("B")]);
    }

    #[tokio::test]
    async fn clicks_run_configured_actions() {
        let mut config = config(SelectionConfig::default());
        config.events.click = Some(ActionSpec::Nanoflow {
            nanoflow: "Tree.NF_Click".to_string(),
        });
        config.events.double_click = Some(ActionSpec::Microflow {
            microflow: "Tree.ACT_Open".to_string(),
        });
        let (widget, api) = loaded_widget(config).await;

        widget.on_row_click(&key("A")).await;
        widget.on_row_double_click(&key("B")).await;

        let calls = api.action_calls();
        assert_eq!(api.action_targets(), vec!["Tree.NF_Click", "Tree.ACT_Open"]);
        assert_eq!(calls[1].1, ActionContext::for_object(&key("B"), Some(&key("ctx"))));
        assert!(widget.store().borrow().selected_keys().is_empty());
    }

    #[tokio::test]
    async fn selection_changes_run_on_change() {
        let (widget, api) = loaded_widget(config(SelectionConfig {
            mode: SelectionMode::Multi,
            on_change: Some(ActionSpec::Nanoflow {
                nanoflow: "Tree.NF_SelectionChanged".to_string(),
            }),
            ..SelectionConfig::default()
        }))
        .await;

        widget.on_checkbox(&key("A"), true).await;
        widget.on_checkbox(&key("B"), true).await;
        widget.on_checkbox(&key("A"), false).await;

        let calls = api.action_calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2].1.objects, vec![key("B")]);

        widget.on_select_all(true).await;
        assert_eq!(
            widget.store().borrow().selected_keys(),
            vec![key("A"), key("B")]
        );
    }

    #[tokio::test]
    async fn single_select_all_only_clears() {
        let (widget, _api) = loaded_widget(config(SelectionConfig {
            mode: SelectionMode::Single,
            click_to_select: true,
            ..SelectionConfig::default()
        }))
        .await;

        widget.on_checkbox(&key("A"), true).await;
        widget.on_checkbox(&key("B"), true).await;
        assert_eq!(widget.store().borrow().selected_keys(), vec![key("B")]);

        widget.on_select_all(true).await;
        assert!(widget.store().borrow().selected_keys().is_empty());
    }

    #[tokio::test]
    async fn expanding_an_unloaded_row_loads_children() {
        let (widget, _api) = loaded_widget(config(SelectionConfig::default())).await;

        widget.on_expand(&key("A"), true).await;

        let store = widget.store();
        let tree = store.borrow().displayed_tree();
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(store.borrow().expanded_keys(), vec![key("A")]);

        widget.on_expand(&key("A"), false).await;
        assert!(store.borrow().expanded_keys().is_empty());
        assert_eq!(store.borrow().len(), 3);
    }

    #[tokio::test]
    async fn only_rows_under_expanded_parents_are_visible() {
        let (widget, _api) = loaded_widget(config(SelectionConfig::default())).await;
        let keys = |rows: Vec<VisibleRow>| {
            rows.into_iter()
                .map(|row| (row.record.key.to_string(), row.depth))
                .collect::<Vec<_>>()
        };

        let collapsed = widget.visible_rows();
        assert!(collapsed[0].expandable && !collapsed[0].expanded);
        assert_eq!(
            keys(collapsed),
            vec![("A".to_string(), 0), ("B".to_string(), 0)]
        );

        widget.on_expand(&key("A"), true).await;
        let rows = widget.visible_rows();
        assert_eq!(rows[1].class_name(), "treetable-treelevel-1");
        assert_eq!(
            keys(rows),
            vec![
                ("A".to_string(), 0),
                ("A1".to_string(), 1),
                ("B".to_string(), 0)
            ]
        );
    }

    #[tokio::test]
    async fn button_bar_follows_selection() {
        let (widget, api) = loaded_widget(config(SelectionConfig {
            mode: SelectionMode::Multi,
            buttons: vec![
                ButtonConfig {
                    label: "No action".to_string(),
                    ..ButtonConfig::default()
                },
                archive_button(),
            ],
            ..SelectionConfig::default()
        }))
        .await;

        let idle = widget.button_bar();
        assert_eq!(idle.len(), 1);
        assert_eq!(idle[0].index, 1);
        assert!(idle[0].disabled && idle[0].hidden);

        widget.press_button(1).await;
        assert!(api.action_calls().is_empty());

        widget.set_selection(vec![key("A"), key("B")]).await;
        let active = widget.button_bar();
        assert!(!active[0].disabled && !active[0].hidden);
        assert_eq!(active[0].class_name.as_deref(), Some("btn-danger"));

        widget.press_button(1).await;
        let calls = api.action_calls();
        assert_eq!(calls[0].0.target(), "Tree.ACT_Archive");
        assert_eq!(calls[0].1.objects, vec![key("A"), key("B")]);
    }

    #[tokio::test]
    async fn new_load_collapses_and_selects_first() {
        let (widget, api) = loaded_widget(config(SelectionConfig {
            mode: SelectionMode::Single,
            click_to_select: true,
            select_first_on_single: true,
            ..SelectionConfig::default()
        }))
        .await;
        let store = widget.store();
        assert_eq!(store.borrow().selected_keys(), vec![key("A")]);

        widget.on_expand(&key("A"), true).await;
        assert_eq!(store.borrow().expanded_keys(), vec![key("A")]);

        api.insert(
            BusinessObject::new("B", "Tree.Node")
                .with_attribute("Title", AttributeValue::String("B".to_string())),
        );
        api.set_xpath_roots(&["B", "A"]);
        widget.reload().await;

        assert!(store.borrow().expanded_keys().is_empty());
        assert_eq!(store.borrow().selected_keys(), vec![key("B")]);
    }

    #[tokio::test]
    async fn removing_a_selected_row_through_live_update_runs_on_change() {
        let (widget, api) = loaded_widget(config(SelectionConfig {
            mode: SelectionMode::Single,
            click_to_select: true,
            on_change: Some(ActionSpec::Nanoflow {
                nanoflow: "Tree.NF_SelectionChanged".to_string(),
            }),
            ..SelectionConfig::default()
        }))
        .await;
        widget.on_row_click(&key("B")).await;

        api.remove("B");
        api.live.notify(&key("B"));
        widget.process_pending_live_updates().await;

        assert!(widget.store().borrow().selected_keys().is_empty());
        let calls = api.action_calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].1.objects.is_empty());
    }

    #[tokio::test]
    async fn fatal_messages_and_column_state() {
        let (widget, _api) = loaded_widget(WidgetConfig::default()).await;

        let fatal = widget.fatal_messages();
        assert_eq!(fatal.len(), 1);
        assert!(!widget.should_render_table());

        widget.remove_message(&fatal[0].id);
        assert!(widget.fatal_messages().is_empty());
        assert!(widget.should_render_table());
    }
}
