//! zoon rendering of the tree table.

use futures::StreamExt;
use shared::{ColumnWidth, ObjectKey, SelectionMode, TableColumn, ValidationMessage};
use std::cell::Cell;
use std::rc::Rc;
use zoon::*;

use crate::api::DataApi;
use crate::controller::{ButtonState, VisibleRow};
use crate::widget::TreeTable;

/// Delay that separates a single click from the first half of a double click.
const DEBOUNCE_MS: u32 = 250;

/// Observable copy of the store state the table shows.
///
/// Refreshed with `set_neq` after every store revision, so a selection change
/// only touches the checkboxes and the button bar while the rows stay put.
#[derive(Clone)]
struct TableSignalStorage {
    rows_mutable: Mutable<Vec<VisibleRow>>,
    columns_mutable: Mutable<Vec<TableColumn>>,
    selected_mutable: Mutable<Vec<ObjectKey>>,
    is_loading_mutable: Mutable<bool>,
    messages_mutable: Mutable<Vec<ValidationMessage>>,
    buttons_mutable: Mutable<Vec<ButtonState>>,
    show_table_mutable: Mutable<bool>,
}

impl TableSignalStorage {
    fn new<A: DataApi + 'static>(widget: &TreeTable<A>) -> Self {
        let storage = Self {
            rows_mutable: Mutable::new(Vec::new()),
            columns_mutable: Mutable::new(Vec::new()),
            selected_mutable: Mutable::new(Vec::new()),
            is_loading_mutable: Mutable::new(false),
            messages_mutable: Mutable::new(Vec::new()),
            buttons_mutable: Mutable::new(Vec::new()),
            show_table_mutable: Mutable::new(false),
        };
        storage.sync(widget);
        storage
    }

    fn sync<A: DataApi + 'static>(&self, widget: &TreeTable<A>) {
        let (columns, selected, loading, messages) = {
            let store = widget.store();
            let store = store.borrow();
            (
                store.table_columns(),
                store.selected_keys(),
                store.loading(),
                store.messages().to_vec(),
            )
        };
        self.rows_mutable.set_neq(widget.visible_rows());
        self.columns_mutable.set_neq(columns);
        self.selected_mutable.set_neq(selected);
        self.is_loading_mutable.set_neq(loading);
        self.messages_mutable.set_neq(messages);
        self.buttons_mutable.set_neq(widget.button_bar());
        self.show_table_mutable.set_neq(widget.should_render_table());
    }
}

pub fn tree_table<A: DataApi + 'static>(widget: Rc<TreeTable<A>>) -> impl Element {
    let signals = TableSignalStorage::new(&widget);

    if let Some(mut store_changes) = widget.take_store_changes() {
        Task::start({
            let widget = widget.clone();
            let signals = signals.clone();
            async move {
                while store_changes.next().await.is_some() {
                    signals.sync(&widget);
                }
            }
        });
    }
    Task::start({
        let widget = widget.clone();
        async move {
            widget.run_live_updates().await;
            zoon::println!("tree table: live updates stopped");
        }
    });

    let clicks = Rc::new(Cell::new(0_u64));
    let show_table = signals.show_table_mutable.clone();
    Column::new()
        .s(Width::fill())
        .update_raw_el(move |raw_el| {
            raw_el
                .class_signal("widget-treetable-wrapper", show_table.signal())
                .class_signal("widget-treetable-alert", show_table.signal().map(|show| !show))
        })
        .item_signal(signals.messages_mutable.signal_cloned().map({
            let widget = widget.clone();
            move |messages| alerts(widget.clone(), messages)
        }))
        .item_signal(signals.show_table_mutable.signal().map({
            let signals = signals.clone();
            move |show| show.then(|| table(widget.clone(), signals.clone(), clicks.clone()))
        }))
}

fn table<A: DataApi + 'static>(
    widget: Rc<TreeTable<A>>,
    signals: TableSignalStorage,
    clicks: Rc<Cell<u64>>,
) -> impl Element {
    let show_header = widget.config().ui.show_header;
    let rows_signal = map_ref! {
        let rows = signals.rows_mutable.signal_cloned(),
        let columns = signals.columns_mutable.signal_cloned() =>
        (rows.clone(), columns.clone())
    };

    Column::new()
        .s(Width::fill())
        .item_signal(signals.buttons_mutable.signal_cloned().map({
            let widget = widget.clone();
            move |buttons| button_bar(widget.clone(), buttons)
        }))
        .item_signal(
            signals
                .columns_mutable
                .signal_cloned()
                .map(move |columns| show_header.then(|| header(&columns))),
        )
        .item_signal(rows_signal.map({
            let selected = signals.selected_mutable.clone();
            move |(rows, columns)| {
                Column::new().s(Width::fill()).items(rows.into_iter().map(|row| {
                    table_row(widget.clone(), clicks.clone(), selected.clone(), &columns, row)
                }))
            }
        }))
        .item_signal(signals.is_loading_mutable.signal().map(|loading| {
            loading.then(|| El::new().s(Font::new().italic()).child("Loading..."))
        }))
}

fn alerts<A: DataApi + 'static>(widget: Rc<TreeTable<A>>, messages: Vec<ValidationMessage>) -> impl Element {
    Column::new().s(Gap::new().y(4)).items(messages.into_iter().map(move |message| {
        let widget = widget.clone();
        let id = message.id.clone();
        Row::new()
            .s(Gap::new().x(8))
            .s(Padding::all(8))
            .update_raw_el(|raw_el| raw_el.class("alert alert-danger"))
            .item(El::new().s(Width::fill()).child(message.message.clone()))
            .items(message.dismissable().then(move || {
                Button::new()
                    .label("×")
                    .on_press(move || widget.remove_message(&id))
            }))
    }))
}

fn button_bar<A: DataApi + 'static>(widget: Rc<TreeTable<A>>, buttons: Vec<ButtonState>) -> impl Element {
    Row::new()
        .s(Gap::new().x(8))
        .update_raw_el(|raw_el| raw_el.class("widget-treetable-buttonbar"))
        .items(buttons.into_iter().filter(|button| !button.hidden).map(move |button| {
            let widget = widget.clone();
            let index = button.index;
            let class_name = button.class_name.clone().unwrap_or_default();
            Button::new()
                .label(button.caption.clone())
                .update_raw_el(move |raw_el| {
                    let raw_el = with_class(raw_el.class("btn"), &class_name);
                    if button.disabled {
                        raw_el.attr("disabled", "disabled")
                    } else {
                        raw_el
                    }
                })
                .on_press(move || {
                    if button.disabled {
                        return;
                    }
                    let widget = widget.clone();
                    Task::start(async move { widget.press_button(index).await });
                })
        }))
}

fn header(columns: &[TableColumn]) -> impl Element {
    Row::new()
        .s(Font::new().weight(FontWeight::Bold))
        .s(Padding::new().x(8).y(4))
        .items(columns.iter().map(|column| cell(column, column.title.clone())))
}

fn table_row<A: DataApi + 'static>(
    widget: Rc<TreeTable<A>>,
    clicks: Rc<Cell<u64>>,
    selected: Mutable<Vec<ObjectKey>>,
    columns: &[TableColumn],
    row: VisibleRow,
) -> impl Element {
    let key = row.record.key.clone();
    let class_name = row.class_name();
    let indent = u32::try_from(row.depth).unwrap_or(u32::MAX).saturating_mul(20);
    let show_checkbox = widget.selection_mode() != SelectionMode::None
        && !widget.config().selection.hide_checkboxes;
    let is_selected = selected.signal_ref({
        let key = key.clone();
        move |selected| selected.contains(&key)
    });

    Row::new()
        .s(Padding::new().x(8).y(4))
        .s(Cursor::new(CursorIcon::Pointer))
        .item(
            El::new()
                .s(Padding::new().left(indent))
                .s(Width::exact(indent + 24))
                .child(
                    row.expandable
                        .then(|| expander(widget.clone(), key.clone(), row.expanded)),
                ),
        )
        .items(show_checkbox.then(|| checkbox(widget.clone(), key.clone(), selected)))
        .items(row.record.icon.clone().map(|icon| {
            El::new().update_raw_el(move |raw_el| raw_el.class(&format!("ant-table-cell-icon {}", icon)))
        }))
        .items(columns.iter().map(|column| {
            let value = row
                .record
                .fields
                .get(&column.data_index)
                .map(ToString::to_string)
                .unwrap_or_default();
            cell(column, value)
        }))
        .on_click({
            let widget = widget.clone();
            let clicks = clicks.clone();
            let key = key.clone();
            move || {
                let token = next_click(&clicks);
                let widget = widget.clone();
                let clicks = clicks.clone();
                let key = key.clone();
                Task::start(async move {
                    Timer::sleep(DEBOUNCE_MS).await;
                    if clicks.get() == token {
                        widget.on_row_click(&key).await;
                    }
                });
            }
        })
        .update_raw_el(move |raw_el| {
            raw_el
                .class(&class_name)
                .class_signal("ant-table-row-selected", is_selected)
                .event_handler(move |_: DoubleClick| {
                    let token = next_click(&clicks);
                    let widget = widget.clone();
                    let clicks = clicks.clone();
                    let key = key.clone();
                    Task::start(async move {
                        Timer::sleep(DEBOUNCE_MS).await;
                        if clicks.get() == token {
                            widget.on_row_double_click(&key).await;
                        }
                    });
                })
        })
}

/// Newer clicks cancel the pending handler of older ones.
fn next_click(clicks: &Cell<u64>) -> u64 {
    let token = clicks.get() + 1;
    clicks.set(token);
    token
}

fn expander<A: DataApi + 'static>(widget: Rc<TreeTable<A>>, key: ObjectKey, expanded: bool) -> impl Element {
    Button::new()
        .label(if expanded { "▾" } else { "▸" })
        .on_press(move || {
            let widget = widget.clone();
            let key = key.clone();
            Task::start(async move { widget.on_expand(&key, !expanded).await });
        })
}

fn checkbox<A: DataApi + 'static>(
    widget: Rc<TreeTable<A>>,
    key: ObjectKey,
    selected: Mutable<Vec<ObjectKey>>,
) -> impl Element {
    let label = selected.signal_ref({
        let key = key.clone();
        move |selected| if selected.contains(&key) { "☑" } else { "☐" }
    });
    Button::new().label_signal(label).on_press(move || {
        let checked = !selected.lock_ref().contains(&key);
        let widget = widget.clone();
        let key = key.clone();
        Task::start(async move { widget.on_checkbox(&key, checked).await });
    })
}

fn cell(column: &TableColumn, value: String) -> impl Element {
    let width = column.width.clone();
    let class_name = column.class_name.clone().unwrap_or_default();
    El::new()
        .s(Font::new().no_wrap())
        .update_raw_el(move |raw_el| {
            let raw_el = with_class(raw_el, &class_name);
            match &width {
                Some(ColumnWidth::Pixels(pixels)) => raw_el.style("width", &format!("{}px", pixels)),
                Some(ColumnWidth::Css(css)) => raw_el.style("width", css),
                None => raw_el.style("flex", "1"),
            }
        })
        .child(value)
}

fn with_class<R: RawEl>(raw_el: R, class_name: &str) -> R {
    if class_name.is_empty() {
        raw_el
    } else {
        raw_el.class(class_name)
    }
}
