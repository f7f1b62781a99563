//! Row store: the single owner of loaded rows, columns and widget status.
//!
//! All mutation goes through the setter methods below; everything the view
//! reads (`displayed_tree`, `table_columns`, `selected_keys`...) is derived on
//! read. The store never performs I/O. Merges that discover missing children
//! hand back [`ChildRequest`]s and the widget decides how to fetch them.

mod row;
mod subscription;

pub use row::Row;
pub use subscription::{Subscriber, Subscription};

use futures::channel::mpsc::UnboundedReceiver;
use indexmap::{IndexMap, IndexSet};
use log::debug;
use shared::{
    BusinessObject, ColumnDef, ObjectKey, RowRecord, TableColumn, TreeNode, ValidationMessage,
    build_tree, table_columns,
};
use std::collections::HashSet;

use crate::api::LiveUpdate;
use crate::dataflow::Relay;

/// Platform object together with the record converted from it.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedRow {
    pub object: BusinessObject,
    pub record: RowRecord,
}

/// Depth hint attached to a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeLevel {
    /// Full reload from the context: the collection is reset first.
    Root,
    /// Plain merge, no pre-expansion.
    Unset,
    /// Pre-expand new rows this many levels deep.
    Depth(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildFetch {
    /// Referenced children that are not loaded yet.
    Keys(Vec<ObjectKey>),
    /// Children produced by the child action for the parent's object.
    Lazy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildRequest {
    pub parent: ObjectKey,
    pub fetch: ChildFetch,
    pub level: MergeLevel,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub child_requests: Vec<ChildRequest>,
}

impl MergeOutcome {
    pub fn is_empty(&self) -> bool {
        self.child_requests.is_empty()
    }
}

/// Everything the widget keeps a live-update subscription on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableKeys {
    pub context: Option<ObjectKey>,
    pub rows: Vec<ObjectKey>,
    pub columns: Vec<ObjectKey>,
}

#[derive(Debug, Clone, Default)]
pub struct RowStoreOptions {
    pub context: Option<ObjectKey>,
    pub columns: Vec<ColumnDef>,
    pub valid_columns: bool,
    pub select_first_on_single: bool,
    pub messages: Vec<ValidationMessage>,
}

#[derive(Debug)]
pub struct RowStore {
    subscriber: Subscriber,
    context: Option<ObjectKey>,
    rows: IndexMap<ObjectKey, Row>,
    columns: Vec<ColumnDef>,
    valid_columns: bool,
    select_first_on_single: bool,
    loading: bool,
    messages: Vec<ValidationMessage>,
    last_load: Option<u64>,
    load_counter: u64,
    store_subscriptions: Vec<Subscription>,
    revision: u64,
    store_changed_relay: Relay<u64>,
}

impl RowStore {
    pub fn new(subscriber: Subscriber, options: RowStoreOptions) -> (Self, UnboundedReceiver<u64>) {
        let (store_changed_relay, store_changed_stream) = Relay::new();
        let store = Self {
            subscriber,
            context: options.context,
            rows: IndexMap::new(),
            columns: options.columns,
            valid_columns: options.valid_columns,
            select_first_on_single: options.select_first_on_single,
            loading: false,
            messages: options.messages,
            last_load: None,
            load_counter: 0,
            store_subscriptions: Vec::new(),
            revision: 0,
            store_changed_relay,
        };
        (store, store_changed_stream)
    }

    // Mutations

    pub fn load_roots(&mut self, rows: Vec<LoadedRow>) -> MergeOutcome {
        self.merge_rows(rows, MergeLevel::Root)
    }

    pub fn merge_rows(&mut self, rows: Vec<LoadedRow>, level: MergeLevel) -> MergeOutcome {
        debug!("store: merge_rows {} rows at {:?}", rows.len(), level);
        if level == MergeLevel::Root {
            self.rows.clear();
            self.load_counter += 1;
            self.last_load = Some(self.load_counter);
        }

        let mut replaced = Vec::new();
        let mut pre_expand = Vec::new();

        for loaded in rows {
            let key = loaded.record.key.clone();
            if let Some(row) = self.rows.get_mut(&key) {
                row.replace(loaded, &self.subscriber);
                replaced.push(key);
                continue;
            }
            let is_leaf = loaded.record.is_leaf();
            let mut row = Row::new(loaded, &self.subscriber);
            if let MergeLevel::Depth(depth) = level {
                if depth > 0 && !is_leaf {
                    row.set_expanded(true);
                    pre_expand.push((key.clone(), MergeLevel::Depth(depth - 1)));
                }
            }
            self.rows.insert(key, row);
        }

        let mut outcome = MergeOutcome::default();
        // Checked after the whole batch so rows arriving together count as loaded.
        for key in replaced {
            if let Some(missing) = self.missing_children(&key) {
                outcome.child_requests.push(ChildRequest {
                    parent: key,
                    fetch: ChildFetch::Keys(missing),
                    level: MergeLevel::Unset,
                });
            }
        }
        for (key, child_level) in pre_expand {
            if let Some(request) = self.child_request_for(&key, child_level) {
                outcome.child_requests.push(request);
            }
        }

        self.reset_subscriptions();
        self.touch();
        outcome
    }

    /// Merge for a finished child fetch. Nothing happens when the parent was
    /// removed while the fetch was in flight.
    pub fn merge_children(
        &mut self,
        parent: &ObjectKey,
        rows: Vec<LoadedRow>,
        level: MergeLevel,
    ) -> MergeOutcome {
        if !self.rows.contains_key(parent) {
            debug!("store: parent {} is gone, dropping {} children", parent, rows.len());
            return MergeOutcome::default();
        }
        let rows = rows
            .into_iter()
            .map(|mut loaded| {
                if loaded.record.parent_key.is_none() {
                    loaded.record.parent_key = Some(parent.clone());
                }
                loaded
            })
            .collect();
        self.merge_rows(rows, level)
    }

    /// Live-update result for one row. Returns `false` when the row is no
    /// longer in the store, in which case nothing is changed.
    pub fn refresh_row(&mut self, loaded: LoadedRow) -> bool {
        let key = loaded.record.key.clone();
        let Some(row) = self.rows.get_mut(&key) else {
            debug!("store: refresh for removed row {}", key);
            return false;
        };
        debug!("store: refresh_row {}", key);
        row.replace(loaded, &self.subscriber);
        self.touch();
        true
    }

    pub fn remove_row(&mut self, key: &ObjectKey) -> bool {
        let Some(mut row) = self.rows.shift_remove(key) else {
            return false;
        };
        debug!("store: remove_row {} (selected: {})", key, row.selected());
        row.release();
        self.reset_subscriptions();
        self.touch();
        true
    }

    pub fn set_expanded(&mut self, keys: &[ObjectKey]) {
        debug!("store: set_expanded {:?}", keys);
        let wanted: HashSet<&ObjectKey> = keys.iter().collect();
        let mut changed = false;
        for (key, row) in self.rows.iter_mut() {
            changed |= row.set_expanded(wanted.contains(key));
        }
        if changed {
            self.touch();
        }
    }

    pub fn set_selected(&mut self, keys: &[ObjectKey]) {
        debug!("store: set_selected {:?}", keys);
        let wanted: HashSet<&ObjectKey> = keys.iter().collect();
        let mut changed = false;
        for (key, row) in self.rows.iter_mut() {
            changed |= row.set_selected(wanted.contains(key));
        }
        if changed {
            self.touch();
        }
    }

    pub fn set_columns(&mut self, columns: Vec<ColumnDef>) {
        debug!("store: set_columns {}", columns.len());
        self.columns = columns;
        self.touch();
    }

    /// Replaces the column built from `metadata_key`, or drops it when the
    /// metadata object is gone.
    pub fn replace_column(&mut self, metadata_key: &ObjectKey, column: Option<ColumnDef>) {
        let position = self
            .columns
            .iter()
            .position(|existing| existing.metadata_key.as_ref() == Some(metadata_key));
        match (position, column) {
            (Some(index), Some(column)) => self.columns[index] = column,
            (Some(index), None) => {
                self.columns.remove(index);
            }
            (None, Some(column)) => self.columns.push(column),
            (None, None) => return,
        }
        debug!("store: replace_column {}", metadata_key);
        self.reset_subscriptions();
        self.touch();
    }

    pub fn set_valid_columns(&mut self, valid: bool) {
        self.valid_columns = valid;
        self.touch();
    }

    pub fn set_context(&mut self, context: Option<ObjectKey>) {
        debug!("store: set_context {:?}", context);
        self.context = context;
        self.touch();
    }

    pub fn set_loading(&mut self, loading: bool) {
        if self.loading != loading {
            self.loading = loading;
            self.touch();
        }
    }

    pub fn set_select_first_on_single(&mut self, enabled: bool) {
        self.select_first_on_single = enabled;
    }

    pub fn add_validation_message(&mut self, message: ValidationMessage) {
        self.messages.push(message);
        self.touch();
    }

    pub fn remove_validation_message(&mut self, id: &str) -> bool {
        let Some(index) = self.messages.iter().position(|message| message.id == id) else {
            return false;
        };
        self.messages.remove(index);
        self.touch();
        true
    }

    pub fn clear_subscriptions(&mut self) {
        debug!("store: clear_subscriptions");
        self.store_subscriptions.clear();
        for row in self.rows.values_mut() {
            row.release();
        }
    }

    /// Drops every subscription, then subscribes context, rows and column
    /// metadata objects again.
    pub fn reset_subscriptions(&mut self) {
        self.clear_subscriptions();
        let keys = self.table_keys();
        if let Some(context) = &keys.context {
            self.store_subscriptions.push(
                self.subscriber
                    .subscribe(context, LiveUpdate::Context(context.clone())),
            );
        }
        for row in self.rows.values_mut() {
            row.resubscribe(&self.subscriber);
        }
        for column in &keys.columns {
            self.store_subscriptions.push(
                self.subscriber
                    .subscribe(column, LiveUpdate::Column(column.clone())),
            );
        }
    }

    fn touch(&mut self) {
        self.revision += 1;
        self.store_changed_relay.send(self.revision);
    }

    // Derived values

    pub fn displayed_tree(&self) -> Vec<TreeNode> {
        build_tree(self.rows.values().map(|row| row.record().clone()).collect())
    }

    pub fn table_columns(&self) -> Vec<TableColumn> {
        table_columns(&self.columns)
    }

    pub fn expanded_keys(&self) -> Vec<ObjectKey> {
        self.rows
            .values()
            .filter(|row| row.expanded())
            .map(|row| row.key().clone())
            .collect()
    }

    pub fn selected_keys(&self) -> Vec<ObjectKey> {
        self.rows
            .values()
            .filter(|row| row.selected())
            .map(|row| row.key().clone())
            .collect()
    }

    /// Whether any loaded row hangs under `key`.
    pub fn has_children(&self, key: &ObjectKey) -> bool {
        self.rows
            .values()
            .any(|row| row.record().parent_key.as_ref() == Some(key))
    }

    /// What has to be fetched to show the children of `key`, if anything.
    pub fn child_request_for(&self, key: &ObjectKey, level: MergeLevel) -> Option<ChildRequest> {
        let row = self.rows.get(key)?;
        let record = row.record();
        let fetch = if !record.child_refs().is_empty() {
            let missing: Vec<ObjectKey> = record
                .child_refs()
                .iter()
                .filter(|child| !self.rows.contains_key(*child))
                .cloned()
                .collect::<IndexSet<_>>()
                .into_iter()
                .collect();
            if missing.is_empty() {
                return None;
            }
            ChildFetch::Keys(missing)
        } else if record.has_lazy_children && !self.has_children(key) {
            ChildFetch::Lazy
        } else {
            return None;
        };
        Some(ChildRequest {
            parent: key.clone(),
            fetch,
            level,
        })
    }

    /// Referenced children still missing for a row that already shows some.
    fn missing_children(&self, key: &ObjectKey) -> Option<Vec<ObjectKey>> {
        let row = self.rows.get(key)?;
        if row.record().child_refs().is_empty() || !self.has_children(key) {
            return None;
        }
        match self.child_request_for(key, MergeLevel::Unset)?.fetch {
            ChildFetch::Keys(missing) => Some(missing),
            ChildFetch::Lazy => None,
        }
    }

    pub fn table_keys(&self) -> TableKeys {
        TableKeys {
            context: self.context.clone(),
            rows: self.rows.keys().cloned().collect(),
            columns: self
                .columns
                .iter()
                .filter_map(|column| column.metadata_key.clone())
                .collect(),
        }
    }

    /// Any fatal message, or nothing to load from.
    pub fn disabled(&self) -> bool {
        self.messages.iter().any(|message| message.fatal) || self.context.is_none()
    }

    pub fn find_row(&self, key: &ObjectKey) -> Option<&Row> {
        self.rows.get(key)
    }

    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn context(&self) -> Option<&ObjectKey> {
        self.context.as_ref()
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn valid_columns(&self) -> bool {
        self.valid_columns
    }

    pub fn select_first_on_single(&self) -> bool {
        self.select_first_on_single
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn messages(&self) -> &[ValidationMessage] {
        &self.messages
    }

    /// Stamp of the last full reload from the context.
    pub fn last_load(&self) -> Option<u64> {
        self.last_load
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}
