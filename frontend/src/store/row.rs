use shared::{BusinessObject, ObjectKey, RowRecord};

use super::LoadedRow;
use super::subscription::{Subscriber, Subscription};
use crate::api::LiveUpdate;

/// One loaded object and the record derived from it.
///
/// The row owns its live-update subscription: it subscribes when created or
/// when its object is replaced, and the guard unsubscribes when the row goes.
#[derive(Debug)]
pub struct Row {
    object: BusinessObject,
    record: RowRecord,
    selected: bool,
    expanded: bool,
    subscription: Option<Subscription>,
}

impl Row {
    pub fn new(loaded: LoadedRow, subscriber: &Subscriber) -> Self {
        let mut row = Self {
            object: loaded.object,
            record: loaded.record,
            selected: false,
            expanded: false,
            subscription: None,
        };
        row.resubscribe(subscriber);
        row
    }

    /// Swaps in a fresh object. A record without parent keeps the one already
    /// known, since child fetches by key do not know where they hang.
    pub fn replace(&mut self, loaded: LoadedRow, subscriber: &Subscriber) {
        self.subscription = None;
        let mut record = loaded.record;
        if record.parent_key.is_none() {
            record.parent_key = self.record.parent_key.take();
        }
        self.object = loaded.object;
        self.record = record;
        self.resubscribe(subscriber);
    }

    pub fn resubscribe(&mut self, subscriber: &Subscriber) {
        // Old guard first, so the platform never sees two for one row.
        self.subscription = None;
        let key = self.key().clone();
        self.subscription = Some(subscriber.subscribe(&key, LiveUpdate::Row(key.clone())));
    }

    pub fn release(&mut self) {
        self.subscription = None;
    }

    pub fn key(&self) -> &ObjectKey {
        &self.record.key
    }

    pub fn record(&self) -> &RowRecord {
        &self.record
    }

    pub fn object(&self) -> &BusinessObject {
        &self.object
    }

    pub fn selected(&self) -> bool {
        self.selected
    }

    pub fn expanded(&self) -> bool {
        self.expanded
    }

    /// Returns whether the flag changed.
    pub fn set_selected(&mut self, selected: bool) -> bool {
        let changed = self.selected != selected;
        self.selected = selected;
        changed
    }

    pub fn set_expanded(&mut self, expanded: bool) -> bool {
        let changed = self.expanded != expanded;
        self.expanded = expanded;
        changed
    }
}
