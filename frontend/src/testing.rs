//! In-memory platform used by the unit tests.

use indexmap::IndexMap;
use shared::{ActionSpec, BusinessObject, ObjectKey};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::actions::{ActionContext, ActionOutput};
use crate::api::{ApiError, DataApi, LiveUpdates, Notifier, SubscriptionHandle};

/// Subscription registry; `notify` plays the platform firing a change.
#[derive(Default)]
pub struct FakeLive {
    next_handle: Cell<u64>,
    subscribe_count: Cell<usize>,
    active: RefCell<BTreeMap<SubscriptionHandle, (ObjectKey, Notifier)>>,
}

impl FakeLive {
    pub fn active_keys(&self) -> Vec<ObjectKey> {
        self.active
            .borrow()
            .values()
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn subscribe_count(&self) -> usize {
        self.subscribe_count.get()
    }

    /// Fires every live subscription on `key`; returns how many fired.
    pub fn notify(&self, key: &ObjectKey) -> usize {
        let notifiers: Vec<Notifier> = self
            .active
            .borrow()
            .values()
            .filter(|(subscribed, _)| subscribed == key)
            .map(|(_, notifier)| notifier.clone())
            .collect();
        for notifier in &notifiers {
            notifier.notify();
        }
        notifiers.len()
    }
}

impl LiveUpdates for FakeLive {
    fn subscribe(&self, key: &ObjectKey, notifier: Notifier) -> SubscriptionHandle {
        let handle = SubscriptionHandle(self.next_handle.get() + 1);
        self.next_handle.set(handle.0);
        self.subscribe_count.set(self.subscribe_count.get() + 1);
        self.active
            .borrow_mut()
            .insert(handle, (key.clone(), notifier));
        handle
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.active.borrow_mut().remove(&handle);
    }
}

#[derive(Default)]
pub struct FakeApi {
    pub live: FakeLive,
    objects: RefCell<IndexMap<ObjectKey, BusinessObject>>,
    xpath_roots: RefCell<Vec<ObjectKey>>,
    outputs: RefCell<HashMap<(String, Option<ObjectKey>), ActionOutput>>,
    failing: RefCell<HashSet<String>>,
    fail_fetches: Cell<bool>,
    missing_attributes: RefCell<HashSet<(String, String)>>,
    persistable: RefCell<HashSet<String>>,
    action_calls: RefCell<Vec<(ActionSpec, ActionContext)>>,
    xpath_calls: RefCell<Vec<(String, String, ObjectKey)>>,
    reported: RefCell<Vec<String>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, object: BusinessObject) {
        self.objects.borrow_mut().insert(object.key.clone(), object);
    }

    pub fn remove(&self, key: &str) {
        self.objects.borrow_mut().shift_remove(key);
    }

    pub fn set_xpath_roots(&self, keys: &[&str]) {
        *self.xpath_roots.borrow_mut() = keys.iter().map(|key| ObjectKey::from(*key)).collect();
    }

    /// Output for every call of `target`.
    pub fn set_action_output(&self, target: &str, output: ActionOutput) {
        self.outputs
            .borrow_mut()
            .insert((target.to_string(), None), output);
    }

    /// Output for calls of `target` whose first object is `object`.
    pub fn set_action_output_for(&self, target: &str, object: &str, output: ActionOutput) {
        self.outputs
            .borrow_mut()
            .insert((target.to_string(), Some(ObjectKey::from(object))), output);
    }

    pub fn fail_action(&self, target: &str) {
        self.failing.borrow_mut().insert(target.to_string());
    }

    pub fn recover_action(&self, target: &str) {
        self.failing.borrow_mut().remove(target);
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetches.set(fail);
    }

    pub fn remove_attribute(&self, entity: &str, attribute: &str) {
        self.missing_attributes
            .borrow_mut()
            .insert((entity.to_string(), attribute.to_string()));
    }

    pub fn set_persistable(&self, entity: &str) {
        self.persistable.borrow_mut().insert(entity.to_string());
    }

    pub fn objects_for(&self, keys: &[&str]) -> Vec<BusinessObject> {
        let objects = self.objects.borrow();
        keys.iter()
            .filter_map(|key| objects.get(*key).cloned())
            .collect()
    }

    pub fn action_calls(&self) -> Vec<(ActionSpec, ActionContext)> {
        self.action_calls.borrow().clone()
    }

    pub fn action_targets(&self) -> Vec<String> {
        self.action_calls
            .borrow()
            .iter()
            .map(|(action, _)| action.target().to_string())
            .collect()
    }

    pub fn xpath_calls(&self) -> Vec<(String, String, ObjectKey)> {
        self.xpath_calls.borrow().clone()
    }

    pub fn reported(&self) -> Vec<String> {
        self.reported.borrow().clone()
    }
}

impl LiveUpdates for FakeApi {
    fn subscribe(&self, key: &ObjectKey, notifier: Notifier) -> SubscriptionHandle {
        self.live.subscribe(key, notifier)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.live.unsubscribe(handle)
    }
}

impl DataApi for FakeApi {
    async fn fetch_by_xpath(
        &self,
        entity: &str,
        constraint: &str,
        context: &ObjectKey,
    ) -> Result<Vec<BusinessObject>, ApiError> {
        self.xpath_calls.borrow_mut().push((
            entity.to_string(),
            constraint.to_string(),
            context.clone(),
        ));
        if self.fail_fetches.get() {
            return Err(ApiError::new("xpath retrieve failed"));
        }
        let roots = self.xpath_roots.borrow().clone();
        let objects = self.objects.borrow();
        Ok(roots
            .iter()
            .filter_map(|key| objects.get(key))
            .filter(|object| object.entity == entity)
            .cloned()
            .collect())
    }

    async fn fetch_objects(&self, keys: &[ObjectKey]) -> Result<Vec<BusinessObject>, ApiError> {
        if self.fail_fetches.get() {
            return Err(ApiError::new("retrieve by guids failed"));
        }
        let objects = self.objects.borrow();
        Ok(keys.iter().filter_map(|key| objects.get(key).cloned()).collect())
    }

    async fn fetch_object(&self, key: &ObjectKey) -> Result<Option<BusinessObject>, ApiError> {
        if self.fail_fetches.get() {
            return Err(ApiError::new("retrieve by guid failed"));
        }
        Ok(self.objects.borrow().get(key).cloned())
    }

    async fn run_action(
        &self,
        action: &ActionSpec,
        context: &ActionContext,
    ) -> Result<ActionOutput, ApiError> {
        self.action_calls
            .borrow_mut()
            .push((action.clone(), context.clone()));
        let target = action.target().to_string();
        if self.failing.borrow().contains(&target) {
            return Err(ApiError::new(format!("{} failed", target)));
        }
        let outputs = self.outputs.borrow();
        let first = context.objects.first().cloned();
        Ok(outputs
            .get(&(target.clone(), first))
            .or_else(|| outputs.get(&(target, None)))
            .cloned()
            .unwrap_or_default())
    }

    fn report_error(&self, message: &str) {
        self.reported.borrow_mut().push(message.to_string());
    }

    fn entity_has_attribute(&self, entity: &str, attribute: &str) -> bool {
        !self
            .missing_attributes
            .borrow()
            .contains(&(entity.to_string(), attribute.to_string()))
    }

    fn is_persistable(&self, entity: &str) -> bool {
        self.persistable.borrow().contains(entity)
    }
}
