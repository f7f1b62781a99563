//! Boundary to the host platform.
//!
//! Everything the widget needs from the platform goes through these two
//! traits: object retrieval, action execution, change subscriptions and the
//! user-visible error surface. The widget never reaches for ambient globals.

use shared::{ActionSpec, BusinessObject, ObjectKey};

use crate::actions::{ActionContext, ActionOutput};
use crate::dataflow::Relay;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub message: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionHandle(pub u64);

/// What changed, as seen by the widget.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LiveUpdate {
    Context(ObjectKey),
    Row(ObjectKey),
    Column(ObjectKey),
}

/// Callback handed to the platform with every subscription.
#[derive(Debug, Clone)]
pub struct Notifier {
    update: LiveUpdate,
    object_changed_relay: Relay<LiveUpdate>,
}

impl Notifier {
    pub fn new(update: LiveUpdate, object_changed_relay: Relay<LiveUpdate>) -> Self {
        Self {
            update,
            object_changed_relay,
        }
    }

    /// Called by the platform whenever the subscribed object changes or is deleted.
    pub fn notify(&self) {
        self.object_changed_relay.send(self.update.clone());
    }
}

pub trait LiveUpdates {
    fn subscribe(&self, key: &ObjectKey, notifier: Notifier) -> SubscriptionHandle;
    fn unsubscribe(&self, handle: SubscriptionHandle);
}

#[allow(async_fn_in_trait)]
pub trait DataApi: LiveUpdates {
    async fn fetch_by_xpath(
        &self,
        entity: &str,
        constraint: &str,
        context: &ObjectKey,
    ) -> Result<Vec<BusinessObject>, ApiError>;

    async fn fetch_objects(&self, keys: &[ObjectKey]) -> Result<Vec<BusinessObject>, ApiError>;

    /// `Ok(None)` means the object no longer exists.
    async fn fetch_object(&self, key: &ObjectKey) -> Result<Option<BusinessObject>, ApiError>;

    async fn run_action(
        &self,
        action: &ActionSpec,
        context: &ActionContext,
    ) -> Result<ActionOutput, ApiError>;

    fn report_error(&self, message: &str);

    fn entity_has_attribute(&self, entity: &str, attribute: &str) -> bool;

    fn is_persistable(&self, entity: &str) -> bool;
}
