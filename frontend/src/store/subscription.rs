//! Scoped live-update subscriptions.

use shared::ObjectKey;
use std::fmt;
use std::rc::Rc;

use crate::api::{LiveUpdate, LiveUpdates, Notifier, SubscriptionHandle};
use crate::dataflow::Relay;

/// Active platform subscription; unsubscribes when dropped.
pub struct Subscription {
    handle: SubscriptionHandle,
    live: Rc<dyn LiveUpdates>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.live.unsubscribe(self.handle);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("handle", &self.handle)
            .finish()
    }
}

/// Creates subscriptions that report into the widget's `object_changed_relay`.
#[derive(Clone)]
pub struct Subscriber {
    live: Rc<dyn LiveUpdates>,
    object_changed_relay: Relay<LiveUpdate>,
}

impl Subscriber {
    pub fn new(live: Rc<dyn LiveUpdates>, object_changed_relay: Relay<LiveUpdate>) -> Self {
        Self {
            live,
            object_changed_relay,
        }
    }

    pub fn subscribe(&self, key: &ObjectKey, update: LiveUpdate) -> Subscription {
        let notifier = Notifier::new(update, self.object_changed_relay.clone());
        let handle = self.live.subscribe(key, notifier);
        Subscription {
            handle,
            live: self.live.clone(),
        }
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber").finish_non_exhaustive()
    }
}
