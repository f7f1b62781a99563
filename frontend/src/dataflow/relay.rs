//! Event streaming between the platform and the widget.
//!
//! A `Relay` is the sending half of an unbounded channel. Platform adapters
//! keep clones of it inside their subscription callbacks; the widget owns the
//! receiving stream and processes events one at a time.

use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};

/// Type-safe sender for widget events.
///
/// Relays follow the `{source}_{event}_relay` naming pattern where they are
/// stored, e.g. `object_changed_relay`.
#[derive(Debug)]
pub struct Relay<T> {
    sender: UnboundedSender<T>,
}

impl<T> Clone for Relay<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T> Relay<T> {
    pub fn new() -> (Self, UnboundedReceiver<T>) {
        let (sender, receiver) = unbounded();
        (Relay { sender }, receiver)
    }

    /// Sends an event; it is silently discarded once the receiver is gone.
    pub fn send(&self, value: T) {
        let _ = self.sender.unbounded_send(value);
    }
}

impl<T> Default for Relay<T> {
    /// A disconnected relay: every event is dropped.
    fn default() -> Self {
        let (relay, _receiver) = Self::new();
        relay
    }
}

pub fn relay<T>() -> (Relay<T>, UnboundedReceiver<T>) {
    Relay::new()
}
