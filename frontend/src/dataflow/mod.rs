//! Event plumbing between the platform adapters and the widget.

pub mod relay;

pub use relay::{Relay, relay};
