//! Tree-table widget runtime.
//!
//! [`TreeTable`] drives loading and user gestures against a host platform
//! reached through [`DataApi`]; [`RowStore`] holds everything that is shown.
//! With the `ui` feature the widget renders itself with zoon.

pub mod actions;
pub mod api;
pub mod controller;
pub mod dataflow;
pub mod error;
pub mod store;
pub mod widget;

#[cfg(feature = "ui")]
pub mod view;

#[cfg(test)]
pub(crate) mod testing;

pub use actions::{ActionContext, ActionOutput, dispatch};
pub use api::{ApiError, DataApi, LiveUpdate, LiveUpdates, Notifier, SubscriptionHandle};
pub use controller::{ButtonState, VisibleRow};
pub use error::WidgetError;
pub use store::{
    ChildFetch, ChildRequest, LoadedRow, MergeLevel, MergeOutcome, Row, RowStore,
    RowStoreOptions, TableKeys,
};
pub use widget::TreeTable;
