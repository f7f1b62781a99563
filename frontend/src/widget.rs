//! The tree-table widget: loads rows for a context object, converts platform
//! objects into row records and keeps the store in sync with live updates.

use futures::{FutureExt, StreamExt};
use futures::channel::mpsc::UnboundedReceiver;
use futures::future::try_join_all;
use log::{debug, error, warn};
use shared::{
    ActionSpec, AttributeValue, BusinessObject, CellValue, ColumnDef, ColumnsConfig,
    DataSourceConfig, MetadataChecks, ObjectKey, RowRecord, ValidationMessage, WidgetConfig,
    validate_config,
};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crate::actions::{ActionContext, dispatch_for_objects, dispatch_for_value};
use crate::api::{DataApi, LiveUpdate, LiveUpdates};
use crate::dataflow::relay;
use crate::error::WidgetError;
use crate::store::{
    ChildFetch, ChildRequest, LoadedRow, MergeLevel, RowStore, RowStoreOptions, Subscriber,
};

pub const NO_DYNAMIC_COLUMNS: &str = "No dynamic columns loaded, not showing table";

pub struct TreeTable<A: DataApi + 'static> {
    pub(crate) config: WidgetConfig,
    pub(crate) api: Rc<A>,
    pub(crate) store: Rc<RefCell<RowStore>>,
    transform_nanoflows: HashMap<String, String>,
    object_changed_stream: RefCell<Option<UnboundedReceiver<LiveUpdate>>>,
    store_changed_stream: RefCell<Option<UnboundedReceiver<u64>>>,
    pub(crate) seen_last_load: Cell<Option<u64>>,
}

impl<A: DataApi + 'static> TreeTable<A> {
    pub fn new(config: WidgetConfig, api: Rc<A>) -> Self {
        let metadata = MetadataChecks {
            helper_entity_persistable: !config.helper.entity.is_empty()
                && api.is_persistable(&config.helper.entity),
        };
        let messages = validate_config(&config, metadata);
        for message in &messages {
            warn!("{}", message.message);
        }

        let (object_changed_relay, object_changed_stream) = relay();
        let live: Rc<dyn LiveUpdates> = api.clone();
        let (store, store_changed_stream) = RowStore::new(
            Subscriber::new(live, object_changed_relay),
            RowStoreOptions {
                context: None,
                columns: config.static_columns(),
                valid_columns: config.has_static_columns(),
                select_first_on_single: config.select_first_on_single(),
                messages,
            },
        );

        Self {
            transform_nanoflows: config.transform_nanoflows(),
            config,
            api,
            store: Rc::new(RefCell::new(store)),
            object_changed_stream: RefCell::new(Some(object_changed_stream)),
            store_changed_stream: RefCell::new(Some(store_changed_stream)),
            seen_last_load: Cell::new(None),
        }
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn store(&self) -> Rc<RefCell<RowStore>> {
        self.store.clone()
    }

    /// Store revisions, one per change. Can be taken once.
    pub fn take_store_changes(&self) -> Option<UnboundedReceiver<u64>> {
        self.store_changed_stream.borrow_mut().take()
    }

    pub fn context(&self) -> Option<ObjectKey> {
        self.store.borrow().context().cloned()
    }

    /// A new context object (or none) arrived: reload columns and rows.
    pub async fn set_context(&self, context: Option<ObjectKey>) {
        self.store.borrow_mut().set_context(context.clone());
        let Some(context) = context else {
            self.store.borrow_mut().set_loading(false);
            return;
        };

        self.store.borrow_mut().set_loading(true);
        if !self.config.has_static_columns() && self.config.dynamic_columns_valid() {
            if let Err(error) = self.load_columns(&context).await {
                self.report(format!("An error occurred while loading columns: {}", error));
            }
        }
        self.fetch_data(&context).await;
    }

    pub async fn reload(&self) {
        self.set_context(self.context()).await;
    }

    pub async fn load_columns(&self, context: &ObjectKey) -> Result<(), WidgetError> {
        let ColumnsConfig::Microflow { microflow, .. } = &self.config.columns else {
            return Ok(());
        };
        let action = ActionSpec::Microflow {
            microflow: microflow.clone(),
        };
        let objects = dispatch_for_objects(
            &*self.api,
            &action,
            &ActionContext::for_object(context, Some(context)),
        )
        .await?;

        let mut store = self.store.borrow_mut();
        let warnings: Vec<String> = store
            .messages()
            .iter()
            .filter(|message| message.message == NO_DYNAMIC_COLUMNS)
            .map(|message| message.id.clone())
            .collect();
        if objects.is_empty() {
            store.set_valid_columns(false);
            if warnings.is_empty() {
                store.add_validation_message(ValidationMessage::warning(NO_DYNAMIC_COLUMNS));
            }
        } else {
            for id in &warnings {
                store.remove_validation_message(id);
            }
            let columns = objects
                .iter()
                .filter_map(|object| self.column_from_metadata(object))
                .collect();
            store.set_columns(columns);
            store.set_valid_columns(true);
        }
        store.set_select_first_on_single(self.config.select_first_on_single());
        Ok(())
    }

    /// Builds a column from one metadata object. Attributes the node entity
    /// does not have are skipped.
    pub fn column_from_metadata(&self, object: &BusinessObject) -> Option<ColumnDef> {
        let ColumnsConfig::Microflow {
            label_attr,
            attribute_attr,
            class_attr,
            ..
        } = &self.config.columns
        else {
            return None;
        };

        let attribute = text_of(object, attribute_attr)?;
        if !self.api.entity_has_attribute(&self.config.node_entity, &attribute) {
            warn!(
                "column {} skipped: {} has no attribute {}",
                object.key, self.config.node_entity, attribute
            );
            return None;
        }
        let label = text_of(object, label_attr).unwrap_or_default();
        let mut column = ColumnDef::new(attribute, label).with_metadata_key(object.key.clone());
        if let Some(class_name) = class_attr
            .as_deref()
            .filter(|attr| !attr.is_empty())
            .and_then(|attr| text_of(object, attr))
        {
            column = column.with_class_name(class_name);
        }
        Some(column)
    }

    /// A column metadata object changed: rebuild that column, then every row.
    pub async fn reload_column(&self, metadata_key: &ObjectKey) -> Result<(), WidgetError> {
        let object = self.api.fetch_object(metadata_key).await?;
        let column = object.and_then(|object| self.column_from_metadata(&object));
        self.store.borrow_mut().replace_column(metadata_key, column);
        self.refresh_rows().await
    }

    /// Re-converts every loaded row against the current columns.
    pub async fn refresh_rows(&self) -> Result<(), WidgetError> {
        let objects: Vec<BusinessObject> = self
            .store
            .borrow()
            .rows()
            .map(|row| row.object().clone())
            .collect();
        let rows = self.convert_objects(&objects, None).await?;
        let mut store = self.store.borrow_mut();
        for row in rows {
            store.refresh_row(row);
        }
        Ok(())
    }

    async fn fetch_data(&self, context: &ObjectKey) {
        let result = match &self.config.data {
            DataSourceConfig::XPath { constraint } => {
                if self.config.node_entity.is_empty() {
                    Ok(Vec::new())
                } else {
                    self.api
                        .fetch_by_xpath(&self.config.node_entity, constraint, context)
                        .await
                        .map_err(WidgetError::from)
                }
            }
            DataSourceConfig::Microflow { microflow } => {
                self.run_data_action(
                    ActionSpec::Microflow {
                        microflow: microflow.clone(),
                    },
                    context,
                )
                .await
            }
            DataSourceConfig::Nanoflow { nanoflow } => {
                self.run_data_action(
                    ActionSpec::Nanoflow {
                        nanoflow: nanoflow.clone(),
                    },
                    context,
                )
                .await
            }
        };

        match result {
            Ok(objects) => self.handle_data(objects, None, MergeLevel::Root).await,
            Err(error) => {
                self.report(format!(
                    "An error occurred while executing retrieving data: {}",
                    error
                ));
                self.store.borrow_mut().set_loading(false);
            }
        }
    }

    async fn run_data_action(
        &self,
        action: ActionSpec,
        context: &ObjectKey,
    ) -> Result<Vec<BusinessObject>, WidgetError> {
        if action.target().is_empty() {
            return Ok(Vec::new());
        }
        dispatch_for_objects(
            &*self.api,
            &action,
            &ActionContext::for_object(context, Some(context)),
        )
        .await
    }

    /// Converts and merges fetched objects, then keeps fetching whatever
    /// children the merges ask for until nothing is missing.
    async fn handle_data(
        &self,
        objects: Vec<BusinessObject>,
        parent: Option<ObjectKey>,
        level: MergeLevel,
    ) {
        let mut queue = VecDeque::from([(objects, parent, level)]);

        while let Some((objects, parent, level)) = queue.pop_front() {
            debug!(
                "handle_data: {} objects under {:?} at {:?}",
                objects.len(),
                parent,
                level
            );
            let rows = match self.convert_objects(&objects, parent.as_ref()).await {
                Ok(rows) => rows,
                Err(error) => {
                    self.report(format!("An error occurred while handling data: {}", error));
                    continue;
                }
            };

            let outcome = {
                let mut store = self.store.borrow_mut();
                match &parent {
                    Some(parent) => store.merge_children(parent, rows, level),
                    None => store.merge_rows(rows, level),
                }
            };

            for request in outcome.child_requests {
                match self.fetch_children(&request).await {
                    Ok(children) => queue.push_back((children, Some(request.parent), request.level)),
                    Err(error) => self.report(format!(
                        "An error occurred while retrieving child items for {}: {}",
                        request.parent, error
                    )),
                }
            }
        }

        self.store.borrow_mut().set_loading(false);
        self.sync_after_load();
    }

    async fn fetch_children(&self, request: &ChildRequest) -> Result<Vec<BusinessObject>, WidgetError> {
        match &request.fetch {
            ChildFetch::Keys(keys) => Ok(self.api.fetch_objects(keys).await?),
            ChildFetch::Lazy => {
                let Some(action) = self.config.children.child_action() else {
                    return Ok(Vec::new());
                };
                let Some(node) = self.api.fetch_object(&request.parent).await? else {
                    return Ok(Vec::new());
                };
                let context = self.context();
                dispatch_for_objects(
                    &*self.api,
                    &action,
                    &ActionContext::for_object(&node.key, context.as_ref()),
                )
                .await
            }
        }
    }

    /// Loads the children of `key`, pre-expanding `level` levels below it.
    pub async fn expand(&self, key: &ObjectKey, level: MergeLevel) {
        let request = self.store.borrow().child_request_for(key, level);
        let Some(request) = request else {
            return;
        };

        self.store.borrow_mut().set_loading(true);
        match self.fetch_children(&request).await {
            Ok(children) => {
                self.handle_data(children, Some(request.parent), request.level)
                    .await
            }
            Err(error) => {
                self.report(format!(
                    "An error occurred while retrieving child items for {}: {}",
                    key, error
                ));
                self.store.borrow_mut().set_loading(false);
            }
        }
    }

    pub async fn convert_objects(
        &self,
        objects: &[BusinessObject],
        parent: Option<&ObjectKey>,
    ) -> Result<Vec<LoadedRow>, WidgetError> {
        try_join_all(objects.iter().map(|object| self.convert_object(object, parent))).await
    }

    pub async fn convert_object(
        &self,
        object: &BusinessObject,
        parent: Option<&ObjectKey>,
    ) -> Result<LoadedRow, WidgetError> {
        let columns = self.store.borrow().columns().to_vec();
        let mut record = RowRecord::new(object.key.clone());
        record.parent_key = parent.cloned();

        for column in &columns {
            if !object.has_attribute(&column.source_attribute) {
                continue;
            }
            let value = self
                .formatted_or_transformed(object, &column.source_attribute)
                .await?;
            record.fields.insert(column.id.clone(), value);
        }

        let ui = &self.config.ui;
        if let Some(class_name) = ui
            .row_class_attr
            .as_deref()
            .and_then(|attr| text_of(object, attr))
        {
            record.class_name = Some(class_name);
        }
        if let Some(icon) = ui
            .row_icon_attr
            .as_deref()
            .and_then(|attr| text_of(object, attr))
        {
            record.icon = Some(format!("{}{}", ui.icon_prefix(), icon));
        }

        let references = self
            .config
            .children
            .reference_attribute()
            .map(|reference| object.references(reference))
            .unwrap_or_default();
        if !references.is_empty() {
            record.child_ref_keys = Some(references.to_vec());
        } else if let Some(attr) = self.config.children.has_children_attribute() {
            record.has_lazy_children = object.get(attr).is_some_and(AttributeValue::is_truthy);
        }

        Ok(LoadedRow {
            object: object.clone(),
            record,
        })
    }

    async fn formatted_or_transformed(
        &self,
        object: &BusinessObject,
        attribute: &str,
    ) -> Result<CellValue, WidgetError> {
        if let Some(nanoflow) = self.transform_nanoflows.get(attribute) {
            let action = ActionSpec::Nanoflow {
                nanoflow: nanoflow.clone(),
            };
            let context = self.context();
            return dispatch_for_value(
                &*self.api,
                &action,
                &ActionContext::for_object(&object.key, context.as_ref()),
            )
            .await;
        }
        Ok(object
            .formatted(attribute)
            .unwrap_or_else(|| CellValue::Text(String::new())))
    }

    pub async fn handle_live_update(&self, update: LiveUpdate) {
        debug!("live update: {:?}", update);
        match update {
            LiveUpdate::Context(key) => {
                // Queued updates for a previous context must not touch the
                // subscriptions of the current one.
                if self.context().as_ref() != Some(&key) {
                    debug!("ignoring update for stale context {}", key);
                    return;
                }
                self.store.borrow_mut().clear_subscriptions();
                self.reload().await;
            }
            LiveUpdate::Row(key) => self.handle_row_change(&key).await,
            LiveUpdate::Column(key) => {
                if let Err(error) = self.reload_column(&key).await {
                    self.report(format!("An error occurred while reloading column {}: {}", key, error));
                }
            }
        }
    }

    async fn handle_row_change(&self, key: &ObjectKey) {
        match self.api.fetch_object(key).await {
            Ok(Some(object)) => match self.convert_object(&object, None).await {
                Ok(row) => {
                    self.store.borrow_mut().refresh_row(row);
                }
                Err(error) => self.report(format!("An error occurred while handling data: {}", error)),
            },
            Ok(None) => {
                let was_selected = {
                    let mut store = self.store.borrow_mut();
                    let was_selected = store.find_row(key).is_some_and(|row| row.selected());
                    store.remove_row(key);
                    was_selected
                };
                if was_selected {
                    self.selection_changed().await;
                }
            }
            Err(error) => self.report(format!("An error occurred while refreshing {}: {}", key, error)),
        }
    }

    /// Handles every live update queued so far; returns how many there were.
    pub async fn process_pending_live_updates(&self) -> usize {
        let pending = {
            let mut guard = self.object_changed_stream.borrow_mut();
            let Some(stream) = guard.as_mut() else {
                return 0;
            };
            let mut pending = Vec::new();
            while let Some(Some(update)) = stream.next().now_or_never() {
                pending.push(update);
            }
            pending
        };
        let count = pending.len();
        for update in pending {
            self.handle_live_update(update).await;
        }
        count
    }

    /// Event loop for live updates; runs until the platform side is gone.
    pub async fn run_live_updates(&self) {
        let Some(mut stream) = self.object_changed_stream.borrow_mut().take() else {
            warn!("live updates are already being processed");
            return;
        };
        while let Some(update) = stream.next().await {
            self.handle_live_update(update).await;
        }
    }

    pub(crate) fn report(&self, message: String) {
        error!("{}", message);
        self.api.report_error(&message);
    }
}

fn text_of(object: &BusinessObject, attribute: &str) -> Option<String> {
    object
        .get(attribute)
        .and_then(AttributeValue::as_text)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}
