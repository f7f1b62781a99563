//! Platform-independent model of the tree-table widget: object snapshots, row
//! records, columns, the tree builder and the widget configuration.

pub mod column;
pub mod config;
pub mod object;
pub mod row;
pub mod tree;
pub mod validation;

pub use column::{
    ColumnDef, ColumnWidth, ReferencePart, TableColumn, column_id, reference_part,
    static_columns, table_columns,
};
pub use config::{
    ActionSpec, ButtonConfig, ChildSourceConfig, ColumnConfig, ColumnsConfig, ConfigError,
    DataSourceConfig, EventsConfig, HelperConfig, OpenPageAs, SelectionConfig, SelectionMode,
    UiConfig, WidgetConfig,
};
pub use object::{AttributeValue, BusinessObject, ObjectKey};
pub use row::{CellValue, RowRecord};
pub use tree::{TreeNode, build_tree, find_node, flatten_tree};
pub use validation::{MetadataChecks, ValidationMessage, validate_config};
