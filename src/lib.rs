//! Dashboard widget configuration engine: a typed catalog of widget kinds,
//! user-defined data sources, config resolution and validation, a cached data
//! binding layer, and a pure renderer that turns `(widget, data)` into a
//! displayable model. The shell (desktop or web) owns drawing and input; this
//! crate owns everything between the palette and the pixels.

pub mod bootstrap;
pub mod builder;
pub mod catalog;
pub mod db;
pub mod engine;
pub mod errors;
pub mod fetch;
pub mod models;
pub mod notify;
pub mod registry;
pub mod render;
pub mod schema;

pub use builder::{BuilderSession, RejectReason, SaveOutcome, DEFAULT_DASHBOARD_NAME};
pub use db::{DashboardStore, Database, SqliteDataProvider};
pub use engine::{init_tracing, DashboardEngine, LoadedDashboard, WidgetView};
pub use errors::{AppError, AppResult};
pub use fetch::{FetchLayer, WidgetDataProvider};
pub use models::{
    CreateDataSourcePayload, DashboardConfig, DashboardConfigRecord, DataSourceDescriptor,
    LayoutConfig, QueryConfig, SourceType, WidgetDataState, WidgetInstance, WidgetType,
    WidgetTypeDescriptor,
};
pub use notify::{NoticeKind, Notifier, TracingNotifier};
pub use registry::DataSourceRegistry;
pub use render::{render_instance, render_widget, RenderedWidget};
pub use schema::{dialog_config, merge_config, resolve_config, validate_config, ResolvedWidget};
