use crate::bootstrap::{choose_default, DefaultWidgetPolicy};
use crate::builder::{BuilderSession, DEFAULT_DASHBOARD_NAME};
use crate::db::{Database, DashboardStore, SqliteDataProvider};
use crate::errors::{AppError, AppResult};
use crate::fetch::{FetchLayer, WidgetDataProvider};
use crate::models::{
    CreateDataSourcePayload, DashboardConfig, DashboardConfigRecord, DataSourceDescriptor,
    LayoutConfig, WidgetDataState, WidgetInstance, WidgetTypeDescriptor,
};
use crate::notify::{Notifier, TracingNotifier};
use crate::registry::DataSourceRegistry;
use crate::render::{render_instance, RenderedWidget};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

/// Daily-rotated JSON logs under `<data_dir>/logs`. Idempotent; later calls
/// keep the first subscriber.
pub fn init_tracing(data_dir: &Path) -> Result<(), String> {
    let log_dir = data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "dashboard-studio.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    if LOG_GUARD.set(guard).is_err() {
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}

/// A dashboard as handed to the shell for display: either the user's saved
/// default or the synthesized fallback composition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedDashboard {
    pub dashboard_name: String,
    pub layout_config: LayoutConfig,
    pub widgets: Vec<WidgetInstance>,
    /// False when the widgets were synthesized rather than loaded from a
    /// saved configuration.
    pub saved: bool,
}

/// One placed widget together with its renderable model.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetView {
    pub instance: WidgetInstance,
    pub rendered: RenderedWidget,
}

/// Facade over the widget engine: catalog, data sources, composition sessions,
/// data binding and rendering. Shells hold one `DashboardEngine` and call into
/// it from their command layer.
pub struct DashboardEngine {
    store: Arc<dyn DashboardStore>,
    registry: DataSourceRegistry,
    fetch: FetchLayer,
    notifier: Arc<dyn Notifier>,
    policy: DefaultWidgetPolicy,
}

impl DashboardEngine {
    /// Opens (or creates) the local database and wires the shipped provider
    /// and notifier.
    pub fn new(db_path: &Path) -> AppResult<Self> {
        let db = Arc::new(Database::new(db_path)?);
        let provider = Arc::new(SqliteDataProvider::new(db.clone()));
        Ok(Self::with_parts(db, provider, Arc::new(TracingNotifier)))
    }

    /// Dependency-injected construction for shells with their own persistence
    /// or data backend.
    pub fn with_parts(
        store: Arc<dyn DashboardStore>,
        provider: Arc<dyn WidgetDataProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store: store.clone(),
            registry: DataSourceRegistry::new(store),
            fetch: FetchLayer::new(provider),
            notifier,
            policy: DefaultWidgetPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: DefaultWidgetPolicy) -> Self {
        self.policy = policy;
        self
    }

    // ─── Catalog ────────────────────────────────────────────────────────────

    pub fn widget_types(&self) -> AppResult<Vec<WidgetTypeDescriptor>> {
        self.store.list_widget_types()
    }

    /// Palette groups in catalog order, keyed by category.
    pub fn widget_palette(&self) -> AppResult<Vec<(String, Vec<WidgetTypeDescriptor>)>> {
        Ok(crate::catalog::group_by_category(self.store.list_widget_types()?))
    }

    // ─── Data sources ───────────────────────────────────────────────────────

    pub fn data_sources(&self) -> AppResult<Vec<DataSourceDescriptor>> {
        self.registry.list()
    }

    pub fn create_data_source(&self, payload: CreateDataSourcePayload) -> AppResult<DataSourceDescriptor> {
        self.registry.create(payload)
    }

    /// Resolves one data source's data through the cache, bypassing the
    /// render pass. Useful for the dialog's preview pane.
    pub async fn fetch_widget_data(
        &self,
        source_id: &str,
        config: &serde_json::Map<String, serde_json::Value>,
    ) -> AppResult<WidgetDataState> {
        let sources = self.registry.list()?;
        let source = find_source(&sources, source_id)
            .ok_or_else(|| AppError::NotFound(format!("Data source not found: {}", source_id)))?;
        Ok(self.fetch.widget_data(source, config).await)
    }

    // ─── Composition ────────────────────────────────────────────────────────

    pub fn create_dashboard_config(&self, payload: &DashboardConfig) -> AppResult<DashboardConfigRecord> {
        self.store.create_dashboard_config(payload)
    }

    pub fn list_user_dashboard_configs(&self, user_id: &str) -> AppResult<Vec<DashboardConfigRecord>> {
        self.store.list_user_dashboard_configs(user_id)
    }

    pub fn new_session(&self, user_id: Option<&str>) -> BuilderSession {
        BuilderSession::new(
            self.store.clone(),
            self.notifier.clone(),
            user_id.map(ToString::to_string),
        )
    }

    /// The dashboard to show on open: the user's default saved config (first
    /// flagged default, else the oldest), or a composition synthesized from
    /// whichever well-known data sources exist.
    pub fn load_dashboard(&self, user_id: &str) -> AppResult<LoadedDashboard> {
        let configs = self.store.list_user_dashboard_configs(user_id)?;
        if let Some(saved) = choose_default(&configs) {
            return Ok(LoadedDashboard {
                dashboard_name: saved.dashboard_name.clone(),
                layout_config: saved.layout_config.clone(),
                widgets: saved.widget_configs.clone(),
                saved: true,
            });
        }

        let sources = self.registry.list()?;
        let widgets = self.policy.synthesize(&sources);
        tracing::info!(user_id, widgets = widgets.len(), "no saved dashboard, synthesized fallback");
        Ok(LoadedDashboard {
            dashboard_name: DEFAULT_DASHBOARD_NAME.to_string(),
            layout_config: LayoutConfig::default(),
            widgets,
            saved: false,
        })
    }

    // ─── Rendering ──────────────────────────────────────────────────────────

    /// Resolves data for each placed widget and renders it. One widget's fetch
    /// failure or unknown type never affects its siblings; those widgets come
    /// back as inline `Error`/`Unknown` variants.
    pub async fn render_dashboard(&self, widgets: &[WidgetInstance]) -> AppResult<Vec<WidgetView>> {
        let sources = self.registry.list()?;
        let mut views = Vec::with_capacity(widgets.len());
        for widget in widgets {
            let state = self.widget_state(widget, &sources).await;
            views.push(WidgetView {
                rendered: render_instance(widget, &state),
                instance: widget.clone(),
            });
        }
        Ok(views)
    }

    /// Non-blocking render pass: widgets whose data is not cached yet come
    /// back as `Loading` skeletons instead of awaiting the fetch.
    pub async fn peek_dashboard(&self, widgets: &[WidgetInstance]) -> AppResult<Vec<WidgetView>> {
        let sources = self.registry.list()?;
        let mut views = Vec::with_capacity(widgets.len());
        for widget in widgets {
            let state = match find_source(&sources, &widget.data_source_id) {
                Some(source) => self.fetch.peek(source, &widget.config).await,
                None => unbound_state(widget),
            };
            views.push(WidgetView {
                rendered: render_instance(widget, &state),
                instance: widget.clone(),
            });
        }
        Ok(views)
    }

    async fn widget_state(&self, widget: &WidgetInstance, sources: &[DataSourceDescriptor]) -> WidgetDataState {
        match find_source(sources, &widget.data_source_id) {
            Some(source) => self.fetch.widget_data(source, &widget.config).await,
            None => unbound_state(widget),
        }
    }
}

fn find_source<'a>(sources: &'a [DataSourceDescriptor], id: &str) -> Option<&'a DataSourceDescriptor> {
    if id.is_empty() {
        return None;
    }
    sources.iter().find(|source| source.id == id)
}

fn unbound_state(widget: &WidgetInstance) -> WidgetDataState {
    let message = if widget.data_source_id.is_empty() {
        "No data source configured".to_string()
    } else {
        format!("Data source not found: {}", widget.data_source_id)
    };
    WidgetDataState::failed(message)
}
