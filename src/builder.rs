use crate::db::DashboardStore;
use crate::errors::{AppError, AppResult};
use crate::models::{DashboardConfig, DashboardConfigRecord, LayoutConfig, WidgetInstance, WidgetTypeDescriptor};
use crate::notify::{NoticeKind, Notifier};
use crate::schema::merge_config;
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::sync::Arc;

pub const DEFAULT_DASHBOARD_NAME: &str = "My Dashboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    NotLoggedIn,
    EmptyName,
    NoWidgets,
}

impl RejectReason {
    pub fn message(self) -> &'static str {
        match self {
            Self::NotLoggedIn => "You must be logged in to save a dashboard",
            Self::EmptyName => "Dashboard name is required",
            Self::NoWidgets => "Add at least one widget before saving",
        }
    }
}

#[derive(Debug)]
pub enum SaveOutcome {
    Saved(DashboardConfigRecord),
    /// Precondition failed; no store call was made and the session is intact.
    Rejected(RejectReason),
}

/// One dashboard composition session: palette → preview → persist. Bounded by
/// a single explicit save; no undo/redo, no autosave.
pub struct BuilderSession {
    store: Arc<dyn DashboardStore>,
    notifier: Arc<dyn Notifier>,
    user_id: Option<String>,
    dashboard_name: String,
    is_default: bool,
    widgets: Vec<WidgetInstance>,
    widget_seq: u64,
}

impl BuilderSession {
    pub fn new(store: Arc<dyn DashboardStore>, notifier: Arc<dyn Notifier>, user_id: Option<String>) -> Self {
        Self {
            store,
            notifier,
            user_id,
            dashboard_name: DEFAULT_DASHBOARD_NAME.to_string(),
            is_default: false,
            widgets: Vec::new(),
            widget_seq: 0,
        }
    }

    pub fn widgets(&self) -> &[WidgetInstance] {
        &self.widgets
    }

    pub fn dashboard_name(&self) -> &str {
        &self.dashboard_name
    }

    pub fn set_dashboard_name(&mut self, name: impl Into<String>) {
        self.dashboard_name = name.into();
    }

    pub fn set_default(&mut self, is_default: bool) {
        self.is_default = is_default;
    }

    /// Appends a fresh widget instance seeded from the descriptor's defaults,
    /// with the descriptor's display name as the initial title.
    pub fn add_widget(&mut self, descriptor: &WidgetTypeDescriptor) -> &WidgetInstance {
        self.widget_seq += 1;
        let mut title = Map::new();
        title.insert("title".to_string(), json!(descriptor.name));
        let instance = WidgetInstance {
            // Time-based token; the sequence keeps rapid adds unique within
            // the session.
            id: format!("widget_{}_{}", Utc::now().timestamp_millis(), self.widget_seq),
            widget_type: descriptor.widget_type.as_str().to_string(),
            data_source_id: String::new(),
            config: merge_config(&descriptor.default_config, &title),
        };
        self.widgets.push(instance);
        self.widgets.last().expect("widget just pushed")
    }

    pub fn remove_widget(&mut self, widget_id: &str) {
        self.widgets.retain(|widget| widget.id != widget_id);
    }

    /// Replaces the config at `index` with the dialog's merged result and
    /// lifts the bound data source onto the instance.
    pub fn update_widget_config(&mut self, index: usize, config: Map<String, Value>) -> AppResult<()> {
        let widget = self
            .widgets
            .get_mut(index)
            .ok_or_else(|| AppError::NotFound(format!("No widget at index {}", index)))?;
        if let Some(source_id) = config.get("data_source_id").and_then(Value::as_str) {
            widget.data_source_id = source_id.to_string();
        }
        widget.config = config;
        Ok(())
    }

    /// Persists the composition. Preconditions are checked before any store
    /// call; on success the session resets to a fresh empty composition; on a
    /// store failure the session is left untouched so the user can retry.
    pub fn save_dashboard(&mut self) -> AppResult<SaveOutcome> {
        if let Some(reason) = self.rejection() {
            self.notifier.notify(NoticeKind::Error, reason.message());
            return Ok(SaveOutcome::Rejected(reason));
        }

        let payload = DashboardConfig {
            user_id: self.user_id.clone().unwrap_or_default(),
            dashboard_name: self.dashboard_name.trim().to_string(),
            layout_config: LayoutConfig::default(),
            widget_configs: self.widgets.clone(),
            filters: Map::new(),
            is_default: self.is_default,
        };

        match self.store.create_dashboard_config(&payload) {
            Ok(record) => {
                tracing::info!(dashboard_id = %record.id, widgets = record.widget_configs.len(), "dashboard saved");
                self.notifier.notify(NoticeKind::Success, "Dashboard saved");
                self.reset();
                Ok(SaveOutcome::Saved(record))
            }
            Err(error) => {
                tracing::warn!(error = %error, "dashboard save failed");
                self.notifier
                    .notify(NoticeKind::Error, "Failed to save dashboard. Please try again.");
                Err(error)
            }
        }
    }

    fn rejection(&self) -> Option<RejectReason> {
        if self.user_id.as_deref().map_or(true, str::is_empty) {
            return Some(RejectReason::NotLoggedIn);
        }
        if self.dashboard_name.trim().is_empty() {
            return Some(RejectReason::EmptyName);
        }
        if self.widgets.is_empty() {
            return Some(RejectReason::NoWidgets);
        }
        None
    }

    fn reset(&mut self) {
        self.dashboard_name = DEFAULT_DASHBOARD_NAME.to_string();
        self.is_default = false;
        self.widgets.clear();
    }
}
