pub mod chart;
pub mod format;
pub mod metric;
pub mod table;

use crate::models::{WidgetDataState, WidgetInstance};
use crate::schema::{resolve_config, ResolvedWidget, WidgetConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendIndicator {
    pub direction: TrendDirection,
    /// Signed percentage shown next to the arrow.
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeIndicator {
    pub direction: TrendDirection,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PieSlice {
    /// `name percent%` label.
    pub label: String,
    pub value: f64,
    pub color: String,
}

/// The renderable model the shell draws. Every failure mode is a variant here
/// so one widget's problem never takes down its siblings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderedWidget {
    MetricCard {
        title: String,
        value: String,
        trend: Option<TrendIndicator>,
    },
    LineChart {
        title: String,
        points: Vec<ChartPoint>,
    },
    BarChart {
        title: String,
        points: Vec<ChartPoint>,
    },
    PieChart {
        title: String,
        slices: Vec<PieSlice>,
    },
    RevenueMetric {
        title: String,
        value: String,
        change: Option<ChangeIndicator>,
    },
    DataTable {
        title: String,
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
        footer: Option<String>,
    },
    /// Fixed placeholder for charts/tables with nothing to plot.
    Empty { title: String, message: String },
    /// Skeleton while the widget's fetch is in flight.
    Loading { title: String },
    /// Inline fetch error; message text comes from the underlying error.
    Error { title: String, message: String },
    /// Unrecognized widget type; reportable, never a crash.
    Unknown { widget_type: String, message: String },
}

/// Pure dispatch from `(widgetType, data, mergedConfig)` to a renderable.
pub fn render_widget(resolved: &ResolvedWidget, data: &Value) -> RenderedWidget {
    let title = resolved.title.as_str();
    match &resolved.config {
        WidgetConfig::MetricCard(config) => metric::render_metric_card(title, config, data),
        WidgetConfig::LineChart(axes) => chart::render_line_chart(title, axes, data),
        WidgetConfig::BarChart(axes) => chart::render_bar_chart(title, axes, data),
        WidgetConfig::PieChart(config) => chart::render_pie_chart(title, config, data),
        WidgetConfig::RevenueMetric(config) => metric::render_revenue_metric(title, config, data),
        WidgetConfig::DataTable(config) => table::render_data_table(title, config, data),
    }
}

/// Renders one placed widget from its fetch state, folding unknown types,
/// loading and fetch errors into inline variants.
pub fn render_instance(instance: &WidgetInstance, state: &WidgetDataState) -> RenderedWidget {
    let Some(resolved) = resolve_config(&instance.widget_type, &instance.config) else {
        return RenderedWidget::Unknown {
            widget_type: instance.widget_type.clone(),
            message: format!("Unknown widget type: {}", instance.widget_type),
        };
    };

    if state.is_loading {
        return RenderedWidget::Loading {
            title: resolved.title.clone(),
        };
    }
    if let Some(error) = &state.error {
        return RenderedWidget::Error {
            title: resolved.title.clone(),
            message: error.clone(),
        };
    }

    let data = state.data.clone().unwrap_or(Value::Null);
    render_widget(&resolved, &data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn instance(widget_type: &str, config: Value) -> WidgetInstance {
        WidgetInstance {
            id: "widget_1".to_string(),
            widget_type: widget_type.to_string(),
            data_source_id: String::new(),
            config: config.as_object().cloned().unwrap_or_else(Map::new),
        }
    }

    #[test]
    fn unknown_type_renders_notice() {
        let widget = instance("sparkline", json!({}));
        let rendered = render_instance(&widget, &WidgetDataState::ready(json!([])));
        assert_eq!(
            rendered,
            RenderedWidget::Unknown {
                widget_type: "sparkline".to_string(),
                message: "Unknown widget type: sparkline".to_string(),
            }
        );
    }

    #[test]
    fn loading_state_renders_skeleton() {
        let widget = instance("metric_card", json!({"title": "Leads"}));
        let rendered = render_instance(&widget, &WidgetDataState::loading());
        assert_eq!(
            rendered,
            RenderedWidget::Loading {
                title: "Leads".to_string()
            }
        );
    }

    #[test]
    fn fetch_error_renders_inline_message() {
        let widget = instance("bar_chart", json!({"title": "Pipeline"}));
        let rendered = render_instance(&widget, &WidgetDataState::failed("relation does not exist"));
        assert_eq!(
            rendered,
            RenderedWidget::Error {
                title: "Pipeline".to_string(),
                message: "relation does not exist".to_string(),
            }
        );
    }

    #[test]
    fn metric_card_renders_through_full_dispatch() {
        let widget = instance(
            "metric_card",
            json!({"title": "Candidates", "metric_type": "count", "format": "number"}),
        );
        let state = WidgetDataState::ready(json!([{"value": 1}, {"value": 2}]));
        let rendered = render_instance(&widget, &state);
        assert_eq!(
            rendered,
            RenderedWidget::MetricCard {
                title: "Candidates".to_string(),
                value: "2".to_string(),
                trend: None,
            }
        );
    }
}
