use crate::models::{WidgetType, WidgetTypeDescriptor};
use serde_json::{json, Map, Value};

pub fn display_name(widget_type: WidgetType) -> &'static str {
    match widget_type {
        WidgetType::MetricCard => "Metric Card",
        WidgetType::LineChart => "Line Chart",
        WidgetType::BarChart => "Bar Chart",
        WidgetType::PieChart => "Pie Chart",
        WidgetType::RevenueMetric => "Revenue Metric",
        WidgetType::DataTable => "Data Table",
    }
}

pub fn default_config(widget_type: WidgetType) -> Map<String, Value> {
    let value = match widget_type {
        WidgetType::MetricCard => json!({
            "metric_type": "count",
            "format": "number",
            "trend_comparison": false
        }),
        WidgetType::LineChart | WidgetType::BarChart => json!({
            "x_axis": "name",
            "y_axis": "value"
        }),
        WidgetType::PieChart => json!({
            "x_axis": "name",
            "y_axis": "value",
            "data_column": ""
        }),
        WidgetType::RevenueMetric => json!({
            "metric_type": "mrr",
            "currency": "USD"
        }),
        WidgetType::DataTable => json!({
            "columns": "",
            "page_size": 10
        }),
    };
    value.as_object().cloned().unwrap_or_default()
}

/// The built-in catalog. Seeded into the store on first open; immutable at
/// runtime, end users never create widget types.
pub fn builtin_descriptors() -> Vec<WidgetTypeDescriptor> {
    WidgetType::all()
        .into_iter()
        .map(|widget_type| WidgetTypeDescriptor {
            widget_type,
            category: category(widget_type).to_string(),
            name: display_name(widget_type).to_string(),
            description: description(widget_type).to_string(),
            default_config: default_config(widget_type),
        })
        .collect()
}

fn category(widget_type: WidgetType) -> &'static str {
    match widget_type {
        WidgetType::MetricCard => "Metrics",
        WidgetType::LineChart | WidgetType::BarChart | WidgetType::PieChart => "Charts",
        WidgetType::RevenueMetric => "Revenue",
        WidgetType::DataTable => "Tables",
    }
}

fn description(widget_type: WidgetType) -> &'static str {
    match widget_type {
        WidgetType::MetricCard => "Single aggregate value with optional trend indicator",
        WidgetType::LineChart => "Values over an ordered axis",
        WidgetType::BarChart => "Values compared across categories",
        WidgetType::PieChart => "Proportional breakdown with percentage labels",
        WidgetType::RevenueMetric => "MRR, ARR, churn or LTV in a chosen currency",
        WidgetType::DataTable => "Paged rows with configurable columns",
    }
}

/// Palette grouping: category → ordered descriptors, first-seen category order
/// preserved so the palette is stable across reloads.
pub fn group_by_category(
    descriptors: Vec<WidgetTypeDescriptor>,
) -> Vec<(String, Vec<WidgetTypeDescriptor>)> {
    let mut groups: Vec<(String, Vec<WidgetTypeDescriptor>)> = Vec::new();
    for descriptor in descriptors {
        match groups.iter().position(|(category, _)| *category == descriptor.category) {
            Some(index) => groups[index].1.push(descriptor),
            None => groups.push((descriptor.category.clone(), vec![descriptor])),
        }
    }
    groups
}
