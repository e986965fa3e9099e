//! Line, bar and pie chart renderers.

use super::{ChartPoint, PieSlice, RenderedWidget};
use crate::schema::{coerce_number, AxisConfig, PieChartConfig};
use serde_json::Value;

/// Slice colors cycle through a fixed six-color palette by index.
const PALETTE: [&str; 6] = [
    "#0088FE", "#00C49F", "#FFBB28", "#FF8042", "#8884D8", "#82CA9D",
];

fn rows(data: &Value) -> Option<&Vec<Value>> {
    match data {
        Value::Array(rows) if !rows.is_empty() => Some(rows),
        _ => None,
    }
}

fn empty(title: &str) -> RenderedWidget {
    RenderedWidget::Empty {
        title: title.to_string(),
        message: "No data available".to_string(),
    }
}

fn label_of(row: &Value, field: &str) -> String {
    match row.get(field) {
        Some(Value::String(label)) => label.clone(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        _ => String::new(),
    }
}

fn points(rows: &[Value], axes: &AxisConfig) -> Vec<ChartPoint> {
    rows.iter()
        .map(|row| ChartPoint {
            label: label_of(row, &axes.x_axis),
            value: row.get(&axes.y_axis).and_then(coerce_number).unwrap_or(0.0),
        })
        .collect()
}

pub fn render_line_chart(title: &str, axes: &AxisConfig, data: &Value) -> RenderedWidget {
    let Some(rows) = rows(data) else {
        return empty(title);
    };
    RenderedWidget::LineChart {
        title: title.to_string(),
        points: points(rows, axes),
    }
}

pub fn render_bar_chart(title: &str, axes: &AxisConfig, data: &Value) -> RenderedWidget {
    let Some(rows) = rows(data) else {
        return empty(title);
    };
    RenderedWidget::BarChart {
        title: title.to_string(),
        points: points(rows, axes),
    }
}

pub fn render_pie_chart(title: &str, config: &PieChartConfig, data: &Value) -> RenderedWidget {
    let Some(rows) = rows(data) else {
        return empty(title);
    };

    let value_field = config.data_column.as_deref().unwrap_or(&config.axes.y_axis);
    let values: Vec<(String, f64)> = rows
        .iter()
        .map(|row| {
            (
                label_of(row, &config.axes.x_axis),
                row.get(value_field).and_then(coerce_number).unwrap_or(0.0),
            )
        })
        .collect();
    let total: f64 = values.iter().map(|(_, value)| value).sum();

    let slices = values
        .into_iter()
        .enumerate()
        .map(|(index, (name, value))| {
            let percent = if total > 0.0 { value / total * 100.0 } else { 0.0 };
            PieSlice {
                label: format!("{} {:.0}%", name, percent),
                value,
                color: PALETTE[index % PALETTE.len()].to_string(),
            }
        })
        .collect();

    RenderedWidget::PieChart {
        title: title.to_string(),
        slices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_pie_renders_placeholder_not_zero_slices() {
        let config = PieChartConfig::default();
        let rendered = render_pie_chart("Breakdown", &config, &json!([]));
        assert_eq!(
            rendered,
            RenderedWidget::Empty {
                title: "Breakdown".to_string(),
                message: "No data available".to_string()
            }
        );

        let rendered = render_pie_chart("Breakdown", &config, &json!({"value": 3}));
        assert!(matches!(rendered, RenderedWidget::Empty { .. }));
    }

    #[test]
    fn pie_slices_cycle_palette_and_label_percentages() {
        let config = PieChartConfig::default();
        let data = json!([
            {"name": "Open", "value": 3},
            {"name": "Won", "value": 1}
        ]);
        let RenderedWidget::PieChart { slices, .. } = render_pie_chart("Deals", &config, &data) else {
            panic!("expected pie chart");
        };
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].label, "Open 75%");
        assert_eq!(slices[1].label, "Won 25%");
        assert_eq!(slices[0].color, "#0088FE");
        assert_eq!(slices[1].color, "#00C49F");
    }

    #[test]
    fn pie_prefers_data_column_over_y_axis() {
        let config = PieChartConfig {
            data_column: Some("headcount".to_string()),
            ..Default::default()
        };
        let data = json!([{"name": "Berlin", "value": 1, "headcount": 40}]);
        let RenderedWidget::PieChart { slices, .. } = render_pie_chart("Offices", &config, &data) else {
            panic!("expected pie chart");
        };
        assert_eq!(slices[0].value, 40.0);
    }

    #[test]
    fn line_chart_uses_axis_bindings_with_defaults() {
        let axes = AxisConfig::default();
        let data = json!([
            {"name": "Jan", "value": "12"},
            {"name": "Feb", "other": 9}
        ]);
        let RenderedWidget::LineChart { points, .. } = render_line_chart("Trend", &axes, &data) else {
            panic!("expected line chart");
        };
        assert_eq!(points[0].label, "Jan");
        assert_eq!(points[0].value, 12.0);
        assert_eq!(points[1].value, 0.0);
    }

    #[test]
    fn bar_chart_empty_data_placeholder() {
        let axes = AxisConfig::default();
        assert!(matches!(
            render_bar_chart("Bars", &axes, &json!([])),
            RenderedWidget::Empty { .. }
        ));
    }
}
